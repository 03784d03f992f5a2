//! C9: Execution Loop — orchestrates C1–C8 per task; crash recovery;
//! transient-retry backoff; cycle-summary emission (§4.9).

pub mod backoff;

use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::agent::AgentRunner;
use crate::classifier;
use crate::commit_gate;
use crate::config::Settings;
use crate::lock::InstanceLock;
use crate::models::{CycleSummary, FallbackInfo, RunRecord, Task, TaskStatus};
use crate::paths::InstancePaths;
use crate::prompt;
use crate::queue;
use crate::router;
use crate::store;
use crate::verify;
use crate::Result;

/// Entry parameters for one `go` invocation (§4.9).
pub struct GoOptions {
    pub limit: u32,
    pub dry_run: bool,
    pub require_commit: bool,
    pub max_attempts: u32,
    pub max_transient_retries: u32,
    pub cooldown: Duration,
}

/// Runs the loop to completion (limit reached, queue exhausted, or Ctrl+C
/// observed between tasks), returning the cycle summary that was also
/// appended to `cycle.log`.
pub async fn run_go(
    paths: &InstancePaths,
    settings: &Settings,
    runner: &dyn AgentRunner,
    instance_name: &str,
    workdir: &std::path::Path,
    opts: GoOptions,
) -> Result<CycleSummary> {
    let mut lock = InstanceLock::acquire(&paths.lock_file(), settings.lock_timeout, settings.lock_poll_interval).await?;

    let mut tasks = store::load_tasks(&paths.tasks_jsonl())?;
    recover_stale_in_progress(&mut tasks);
    store::save_tasks(&paths.tasks_jsonl(), &tasks)?;

    let mut processed = 0u32;
    let mut done = 0u32;
    let mut failed = 0u32;
    let mut blocked = 0u32;
    let mut task_ids = Vec::new();
    let mut interrupted = false;

    while processed < opts.limit {
        if !opts.dry_run {
            tasks = store::load_tasks(&paths.tasks_jsonl())?;
        }
        let Some(idx) = queue::next_runnable(&tasks, opts.max_attempts) else {
            break;
        };

        if opts.dry_run {
            let id = tasks[idx].id.clone();
            info!(task_id = %id, "dry run: would execute task");
            tasks[idx].status = TaskStatus::Done;
            task_ids.push(id);
            processed += 1;
            done += 1;
            continue;
        }

        let task_id = tasks[idx].id.clone();
        tasks[idx].status = TaskStatus::InProgress;
        tasks[idx].updated_at = Utc::now();
        store::save_tasks(&paths.tasks_jsonl(), &tasks)?;
        lock.release();

        let outcome = run_honoring_interrupt(
            execute_one(paths, settings, runner, &tasks[idx], workdir, &opts),
            &mut interrupted,
        )
        .await;

        lock = InstanceLock::acquire(&paths.lock_file(), settings.lock_timeout, settings.lock_poll_interval).await?;
        tasks = store::load_tasks(&paths.tasks_jsonl())?;
        let Some(idx) = tasks.iter().position(|t| t.id == task_id) else {
            warn!(task_id = %task_id, "task disappeared from queue during execution");
            continue;
        };

        let run_record = apply_outcome(paths, &mut tasks[idx], outcome, opts.max_attempts);
        store::append_run(&paths.runs_jsonl(), &run_record)?;
        store::save_tasks(&paths.tasks_jsonl(), &tasks)?;

        match tasks[idx].status {
            TaskStatus::Done => done += 1,
            TaskStatus::Blocked => blocked += 1,
            TaskStatus::Failed => failed += 1,
            _ => {}
        }
        task_ids.push(task_id);
        processed += 1;

        if interrupted {
            info!("interrupt received; stopping after the in-flight task instead of starting another");
            break;
        }

        if opts.cooldown > Duration::ZERO {
            tokio::time::sleep(opts.cooldown).await;
        }
    }

    let summary = CycleSummary {
        instance: instance_name.to_string(),
        processed,
        done,
        failed,
        blocked,
        dry_run: opts.dry_run,
        task_ids,
        at: Utc::now(),
    };
    store::append_line(&paths.cycle_log(), &summary.to_string())?;
    lock.release();
    Ok(summary)
}

// 🔌 ARCHITECTURE DECISION: Ctrl+C is observed with a `tokio::select!` wrapped
// around the in-flight task's future, not by racing a cancellation directly.
// Why: the agent subprocess runs in its own process group (agent/process.rs)
// specifically so a terminal SIGINT doesn't reach it — the loop has to keep
// polling for the signal while letting the task's future run to its own
// completion, then stop before starting the next one (§4.9 step 12).
// Alternative (rejected): `tokio::select!` the task future against `ctrl_c()`
// and drop whichever loses — simpler, but dropping a `tokio::process::Child`
// mid-flight doesn't kill it, so the signal would orphan the spawned agent
// instead of stopping the loop around it.
async fn run_honoring_interrupt<F, T>(fut: F, interrupted: &mut bool) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::pin!(fut);
    let mut signaled = *interrupted;
    loop {
        tokio::select! {
            biased;
            output = &mut fut => return output,
            _ = tokio::signal::ctrl_c(), if !signaled => {
                signaled = true;
                *interrupted = true;
                warn!("interrupt received; finishing the in-flight task before exiting the loop");
            }
        }
    }
}

/// Resets any task left `in_progress` by a prior crash back to `todo`
/// (§4.9 step 2, P5).
fn recover_stale_in_progress(tasks: &mut [Task]) {
    for task in tasks.iter_mut() {
        if task.status == TaskStatus::InProgress {
            task.status = TaskStatus::Todo;
            task.last_error = None;
            task.updated_at = Utc::now();
        }
    }
}

/// Result of executing one task: either it succeeded (with the effective
/// provider/model and optional fallback info) or it failed with an error
/// message.
enum TaskOutcome {
    Success {
        primary: (String, String),
        effective: (String, String),
        fallback: Option<FallbackInfo>,
        output_tail: String,
        verify_failed: Option<String>,
    },
    Failure {
        primary: (String, String),
        effective: (String, String),
        fallback: Option<FallbackInfo>,
        output_tail: String,
        error: String,
        verify_failed: Option<String>,
    },
}

/// Steps 6–9: compose the prompt, invoke the agent (with transient backoff
/// and one-shot fallback), run verifies, and check the commit gate.
async fn execute_one(
    paths: &InstancePaths,
    settings: &Settings,
    runner: &dyn AgentRunner,
    task: &Task,
    workdir: &std::path::Path,
    opts: &GoOptions,
) -> TaskOutcome {
    let prompt_text = match prompt::compose(paths, task) {
        Ok(p) => p,
        Err(e) => {
            return TaskOutcome::Failure {
                primary: router::route(&task.model_hint),
                effective: router::route(&task.model_hint),
                fallback: None,
                output_tail: String::new(),
                error: format!("prompt composition failed: {e}"),
                verify_failed: None,
            }
        }
    };

    let primary = router::route(&task.model_hint);
    let head_pre = if opts.require_commit {
        commit_gate::head_revision(workdir).await.ok()
    } else {
        None
    };

    let mut effective = primary.clone();
    let mut fallback_info = None;
    let mut combined_output;
    let mut agent_error: Option<String> = None;

    let mut transient_retries = 0u32;
    loop {
        let result = runner
            .run(&primary.0, &primary.1, workdir, &prompt_text, settings.agent_timeout)
            .await;
        let (output, error) = match result {
            Ok(outcome) => crate::agent::outcome_to_result(outcome),
            Err(e) => (String::new(), Some(e.to_string())),
        };
        combined_output = output;

        match error {
            None => {
                agent_error = None;
                break;
            }
            Some(err) => {
                let tag = classifier::classify(&err, &combined_output);
                if classifier::is_transient(&tag) && transient_retries < opts.max_transient_retries {
                    let wait = backoff::interval(transient_retries);
                    transient_retries += 1;
                    warn!(task_id = %task.id, tag = %tag, wait = ?wait, "transient provider failure, backing off");
                    tokio::time::sleep(wait).await;
                    continue;
                }

                if let Some((fb_provider, fb_model)) = router::select_fallback(&primary.0, &primary.1) {
                    let fb_result = runner
                        .run(&fb_provider, &fb_model, workdir, &prompt_text, settings.agent_timeout)
                        .await;
                    let (fb_output, fb_error) = match fb_result {
                        Ok(outcome) => crate::agent::outcome_to_result(outcome),
                        Err(e) => (String::new(), Some(e.to_string())),
                    };
                    combined_output = format!("{combined_output}\n\n[fallback marker]\n{fb_output}");
                    effective = (fb_provider.clone(), fb_model.clone());
                    fallback_info = Some(FallbackInfo {
                        provider: fb_provider,
                        model: fb_model,
                        reason: tag,
                    });
                    agent_error = fb_error;
                } else {
                    agent_error = Some(err);
                }
                break;
            }
        }
    }

    if let Some(err) = agent_error {
        return TaskOutcome::Failure {
            primary,
            effective,
            fallback: fallback_info,
            output_tail: tail(&combined_output),
            error: err,
            verify_failed: None,
        };
    }

    let verify_outcome = match verify::run_verifies(workdir, &task.verify, settings.verify_timeout).await {
        Ok(v) => v,
        Err(e) => {
            return TaskOutcome::Failure {
                primary,
                effective,
                fallback: fallback_info,
                output_tail: tail(&combined_output),
                error: format!("verify error: {e}"),
                verify_failed: None,
            }
        }
    };
    if let Some(failing) = verify_outcome.failing_command {
        return TaskOutcome::Failure {
            primary,
            effective,
            fallback: fallback_info,
            output_tail: tail(&combined_output),
            error: format!("verify failed: {failing}"),
            verify_failed: Some(failing),
        };
    }

    if opts.require_commit {
        let head_post = match commit_gate::head_revision(workdir).await {
            Ok(h) => h,
            Err(e) => {
                return TaskOutcome::Failure {
                    primary,
                    effective,
                    fallback: fallback_info,
                    output_tail: tail(&combined_output),
                    error: format!("commit gate: {e}"),
                    verify_failed: None,
                }
            }
        };
        if let Some(pre) = head_pre {
            if let Err(e) = commit_gate::check_advanced(&pre, &head_post) {
                return TaskOutcome::Failure {
                    primary,
                    effective,
                    fallback: fallback_info,
                    output_tail: tail(&combined_output),
                    error: e.to_string(),
                    verify_failed: None,
                };
            }
        }
    }

    TaskOutcome::Success {
        primary,
        effective,
        fallback: fallback_info,
        output_tail: tail(&combined_output),
        verify_failed: None,
    }
}

const OUTPUT_TAIL_CHARS: usize = 4096;

fn tail(output: &str) -> String {
    if output.chars().count() <= OUTPUT_TAIL_CHARS {
        output.to_string()
    } else {
        output.chars().rev().take(OUTPUT_TAIL_CHARS).collect::<Vec<_>>().into_iter().rev().collect()
    }
}

/// Step 10–11: apply the outcome to the task and produce its run record.
fn apply_outcome(paths: &InstancePaths, task: &mut Task, outcome: TaskOutcome, max_attempts: u32) -> RunRecord {
    let started_at = task.updated_at;
    let finished_at = Utc::now();
    task.updated_at = finished_at;

    match outcome {
        TaskOutcome::Success {
            primary,
            effective,
            fallback,
            output_tail,
            verify_failed,
        } => {
            task.status = TaskStatus::Done;
            task.last_error = None;

            let fallback_suffix = if fallback.is_some() { " (fallback)" } else { "" };
            let line = format!(
                "{} {} done via {}/{}{}",
                finished_at.to_rfc3339(),
                task.id,
                effective.0,
                effective.1,
                fallback_suffix
            );
            if let Err(e) = store::append_line(&paths.learnings_md(), &line) {
                warn!(task_id = %task.id, error = %e, "failed to append to learnings.md");
            }

            RunRecord {
                task_id: task.id.clone(),
                status: TaskStatus::Done,
                primary_provider: primary.0,
                primary_model: primary.1,
                provider: effective.0,
                model: effective.1,
                fallback,
                started_at,
                finished_at,
                error: None,
                output_tail,
                verify_failed,
            }
        }
        TaskOutcome::Failure {
            primary,
            effective,
            fallback,
            output_tail,
            error,
            verify_failed,
        } => {
            task.attempts += 1;
            task.status = queue::status_after_failure(task.attempts, max_attempts);
            task.last_error = Some(error.clone());
            RunRecord {
                task_id: task.id.clone(),
                status: task.status,
                primary_provider: primary.0,
                primary_model: primary.1,
                provider: effective.0,
                model: effective.1,
                fallback,
                started_at,
                finished_at,
                error: Some(error),
                output_tail,
                verify_failed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::fake::{FakeAgentRunner, Script};
    use crate::models::TaskStatus;

    fn settings() -> Settings {
        let mut s = Settings::default();
        s.lock_timeout = Duration::from_secs(2);
        s.lock_poll_interval = Duration::from_millis(5);
        s
    }

    fn add_task(paths: &InstancePaths, id: &str, verify: &str) {
        let mut tasks = store::load_tasks(&paths.tasks_jsonl()).unwrap();
        tasks.push(Task {
            id: id.to_string(),
            title: "t".to_string(),
            spec: "s".to_string(),
            verify: vec![verify.to_string()],
            status: TaskStatus::Todo,
            model_hint: "sonnet".to_string(),
            priority: String::new(),
            attempts: 0,
            last_error: None,
            source: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            extra: std::collections::HashMap::new(),
        });
        store::save_tasks(&paths.tasks_jsonl(), &tasks).unwrap();
    }

    fn opts(limit: u32) -> GoOptions {
        GoOptions {
            limit,
            dry_run: false,
            require_commit: false,
            max_attempts: 3,
            max_transient_retries: 3,
            cooldown: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn happy_path_completes_task() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstancePaths::new(dir.path(), "alpha");
        add_task(&paths, "OB-001", "echo ok");

        let runner = FakeAgentRunner::always_succeeds("done");
        let settings = settings();
        let summary = run_go(&paths, &settings, &runner, "alpha", dir.path(), opts(10)).await.unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.done, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.blocked, 0);

        let tasks = store::load_tasks(&paths.tasks_jsonl()).unwrap();
        assert_eq!(tasks[0].status, TaskStatus::Done);
        assert_eq!(tasks[0].attempts, 0);

        let runs = store::load_runs(&paths.runs_jsonl()).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, TaskStatus::Done);

        let learnings = std::fs::read_to_string(paths.learnings_md()).unwrap();
        assert!(learnings.contains("OB-001"));
        assert!(learnings.contains("done via"));
    }

    #[tokio::test]
    async fn verify_failure_marks_task_failed_with_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstancePaths::new(dir.path(), "alpha");
        add_task(&paths, "OB-002", "exit 1");

        let runner = FakeAgentRunner::always_succeeds("done");
        let settings = settings();
        run_go(&paths, &settings, &runner, "alpha", dir.path(), opts(10)).await.unwrap();

        let tasks = store::load_tasks(&paths.tasks_jsonl()).unwrap();
        assert_eq!(tasks[0].status, TaskStatus::Failed);
        assert_eq!(tasks[0].attempts, 1);
        assert_eq!(tasks[0].last_error.as_deref(), Some("verify failed: exit 1"));
    }

    #[tokio::test]
    async fn attempts_cap_blocks_task() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstancePaths::new(dir.path(), "alpha");
        add_task(&paths, "OB-003", "exit 1");

        let runner = FakeAgentRunner::always_succeeds("done");
        let mut o = opts(1);
        o.max_attempts = 2;
        let settings = settings();

        run_go(&paths, &settings, &runner, "alpha", dir.path(), o).await.unwrap();
        let mut o2 = opts(1);
        o2.max_attempts = 2;
        run_go(&paths, &settings, &runner, "alpha", dir.path(), o2).await.unwrap();

        let tasks = store::load_tasks(&paths.tasks_jsonl()).unwrap();
        assert_eq!(tasks[0].status, TaskStatus::Blocked);
        assert_eq!(tasks[0].attempts, 2);

        let runs = store::load_runs(&paths.runs_jsonl()).unwrap();
        assert_eq!(runs.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_retry_does_not_burn_an_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstancePaths::new(dir.path(), "alpha");
        add_task(&paths, "OB-004", "echo ok");

        let runner = FakeAgentRunner::new(vec![
            Script::Fail { output: "429 too many requests".to_string() },
            Script::Fail { output: "429 too many requests".to_string() },
            Script::Succeed { output: "done".to_string() },
        ]);
        let settings = settings();
        let summary = run_go(&paths, &settings, &runner, "alpha", dir.path(), opts(10)).await.unwrap();

        assert_eq!(summary.done, 1);
        let tasks = store::load_tasks(&paths.tasks_jsonl()).unwrap();
        assert_eq!(tasks[0].attempts, 0);
        assert_eq!(tasks[0].status, TaskStatus::Done);

        let runs = store::load_runs(&paths.runs_jsonl()).unwrap();
        assert_eq!(runs.len(), 1);
    }

    #[tokio::test]
    async fn fallback_records_primary_and_effective_provider() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstancePaths::new(dir.path(), "alpha");
        add_task(&paths, "OB-005", "echo ok");

        let runner = FakeAgentRunner::new(vec![
            Script::Fail { output: "401 unauthorized".to_string() },
            Script::Succeed { output: "done".to_string() },
        ]);
        let settings = settings();
        run_go(&paths, &settings, &runner, "alpha", dir.path(), opts(10)).await.unwrap();

        let runs = store::load_runs(&paths.runs_jsonl()).unwrap();
        assert_eq!(runs[0].primary_provider, "codex");
        assert_eq!(runs[0].provider, "claude");
        assert_eq!(runs[0].fallback.as_ref().unwrap().reason, "auth");
        assert_eq!(runs[0].status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn crash_recovery_resets_in_progress_to_todo() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstancePaths::new(dir.path(), "alpha");
        add_task(&paths, "OB-006", "echo ok");
        let mut tasks = store::load_tasks(&paths.tasks_jsonl()).unwrap();
        tasks[0].status = TaskStatus::InProgress;
        tasks[0].last_error = Some("stale".to_string());
        store::save_tasks(&paths.tasks_jsonl(), &tasks).unwrap();

        let runner = FakeAgentRunner::always_succeeds("done");
        let settings = settings();
        run_go(&paths, &settings, &runner, "alpha", dir.path(), opts(10)).await.unwrap();

        let tasks = store::load_tasks(&paths.tasks_jsonl()).unwrap();
        assert_eq!(tasks[0].status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn dry_run_does_not_persist_changes() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstancePaths::new(dir.path(), "alpha");
        add_task(&paths, "OB-007", "echo ok");

        let runner = FakeAgentRunner::always_succeeds("done");
        let mut o = opts(10);
        o.dry_run = true;
        let settings = settings();
        let summary = run_go(&paths, &settings, &runner, "alpha", dir.path(), o).await.unwrap();

        assert_eq!(summary.done, 1);
        assert!(summary.dry_run);
        let tasks = store::load_tasks(&paths.tasks_jsonl()).unwrap();
        assert_eq!(tasks[0].status, TaskStatus::Todo);
    }
}
