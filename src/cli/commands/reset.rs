use std::path::Path;

use anyhow::{bail, Result};
use chrono::Utc;
use clap::Args;

use taskloop::config::Settings;
use taskloop::lock::InstanceLock;
use taskloop::models::TaskStatus;
use taskloop::paths::InstancePaths;
use taskloop::{instance, store};

#[derive(Args)]
pub struct ResetArgs {
    pub instance: String,
    pub task_id: String,
}

/// Resets a `done`/`failed`/`blocked` task to `todo` with `attempts = 0` and
/// an empty `last_error`. Applying `reset` twice is equivalent to once.
pub async fn run(project_root: &Path, args: ResetArgs) -> Result<()> {
    let paths = InstancePaths::new(project_root, &args.instance);
    instance::load(&paths)?;

    // Held for the command's full duration (§4.2).
    let settings = Settings::load()?;
    let _lock = InstanceLock::acquire(&paths.lock_file(), settings.lock_timeout, settings.lock_poll_interval).await?;

    let mut tasks = store::load_tasks(&paths.tasks_jsonl())?;
    let Some(task) = tasks.iter_mut().find(|t| t.id == args.task_id) else {
        bail!("not found: task {}", args.task_id);
    };
    task.status = TaskStatus::Todo;
    task.attempts = 0;
    task.last_error = None;
    task.updated_at = Utc::now();

    store::save_tasks(&paths.tasks_jsonl(), &tasks)?;
    println!("reset task {}", args.task_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskloop::models::Task;
    use std::collections::HashMap;

    fn seed_blocked_task(project_root: &Path) -> InstancePaths {
        let paths = InstancePaths::new(project_root, "alpha");
        instance::init(&paths, "alpha", "/work").unwrap();
        let task = Task {
            id: "OB-001".to_string(),
            title: "t".to_string(),
            spec: "s".to_string(),
            verify: vec!["echo ok".to_string()],
            status: TaskStatus::Blocked,
            model_hint: "sonnet".to_string(),
            priority: String::new(),
            attempts: 3,
            last_error: Some("boom".to_string()),
            source: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            extra: HashMap::new(),
        };
        store::save_tasks(&paths.tasks_jsonl(), &[task]).unwrap();
        paths
    }

    #[tokio::test]
    async fn applying_reset_twice_matches_applying_once() {
        let dir = tempfile::tempdir().unwrap();
        let paths = seed_blocked_task(dir.path());

        run(
            dir.path(),
            ResetArgs { instance: "alpha".to_string(), task_id: "OB-001".to_string() },
        )
        .await
        .unwrap();
        let once = store::load_tasks(&paths.tasks_jsonl()).unwrap();

        run(
            dir.path(),
            ResetArgs { instance: "alpha".to_string(), task_id: "OB-001".to_string() },
        )
        .await
        .unwrap();
        let twice = store::load_tasks(&paths.tasks_jsonl()).unwrap();

        assert_eq!(once[0].status, TaskStatus::Todo);
        assert_eq!(once[0].attempts, 0);
        assert!(once[0].last_error.is_none());
        assert_eq!(twice[0].status, once[0].status);
        assert_eq!(twice[0].attempts, once[0].attempts);
    }
}
