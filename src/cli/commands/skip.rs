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
pub struct SkipArgs {
    pub instance: String,
    pub task_id: String,
}

/// Removes a task from rotation without burning an attempt: marks it
/// `blocked` with an operator-authored `last_error`, so `next_runnable`
/// (C3) never selects it again until a `reset`.
pub async fn run(project_root: &Path, args: SkipArgs) -> Result<()> {
    let paths = InstancePaths::new(project_root, &args.instance);
    instance::load(&paths)?;

    // Held for the command's full duration (§4.2).
    let settings = Settings::load()?;
    let _lock = InstanceLock::acquire(&paths.lock_file(), settings.lock_timeout, settings.lock_poll_interval).await?;

    let mut tasks = store::load_tasks(&paths.tasks_jsonl())?;
    let Some(task) = tasks.iter_mut().find(|t| t.id == args.task_id) else {
        bail!("not found: task {}", args.task_id);
    };
    task.status = TaskStatus::Blocked;
    task.last_error = Some("skipped by operator".to_string());
    task.updated_at = Utc::now();

    store::save_tasks(&paths.tasks_jsonl(), &tasks)?;
    println!("skipped task {}", args.task_id);
    Ok(())
}
