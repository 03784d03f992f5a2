use std::path::Path;

use anyhow::{bail, Result};
use chrono::Utc;
use clap::Args;

use taskloop::config::Settings;
use taskloop::lock::InstanceLock;
use taskloop::models::{Task, TaskStatus};
use taskloop::paths::InstancePaths;
use taskloop::{instance, store};

#[derive(Args)]
pub struct AddArgs {
    pub instance: String,
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub spec: String,
    #[arg(long = "verify")]
    pub verify: Vec<String>,
    #[arg(long)]
    pub model: String,
    #[arg(long, default_value = "")]
    pub priority: String,
    #[arg(long, default_value = "")]
    pub source: String,
    #[arg(long)]
    pub json: bool,
}

pub async fn run(project_root: &Path, args: AddArgs) -> Result<()> {
    let paths = InstancePaths::new(project_root, &args.instance);
    instance::load(&paths)?;

    // Held for the command's full duration (§4.2): `add` is a read-modify-write
    // over tasks.jsonl and must not race a concurrent `go`/`reset`/`skip`.
    let settings = Settings::load()?;
    let _lock = InstanceLock::acquire(&paths.lock_file(), settings.lock_timeout, settings.lock_poll_interval).await?;

    let mut tasks = store::load_tasks(&paths.tasks_jsonl())?;
    let id = instance::next_task_id(&tasks);
    let now = Utc::now();
    let task = Task {
        id,
        title: args.title,
        spec: args.spec,
        verify: args.verify,
        status: TaskStatus::Todo,
        model_hint: args.model,
        priority: args.priority,
        attempts: 0,
        last_error: None,
        source: args.source,
        created_at: now,
        updated_at: now,
        extra: Default::default(),
    };
    if let Err(e) = task.validate() {
        bail!("validation error: {e}");
    }

    tasks.push(task.clone());
    store::save_tasks(&paths.tasks_jsonl(), &tasks)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else {
        println!("added task {}", task.id);
    }
    Ok(())
}
