use std::path::Path;

use anyhow::{bail, Result};
use clap::Args;

use taskloop::paths::InstancePaths;
use taskloop::{instance, store};

#[derive(Args)]
pub struct ShowArgs {
    pub instance: String,
    pub task_id: String,
}

pub fn run(project_root: &Path, args: ShowArgs) -> Result<()> {
    let paths = InstancePaths::new(project_root, &args.instance);
    instance::load(&paths)?;

    let tasks = store::load_tasks(&paths.tasks_jsonl())?;
    let Some(task) = tasks.iter().find(|t| t.id == args.task_id) else {
        bail!("not found: task {}", args.task_id);
    };
    println!("{}", serde_json::to_string_pretty(task)?);
    Ok(())
}
