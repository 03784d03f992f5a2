use std::path::Path;

use anyhow::Result;
use clap::Args;

use taskloop::paths::InstancePaths;
use taskloop::{instance, store};

#[derive(Args)]
pub struct RunsArgs {
    pub instance: String,
    #[arg(long)]
    pub limit: Option<usize>,
    #[arg(long = "task-id")]
    pub task_id: Option<String>,
    #[arg(long)]
    pub json: bool,
}

pub fn run(project_root: &Path, args: RunsArgs) -> Result<()> {
    let paths = InstancePaths::new(project_root, &args.instance);
    instance::load(&paths)?;

    let mut runs = store::load_runs(&paths.runs_jsonl())?;
    if let Some(task_id) = &args.task_id {
        runs.retain(|r| &r.task_id == task_id);
    }
    if let Some(limit) = args.limit {
        if runs.len() > limit {
            runs = runs.split_off(runs.len() - limit);
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
    } else {
        for run in &runs {
            println!(
                "{} {} provider={} model={} status={:?}",
                run.started_at.to_rfc3339(),
                run.task_id,
                run.provider,
                run.model,
                run.status
            );
        }
    }
    Ok(())
}
