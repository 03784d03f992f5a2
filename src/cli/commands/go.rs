use std::path::Path;

use anyhow::Result;
use clap::Args;

use taskloop::agent::ProcessAgentRunner;
use taskloop::config::Settings;
use taskloop::engine::{self, GoOptions};
use taskloop::paths::InstancePaths;
use taskloop::instance;

#[derive(Args)]
pub struct GoArgs {
    pub instance: String,
    #[arg(long)]
    pub limit: Option<u32>,
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long)]
    pub require_commit: bool,
    #[arg(long)]
    pub json: bool,
}

pub async fn run(project_root: &Path, args: GoArgs) -> Result<()> {
    let paths = InstancePaths::new(project_root, &args.instance);
    let instance = instance::load(&paths)?;
    let settings = Settings::load()?;

    let runner = ProcessAgentRunner::new(settings.subprocess_grace);
    let opts = GoOptions {
        limit: args.limit.unwrap_or(u32::MAX),
        dry_run: args.dry_run,
        require_commit: args.require_commit,
        max_attempts: settings.max_attempts,
        max_transient_retries: settings.max_transient_retries,
        cooldown: settings.cooldown,
    };

    let workdir = std::path::PathBuf::from(&instance.workdir);
    let summary = engine::run_go(&paths, &settings, &runner, &args.instance, &workdir, opts).await?;

    if args.json {
        println!(
            "{}",
            serde_json::json!({
                "instance": summary.instance,
                "processed": summary.processed,
                "done": summary.done,
                "failed": summary.failed,
                "blocked": summary.blocked,
                "dry_run": summary.dry_run,
                "task_ids": summary.task_ids,
            })
        );
    } else {
        println!("{summary}");
    }
    Ok(())
}
