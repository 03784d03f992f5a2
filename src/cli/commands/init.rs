use std::path::Path;

use anyhow::Result;
use clap::Args;

use taskloop::paths::InstancePaths;

#[derive(Args)]
pub struct InitArgs {
    pub instance: String,
    #[arg(long)]
    pub workdir: Option<String>,
}

pub fn run(project_root: &Path, args: InitArgs) -> Result<()> {
    let paths = InstancePaths::new(project_root, &args.instance);
    let workdir = args
        .workdir
        .unwrap_or_else(|| project_root.display().to_string());
    let instance = taskloop::instance::init(&paths, &args.instance, &workdir)?;
    println!("initialized instance {} at {}", instance.name, instance.workdir);
    Ok(())
}
