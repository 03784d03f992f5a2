use std::path::Path;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use taskloop::models::TaskStatus;
use taskloop::paths::InstancePaths;
use taskloop::{instance, store};

#[derive(Args)]
pub struct StatusArgs {
    pub instance: Option<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize, Default, Clone, Copy)]
struct Counts {
    todo: u32,
    in_progress: u32,
    done: u32,
    failed: u32,
    blocked: u32,
}

fn count(project_root: &Path, instance_name: &str) -> Result<Counts> {
    let paths = InstancePaths::new(project_root, instance_name);
    let tasks = store::load_tasks(&paths.tasks_jsonl())?;
    let mut counts = Counts::default();
    for task in &tasks {
        match task.status {
            TaskStatus::Todo => counts.todo += 1,
            TaskStatus::InProgress => counts.in_progress += 1,
            TaskStatus::Done => counts.done += 1,
            TaskStatus::Failed => counts.failed += 1,
            TaskStatus::Blocked => counts.blocked += 1,
        }
    }
    Ok(counts)
}

pub fn run(project_root: &Path, args: StatusArgs) -> Result<()> {
    match args.instance {
        Some(name) => {
            let paths = InstancePaths::new(project_root, &name);
            instance::load(&paths)?;
            let counts = count(project_root, &name)?;
            print_one(&name, counts, args.json)?;
        }
        None => {
            let names = instance::list_all(project_root)?;
            let mut all = Vec::new();
            for name in &names {
                all.push((name.clone(), count(project_root, name)?));
            }
            if args.json {
                let as_map: std::collections::BTreeMap<_, _> = all.into_iter().collect();
                println!("{}", serde_json::to_string_pretty(&as_map)?);
            } else {
                for (name, counts) in all {
                    print_one(&name, counts, false)?;
                }
            }
        }
    }
    Ok(())
}

fn print_one(name: &str, counts: Counts, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&counts)?);
    } else {
        println!(
            "{name}: todo={} in_progress={} done={} failed={} blocked={}",
            counts.todo, counts.in_progress, counts.done, counts.failed, counts.blocked
        );
    }
    Ok(())
}
