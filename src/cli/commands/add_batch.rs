use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use serde::Deserialize;

use taskloop::config::Settings;
use taskloop::lock::InstanceLock;
use taskloop::models::{Task, TaskStatus};
use taskloop::paths::InstancePaths;
use taskloop::{instance, store};

#[derive(Args)]
pub struct AddBatchArgs {
    pub instance: String,
    #[arg(long, conflicts_with = "stdin")]
    pub file: Option<PathBuf>,
    #[arg(long)]
    pub stdin: bool,
    #[arg(long)]
    pub json: bool,
}

/// A batch entry as supplied by the caller, before id assignment.
#[derive(Deserialize)]
struct BatchEntry {
    title: String,
    spec: String,
    #[serde(default)]
    verify: Vec<String>,
    model_hint: String,
    #[serde(default)]
    priority: String,
    #[serde(default)]
    source: String,
}

pub async fn run(project_root: &Path, args: AddBatchArgs) -> Result<()> {
    let paths = InstancePaths::new(project_root, &args.instance);
    instance::load(&paths)?;

    let contents = match (&args.file, args.stdin) {
        (Some(path), _) => std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
        (None, true) => {
            use std::io::Read;
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
        (None, false) => bail!("required: one of --file or --stdin"),
    };

    let entries = parse_batch(&contents)?;

    // Held for the command's full duration (§4.2), same as `add`.
    let settings = Settings::load()?;
    let _lock = InstanceLock::acquire(&paths.lock_file(), settings.lock_timeout, settings.lock_poll_interval).await?;

    let mut tasks = store::load_tasks(&paths.tasks_jsonl())?;
    let mut added = Vec::new();
    for entry in entries {
        let id = instance::next_task_id(&tasks);
        let now = Utc::now();
        let task = Task {
            id,
            title: entry.title,
            spec: entry.spec,
            verify: entry.verify,
            status: TaskStatus::Todo,
            model_hint: entry.model_hint,
            priority: entry.priority,
            attempts: 0,
            last_error: None,
            source: entry.source,
            created_at: now,
            updated_at: now,
            extra: Default::default(),
        };
        if let Err(e) = task.validate() {
            bail!("validation error: {e}");
        }
        tasks.push(task.clone());
        added.push(task);
    }
    store::save_tasks(&paths.tasks_jsonl(), &tasks)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&added)?);
    } else {
        println!("added {} tasks", added.len());
    }
    Ok(())
}

/// Accepts either a top-level JSON array (detected by a `[` prefix) or
/// JSONL, one object per line (§6).
fn parse_batch(contents: &str) -> Result<Vec<BatchEntry>> {
    let trimmed = contents.trim_start();
    if trimmed.starts_with('[') {
        Ok(serde_json::from_str(trimmed)?)
    } else {
        let mut entries = Vec::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(line)?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskloop::instance;

    #[test]
    fn json_array_and_jsonl_forms_are_equivalent() {
        let as_array = r#"[{"title":"a","spec":"s","verify":["echo ok"],"model_hint":"sonnet"},
                            {"title":"b","spec":"s","verify":["echo ok"],"model_hint":"sonnet"}]"#;
        let as_jsonl = "{\"title\":\"a\",\"spec\":\"s\",\"verify\":[\"echo ok\"],\"model_hint\":\"sonnet\"}\n\
                         {\"title\":\"b\",\"spec\":\"s\",\"verify\":[\"echo ok\"],\"model_hint\":\"sonnet\"}\n";

        let from_array = parse_batch(as_array).unwrap();
        let from_jsonl = parse_batch(as_jsonl).unwrap();

        assert_eq!(from_array.len(), 2);
        assert_eq!(from_array.len(), from_jsonl.len());
        assert_eq!(from_array[0].title, from_jsonl[0].title);
        assert_eq!(from_array[1].title, from_jsonl[1].title);
    }

    #[tokio::test]
    async fn run_assigns_strictly_monotonic_ids() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstancePaths::new(dir.path(), "alpha");
        instance::init(&paths, "alpha", "/work").unwrap();

        let batch_file = dir.path().join("batch.json");
        std::fs::write(
            &batch_file,
            r#"[{"title":"a","spec":"s","verify":["echo ok"],"model_hint":"sonnet"},
                {"title":"b","spec":"s","verify":["echo ok"],"model_hint":"sonnet"}]"#,
        )
        .unwrap();

        run(
            dir.path(),
            AddBatchArgs {
                instance: "alpha".to_string(),
                file: Some(batch_file),
                stdin: false,
                json: true,
            },
        )
        .await
        .unwrap();

        let loaded = store::load_tasks(&paths.tasks_jsonl()).unwrap();
        assert_eq!(loaded[0].id, "OB-001");
        assert_eq!(loaded[1].id, "OB-002");
    }
}
