//! C1: State Store — JSONL task/run persistence with atomic rewrite (§4.1).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{RunRecord, Task};
use crate::{Result, TaskLoopError};

fn parse_jsonl<T: DeserializeOwned>(path: &Path, contents: &str) -> Result<Vec<T>> {
    let mut items = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let item = serde_json::from_str::<T>(trimmed).map_err(|e| TaskLoopError::Parse {
            path: path.to_path_buf(),
            line: idx + 1,
            message: e.to_string(),
        })?;
        items.push(item);
    }
    Ok(items)
}

/// Loads the task queue, in file order. Returns an empty sequence if the file
/// does not yet exist (a fresh instance has no tasks).
pub fn load_tasks(path: &Path) -> Result<Vec<Task>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path)?;
    parse_jsonl(path, &contents)
}

/// Loads the append-only run log, in file order.
pub fn load_runs(path: &Path) -> Result<Vec<RunRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path)?;
    parse_jsonl(path, &contents)
}

/// Writes the entire queue to `<path>.tmp` then renames over `path`,
/// guaranteeing crash-atomicity (I4): readers observe either the prior or the
/// complete new queue, never a torn line.
pub fn save_tasks(path: &Path, tasks: &[Task]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut buf = String::new();
    for task in tasks {
        buf.push_str(&serde_json::to_string(task)?);
        buf.push('\n');
    }

    let tmp_path = tmp_path_for(path);
    {
        let mut tmp = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        tmp.write_all(buf.as_bytes())?;
        tmp.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    std::path::PathBuf::from(os)
}

/// Appends one JSON-encoded run record, including its trailing newline.
pub fn append_run(path: &Path, record: &RunRecord) -> Result<()> {
    let line = serde_json::to_string(record)?;
    append_line(path, &line)
}

/// Opens `path` with create+append semantics and writes `text` plus a
/// trailing newline.
pub fn append_line(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(text.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Serializes any `Serialize` value and appends it, used for the instance's
/// `instance.json` (a single JSON object, not JSONL).
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(value)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
