//! Instance lifecycle: `init` creates the per-instance state directory and
//! its `instance.json` descriptor; never mutated by the execution loop (§3).

use chrono::Utc;

use crate::models::Instance;
use crate::paths::InstancePaths;
use crate::{store, Result, TaskLoopError};

/// Creates the instance's state directory and `instance.json` if absent.
/// Idempotent: calling `init` on an existing instance is a no-op that
/// returns the existing descriptor.
pub fn init(paths: &InstancePaths, name: &str, workdir: &str) -> Result<Instance> {
    if paths.instance_json().exists() {
        return load(paths);
    }

    std::fs::create_dir_all(paths.instance_dir())?;
    let instance = Instance {
        name: name.to_string(),
        workdir: workdir.to_string(),
        created_at: Utc::now(),
    };
    store::write_json(&paths.instance_json(), &instance)?;
    Ok(instance)
}

/// Loads an existing instance's descriptor, failing with a not-found error
/// if it has never been initialized.
pub fn load(paths: &InstancePaths) -> Result<Instance> {
    if !paths.instance_json().exists() {
        return Err(TaskLoopError::NotFound(format!(
            "instance not initialized: {}",
            paths.instance_json().display()
        )));
    }
    store::read_json(&paths.instance_json())
}

/// Lists the names of all initialized instances under `project_root`.
pub fn list_all(project_root: &std::path::Path) -> Result<Vec<String>> {
    let root = InstancePaths::instances_root(project_root);
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(&root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                if name != "global" {
                    names.push(name.to_string());
                }
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Assigns the next task id of the form `OB-NNN` (zero-padded to at least 3
/// digits), strictly monotonic from the highest existing numeric suffix
/// (P8).
pub fn next_task_id(existing: &[crate::models::Task]) -> String {
    let max = existing
        .iter()
        .filter_map(|t| t.id.strip_prefix("OB-"))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("OB-{:03}", max + 1)
}
