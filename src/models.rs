use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named task queue and its state directory, scoped to a project working
/// directory. Created by `init`; never mutated by the loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub workdir: String,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of a task (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Failed,
    Blocked,
}

/// A single unit of work completed by a spawned agent process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub spec: String,
    pub verify: Vec<String>,
    pub status: TaskStatus,
    pub model_hint: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Fields from future schema versions round-trip without loss (§4.1: the
    /// schema is open, not closed).
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Task {
    /// Validates the fields that `add`/`add-batch` require to be non-empty
    /// (§3, §7 Validation errors).
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if self.spec.trim().is_empty() {
            return Err("spec must not be empty".to_string());
        }
        if self.verify.is_empty() {
            return Err("verify must have at least one command".to_string());
        }
        if self.model_hint.trim().is_empty() {
            return Err("model_hint is required and cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Provenance of a one-shot fallback invocation (§3 Run record).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackInfo {
    pub provider: String,
    pub model: String,
    pub reason: String,
}

/// Append-only journal entry describing one agent execution (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub task_id: String,
    pub status: TaskStatus,
    pub primary_provider: String,
    pub primary_model: String,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub fallback: Option<FallbackInfo>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(default)]
    pub error: Option<String>,
    pub output_tail: String,
    #[serde(default)]
    pub verify_failed: Option<String>,
}

/// One line of the `cycle.log` file, emitted at the end of every `go`
/// invocation (§4.9 step 13).
#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub instance: String,
    pub processed: u32,
    pub done: u32,
    pub failed: u32,
    pub blocked: u32,
    pub dry_run: bool,
    pub task_ids: Vec<String>,
    pub at: DateTime<Utc>,
}

impl std::fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids = if self.task_ids.is_empty() {
            "-".to_string()
        } else {
            self.task_ids.join(",")
        };
        write!(
            f,
            "{} instance={} processed={} done={} failed={} blocked={} dry_run={} tasks={}",
            self.at.to_rfc3339(),
            self.instance,
            self.processed,
            self.done,
            self.failed,
            self.blocked,
            self.dry_run,
            ids
        )
    }
}
