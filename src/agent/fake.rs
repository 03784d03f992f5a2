//! A scripted `AgentRunner` double for exercising the execution loop without
//! real `claude`/`codex` binaries.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{AgentRunner, ProcessOutcome};
use crate::Result;

/// One scripted response. `Fixed` is returned verbatim; `Fail` is emitted
/// exactly once before the script advances to the next entry.
#[derive(Clone)]
pub enum Script {
    Succeed { output: String },
    Fail { output: String },
    Timeout,
}

/// Replays a fixed sequence of [`Script`] entries, one per call, then
/// repeats the final entry for any calls beyond the scripted sequence.
pub struct FakeAgentRunner {
    script: Mutex<Vec<Script>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeAgentRunner {
    pub fn new(script: Vec<Script>) -> Self {
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always_succeeds(output: impl Into<String>) -> Self {
        Self::new(vec![Script::Succeed { output: output.into() }])
    }

    /// The `(provider, model)` pairs this runner was invoked with, in order.
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl AgentRunner for FakeAgentRunner {
    async fn run(
        &self,
        provider: &str,
        model: &str,
        _workdir: &Path,
        _prompt: &str,
        _timeout: Duration,
    ) -> Result<ProcessOutcome> {
        self.calls
            .lock()
            .await
            .push((provider.to_string(), model.to_string()));

        let mut script = self.script.lock().await;
        let entry = if script.len() > 1 {
            script.remove(0)
        } else {
            script.first().cloned().unwrap_or(Script::Succeed { output: String::new() })
        };

        Ok(match entry {
            Script::Succeed { output } => ProcessOutcome::Success { output },
            Script::Fail { output } => ProcessOutcome::Failure { output, exit_code: Some(1) },
            Script::Timeout => ProcessOutcome::TimedOut { output: String::new() },
        })
    }
}
