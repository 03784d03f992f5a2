//! C5: Agent Invoker — spawns a provider-specific subprocess, feeds the
//! prompt on stdin, and enforces timeout/cancellation (§4.5).

pub mod command_builder;
pub mod fake;
pub mod process;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::Result;
pub use process::ProcessOutcome;

/// Abstraction over `run_agent(provider, model, workdir, prompt, timeout)`,
/// implemented for real subprocesses and swapped for a scripted double in
/// tests.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(
        &self,
        provider: &str,
        model: &str,
        workdir: &Path,
        prompt: &str,
        timeout: Duration,
    ) -> Result<ProcessOutcome>;
}

/// Default `AgentRunner` backed by the real `claude`/`codex` binaries.
pub struct ProcessAgentRunner {
    pub subprocess_grace: Duration,
}

impl ProcessAgentRunner {
    pub fn new(subprocess_grace: Duration) -> Self {
        Self { subprocess_grace }
    }
}

#[async_trait]
impl AgentRunner for ProcessAgentRunner {
    async fn run(
        &self,
        provider: &str,
        model: &str,
        workdir: &Path,
        prompt: &str,
        timeout: Duration,
    ) -> Result<ProcessOutcome> {
        let cmd = match provider {
            "claude" => command_builder::claude_command(model),
            _ => command_builder::codex_command(workdir, model),
        };
        process::run_with_stdin(cmd, workdir, prompt, timeout, self.subprocess_grace).await
    }
}

/// Renders a `ProcessOutcome` into the `(output, error)` pair described by
/// §4.5, where `error` is `None` on success.
pub fn outcome_to_result(outcome: ProcessOutcome) -> (String, Option<String>) {
    match outcome {
        ProcessOutcome::Success { output } => (output, None),
        ProcessOutcome::Failure { output, exit_code } => {
            let error = match exit_code {
                Some(code) => format!("agent exited with code {code}"),
                None => "agent exited abnormally".to_string(),
            };
            (output, Some(error))
        }
        ProcessOutcome::TimedOut { output } => (output, Some("agent timed out".to_string())),
    }
}
