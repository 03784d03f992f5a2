//! C7: Verifier — runs each verify command in sequence under the platform
//! shell, stopping at the first non-zero exit (§4.7).

use std::time::Duration;

use crate::agent::process::{self, ProcessOutcome};
use crate::Result;

/// Outcome of a verify pass: either every command exited zero, or the first
/// failing command plus its captured output.
pub struct VerifyOutcome {
    pub failing_command: Option<String>,
    pub output: String,
}

/// Runs `commands` in order inside `workdir`, each under its own `timeout`.
/// Halts at the first failure; later commands are not attempted.
pub async fn run_verifies(workdir: &std::path::Path, commands: &[String], timeout: Duration) -> Result<VerifyOutcome> {
    let mut last_output = String::new();
    for command in commands {
        let outcome = process::run_shell_command(workdir, command, timeout).await?;
        match outcome {
            ProcessOutcome::Success { output } => {
                last_output = output;
            }
            ProcessOutcome::Failure { output, .. } | ProcessOutcome::TimedOut { output } => {
                return Ok(VerifyOutcome {
                    failing_command: Some(command.clone()),
                    output,
                });
            }
        }
    }
    Ok(VerifyOutcome {
        failing_command: None,
        output: last_output,
    })
}
