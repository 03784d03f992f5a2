//! C8: Commit Gate — optionally requires the working tree's head revision to
//! advance across a task execution (§4.8).

use std::path::Path;
use std::time::Duration;

use crate::agent::process::{self, ProcessOutcome};
use crate::{Result, TaskLoopError};

/// Runs `git rev-parse HEAD` in `workdir` and returns the trimmed revision.
pub async fn head_revision(workdir: &Path) -> Result<String> {
    let timeout = Duration::from_secs(30);
    match process::run_shell_command(workdir, "git rev-parse HEAD", timeout).await? {
        ProcessOutcome::Success { output } => Ok(output.trim().to_string()),
        ProcessOutcome::Failure { output, .. } => Err(TaskLoopError::CommitGate(format!(
            "head probe failed: {}",
            output.trim()
        ))),
        ProcessOutcome::TimedOut { .. } => {
            Err(TaskLoopError::CommitGate("head probe timed out".to_string()))
        }
    }
}

/// Checks that `post` differs from `pre`, the gate's pass condition.
pub fn check_advanced(pre: &str, post: &str) -> Result<()> {
    if pre == post {
        Err(TaskLoopError::CommitGate(
            "require-commit enabled: no new commit created".to_string(),
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_heads_fail_the_gate() {
        let err = check_advanced("abc123", "abc123").unwrap_err();
        assert!(err.to_string().contains("no new commit created"));
    }

    #[test]
    fn differing_heads_pass_the_gate() {
        assert!(check_advanced("abc123", "def456").is_ok());
    }
}
