//! Builds the non-interactive, sandbox-bypassing command lines for the
//! `claude` and `codex` provider subprocesses (§6 Subprocess contracts).

use tokio::process::Command;

// 🚨 SECURITY NOTE: both provider commands run fully unattended — permission
// prompts and sandbox confirmations are bypassed on purpose, not overlooked.
// Why: the loop invokes these as background subprocesses with no terminal
// attached to answer a prompt; an agent blocked on stdin waiting for approval
// would hang until the timeout and burn an attempt for nothing.
// Mitigation: the workdir is expected to already be a scoped checkout (the
// operator's concern, not this crate's), and every invocation still runs
// under the timeout and process-group cancellation in `agent::process`.
// `AskUserQuestion`/`EnterPlanMode` are disallowed for Claude specifically
// because those tools exist to *ask* for input this loop can't supply.

/// `claude -p --output-format text --permission-mode bypassPermissions
/// --dangerously-skip-permissions --no-session-persistence
/// --disallowedTools AskUserQuestion,EnterPlanMode [--model M]`
pub fn claude_command(model: &str) -> Command {
    let mut cmd = Command::new("claude");
    cmd.arg("-p")
        .arg("--output-format")
        .arg("text")
        .arg("--permission-mode")
        .arg("bypassPermissions")
        .arg("--dangerously-skip-permissions")
        .arg("--no-session-persistence")
        .arg("--disallowedTools")
        .arg("AskUserQuestion,EnterPlanMode");
    if !model.trim().is_empty() {
        cmd.arg("--model").arg(model);
    }
    cmd
}

/// `codex exec --cd <workdir> --skip-git-repo-check
/// --dangerously-bypass-approvals-and-sandbox [--model M] -`
pub fn codex_command(workdir: &std::path::Path, model: &str) -> Command {
    let mut cmd = Command::new("codex");
    cmd.arg("exec")
        .arg("--cd")
        .arg(workdir)
        .arg("--skip-git-repo-check")
        .arg("--dangerously-bypass-approvals-and-sandbox");
    if !model.trim().is_empty() {
        cmd.arg("--model").arg(model);
    }
    cmd.arg("-");
    cmd
}
