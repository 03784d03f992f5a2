//! Subprocess supervision shared by the agent invoker, verifier, and commit
//! gate: spawn, feed stdin, capture merged stdout+stderr, and enforce
//! process-tree cancellation on timeout (§4.5, §5 Cancellation).

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::Result;

/// Result of running a subprocess to completion or to timeout.
pub enum ProcessOutcome {
    Success { output: String },
    Failure { output: String, exit_code: Option<i32> },
    TimedOut { output: String },
}

/// Spawns `command` under the platform's native shell, waits up to
/// `timeout`, and returns the merged stdout+stderr capture.
pub async fn run_shell_command(workdir: &Path, command: &str, timeout: Duration) -> Result<ProcessOutcome> {
    let mut cmd = shell_command(command);
    cmd.current_dir(workdir);
    run_to_completion(cmd, None, timeout, default_grace()).await
}

/// Spawns a provider subprocess, feeds `prompt` on stdin, and waits up to
/// `timeout`, returning the merged stdout+stderr capture.
pub async fn run_with_stdin(
    mut cmd: Command,
    workdir: &Path,
    prompt: &str,
    timeout: Duration,
    grace: Duration,
) -> Result<ProcessOutcome> {
    cmd.current_dir(workdir);
    run_to_completion(cmd, Some(prompt.to_string()), timeout, grace).await
}

fn default_grace() -> Duration {
    Duration::from_secs(10)
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd.exe");
    cmd.arg("/c").arg(command);
    cmd
}

/// Configures `cmd` to run detached into its own process group (Unix) so
/// that a timeout can kill the whole subtree, not just the direct child.
#[cfg(unix)]
fn prepare(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(windows)]
fn prepare(_cmd: &mut Command) {}

// 🔧 ARCHITECTURE DECISION: stdout and stderr are pumped by two independent
// spawned tasks into shared buffers, and only `child.wait()` is raced against
// the timeout.
// Why: reading one pipe to EOF before starting the other can deadlock if the
// child fills both OS pipe buffers concurrently (it blocks writing stderr
// while we're still draining stdout, and vice versa). Pumping into a shared
// buffer rather than returning an owned `String` from the task also means a
// timeout still leaves whatever was captured so far, instead of discarding it.
// Alternative (rejected): `tokio::join!` the two `read_to_string` futures
// inline — fixes the deadlock but still loses all output on timeout, since
// the joined future itself is what gets cancelled by the outer `timeout()`.
async fn run_to_completion(
    mut cmd: Command,
    stdin_prompt: Option<String>,
    timeout: Duration,
    grace: Duration,
) -> Result<ProcessOutcome> {
    prepare(&mut cmd);
    cmd.stdin(if stdin_prompt.is_some() { Stdio::piped() } else { Stdio::null() });
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd.spawn()?;

    if let Some(prompt) = stdin_prompt {
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes()).await?;
            stdin.shutdown().await?;
        }
    }

    let out_buf = Arc::new(AsyncMutex::new(String::new()));
    let err_buf = Arc::new(AsyncMutex::new(String::new()));

    let stdout_task = child.stdout.take().map(|s| tokio::spawn(pump_to_buffer(s, out_buf.clone())));
    let stderr_task = child.stderr.take().map(|s| tokio::spawn(pump_to_buffer(s, err_buf.clone())));

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            join_pumps(stdout_task, stderr_task, Duration::from_secs(5)).await;
            let output = combined_output(&out_buf, &err_buf).await;
            if status.success() {
                Ok(ProcessOutcome::Success { output })
            } else {
                Ok(ProcessOutcome::Failure {
                    output,
                    exit_code: status.code(),
                })
            }
        }
        Ok(Err(e)) => {
            abort_pumps(stdout_task, stderr_task);
            Err(e.into())
        }
        Err(_) => {
            kill_process_tree(&mut child, grace).await;
            join_pumps(stdout_task, stderr_task, Duration::from_secs(2)).await;
            let output = combined_output(&out_buf, &err_buf).await;
            Ok(ProcessOutcome::TimedOut { output })
        }
    }
}

/// Reads `reader` to EOF in chunks, appending each chunk to `buffer` as it
/// arrives so a caller racing this against a timeout still sees partial
/// output instead of nothing.
async fn pump_to_buffer<R: AsyncRead + Unpin>(mut reader: R, buffer: Arc<AsyncMutex<String>>) {
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buffer.lock().await.push_str(&String::from_utf8_lossy(&chunk[..n])),
        }
    }
}

/// Waits for both pump tasks to notice the pipes have closed, bounded by
/// `bound` so a pipe that never closes can't hang the caller forever.
async fn join_pumps(stdout_task: Option<JoinHandle<()>>, stderr_task: Option<JoinHandle<()>>, bound: Duration) {
    let join_both = async {
        if let Some(t) = stdout_task {
            let _ = t.await;
        }
        if let Some(t) = stderr_task {
            let _ = t.await;
        }
    };
    let _ = tokio::time::timeout(bound, join_both).await;
}

fn abort_pumps(stdout_task: Option<JoinHandle<()>>, stderr_task: Option<JoinHandle<()>>) {
    if let Some(t) = stdout_task {
        t.abort();
    }
    if let Some(t) = stderr_task {
        t.abort();
    }
}

async fn combined_output(out_buf: &Arc<AsyncMutex<String>>, err_buf: &Arc<AsyncMutex<String>>) -> String {
    let mut combined = out_buf.lock().await.clone();
    combined.push_str(&err_buf.lock().await);
    combined
}

/// Terminates the subprocess and its descendants, first cooperatively then
/// forcibly. Native process-group signaling is used on Unix; `taskkill /T`
/// is used on Windows.
async fn kill_process_tree(child: &mut Child, grace: Duration) {
    let pid = child.id();

    #[cfg(unix)]
    if let Some(pid) = pid {
        unsafe {
            let ret = libc::kill(-(pid as i32), libc::SIGTERM);
            if ret != 0 {
                warn!(pid, "SIGTERM to process group failed");
            }
        }
    }

    #[cfg(windows)]
    if let Some(pid) = pid {
        let _ = tokio::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .status()
            .await;
    }

    let exited = tokio::time::timeout(grace, child.wait()).await;
    if exited.is_err() {
        debug!(pid, "process tree did not exit within grace window, forcing kill");
        #[cfg(unix)]
        if let Some(pid) = pid {
            unsafe {
                libc::kill(-(pid as i32), libc::SIGKILL);
            }
        }
        let _ = child.kill().await;
        let _ = child.wait().await;
    }
}
