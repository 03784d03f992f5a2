use thiserror::Error;

/// Convenience alias for results returned by the library.
pub type Result<T> = std::result::Result<T, TaskLoopError>;

/// All failure kinds the loop and its components produce.
///
/// `Transient` is internal-only: the engine retries on it and it must never
/// reach a caller as a surfaced task failure (see engine::backoff).
#[derive(Error, Debug)]
pub enum TaskLoopError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("could not acquire instance lock within {0:?}")]
    LockTimeout(std::time::Duration),

    #[error("parse error at {path}:{line}: {message}")]
    Parse {
        path: std::path::PathBuf,
        line: usize,
        message: String,
    },

    #[error("agent execution failed: {0}")]
    Agent(String),

    #[error("agent execution timed out after {0:?}")]
    AgentTimeout(std::time::Duration),

    #[error("verify command failed: {command}")]
    VerifyFailed { command: String, output: String },

    #[error("commit gate failed: {0}")]
    CommitGate(String),

    #[error("transient provider failure: {0}")]
    Transient(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Exit-code classification per the CLI contract (§6): substring matching on
/// the rendered error message. 0 is reserved for success and is not produced
/// here.
pub fn classify_exit_code(err: &anyhow::Error) -> i32 {
    let message = err.to_string().to_lowercase();
    if message.starts_with("usage:") {
        2
    } else if message.contains("required")
        || message.contains("must be")
        || message.contains("cannot be empty")
    {
        3
    } else if message.contains("not initialized") || message.contains("not found") {
        4
    } else {
        10
    }
}
