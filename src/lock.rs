//! C2: Instance Lock — cooperative, advisory, exclusive-create lock file
//! providing single-writer discipline across CLI processes (§4.2).

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::{Result, TaskLoopError};

/// Holds an exclusive-create lock file for the lifetime of the guard.
/// Dropping the guard releases the lock (best-effort; failures are logged,
/// never panicked on, since a stuck lock should not poison the process).
pub struct InstanceLock {
    path: PathBuf,
    held: bool,
}

impl InstanceLock {
    /// Polls for exclusive creation of the lock file at roughly
    /// `poll_interval` steps, failing with `LockTimeout` once `timeout`
    /// elapses.
    pub async fn acquire(path: &Path, timeout: Duration, poll_interval: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
            {
                Ok(_) => {
                    debug!(path = %path.display(), "acquired instance lock");
                    return Ok(Self {
                        path: path.to_path_buf(),
                        held: true,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(TaskLoopError::LockTimeout(timeout));
                    }
                    tokio::time::sleep(poll_interval).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Releases the lock. Idempotent: calling it twice, or after a prior
    /// drop, is a no-op.
    pub fn release(&mut self) {
        if !self.held {
            return;
        }
        self.held = false;
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to release instance lock");
            }
        }
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_creates_file_and_release_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".tasks.lock");

        let mut lock = InstanceLock::acquire(&path, Duration::from_secs(1), Duration::from_millis(10))
            .await
            .unwrap();
        assert!(path.exists());

        lock.release();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".tasks.lock");

        let mut lock = InstanceLock::acquire(&path, Duration::from_secs(1), Duration::from_millis(10))
            .await
            .unwrap();
        lock.release();
        lock.release();
        assert!(!path.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_times_out_when_already_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".tasks.lock");
        let _held = InstanceLock::acquire(&path, Duration::from_secs(1), Duration::from_millis(10))
            .await
            .unwrap();

        let second = InstanceLock::acquire(&path, Duration::from_millis(200), Duration::from_millis(10)).await;
        assert!(matches!(second, Err(TaskLoopError::LockTimeout(_))));
    }

    #[tokio::test]
    async fn drop_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".tasks.lock");
        {
            let _lock = InstanceLock::acquire(&path, Duration::from_secs(1), Duration::from_millis(10))
                .await
                .unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    // Two concurrent acquirers on the same lock file serialize: exactly one
    // gets it immediately, the other polls until the first releases.
    #[tokio::test]
    async fn concurrent_acquires_serialize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".tasks.lock");

        let first = async {
            let mut lock = InstanceLock::acquire(&path, Duration::from_secs(2), Duration::from_millis(5))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            lock.release();
        };
        let second = async {
            let lock = InstanceLock::acquire(&path, Duration::from_secs(2), Duration::from_millis(5))
                .await
                .unwrap();
            drop(lock);
        };

        futures::join!(first, second);
        assert!(!path.exists());
    }
}
