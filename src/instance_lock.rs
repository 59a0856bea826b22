//! Single dashboard per host.
//!
//! Two dashboards would fight over the display and publish interleaved state
//! to the same topic. The lock is a bound Unix socket: the kernel releases it
//! when the process dies, so a crash never leaves the lock held.

use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Socket file name, placed in the runtime directory.
pub const SOCKET_NAME: &str = "funhouse-dashboard.sock";

#[derive(Debug, Error)]
pub enum InstanceLockError {
    #[error("another dashboard is already running (lock at {0})")]
    AlreadyRunning(PathBuf),

    #[error("failed to acquire instance lock: {0}")]
    Io(#[from] io::Error),
}

/// Held for the lifetime of the dashboard; the socket file is removed on drop.
#[derive(Debug)]
pub struct InstanceLock {
    _listener: UnixListener,
    path: PathBuf,
}

impl InstanceLock {
    /// Acquire the lock at the default socket path.
    pub fn acquire() -> Result<Self, InstanceLockError> {
        Self::acquire_at(&Self::socket_path())
    }

    /// Acquire the lock at `path`.
    pub fn acquire_at(path: &Path) -> Result<Self, InstanceLockError> {
        if path.exists() {
            // A live owner accepts connections; a leftover file after SIGKILL does not
            if UnixStream::connect(path).is_ok() {
                return Err(InstanceLockError::AlreadyRunning(path.to_path_buf()));
            }
            let _ = std::fs::remove_file(path);
        }

        match UnixListener::bind(path) {
            Ok(listener) => Ok(Self {
                _listener: listener,
                path: path.to_path_buf(),
            }),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                Err(InstanceLockError::AlreadyRunning(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `$XDG_RUNTIME_DIR/funhouse-dashboard.sock`, or under `/tmp`.
    pub fn socket_path() -> PathBuf {
        std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
            .join(SOCKET_NAME)
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
