//! Named cross-process lock.
//!
//! Every invocation that touches a journal holds this lock for the whole
//! session. The lock is keyed by name, not by journal path, and is an
//! advisory exclusive lock on `<dir>/<name>.lock`. Release happens when the
//! guard is dropped, on every exit path.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::errors::{JourError, JourResult};

/// Lock name shared by every journal invocation on the machine.
pub const DEFAULT_LOCK_NAME: &str = "journal_writer";

/// Five minutes.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Where and how long to wait for the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSpec {
    pub name: String,
    pub dir: PathBuf,
    pub timeout: Duration,
}

impl Default for LockSpec {
    fn default() -> Self {
        Self {
            name: DEFAULT_LOCK_NAME.to_string(),
            dir: std::env::temp_dir(),
            timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl LockSpec {
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.lock", self.name))
    }
}

/// Held lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("failed to release lock {}: {}", self.path.display(), e);
        } else {
            tracing::debug!("released lock {}", self.path.display());
        }
    }
}

/// Blocks until the lock described by `spec` is held or its timeout elapses.
pub fn acquire(spec: &LockSpec) -> JourResult<LockGuard> {
    if !spec.dir.as_os_str().is_empty() {
        fs::create_dir_all(&spec.dir)
            .map_err(|e| JourError::io(Some(spec.dir.clone()), "create lock directory", e))?;
    }

    let path = spec.path();
    let file = open_lock_file(&path)?;

    let start = Instant::now();
    let mut announced = false;

    loop {
        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(
                    "acquired lock {} after {:?}",
                    path.display(),
                    start.elapsed()
                );
                return Ok(LockGuard { file, path });
            }
            Err(error) if error.kind() == fs2::lock_contended_error().kind() => {
                if start.elapsed() >= spec.timeout {
                    return Err(JourError::Concurrency {
                        lock_name: spec.name.clone(),
                        timeout_secs: spec.timeout.as_secs(),
                    });
                }
                if !announced {
                    tracing::info!("waiting for lock '{}'", spec.name);
                    announced = true;
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(error) => {
                return Err(JourError::io(Some(path), "acquire lock", error));
            }
        }
    }
}

/// Opens the lock file read-only when it exists, so a file left behind by
/// another user still works; creates it otherwise.
fn open_lock_file(path: &Path) -> JourResult<File> {
    match File::open(path) {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == io::ErrorKind::NotFound => OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| JourError::io(Some(path.to_path_buf()), "create lock file", e)),
        Err(e) => Err(JourError::io(Some(path.to_path_buf()), "open lock file", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn spec(dir: &Path, timeout: Duration) -> LockSpec {
        LockSpec {
            name: "journal_writer_test".into(),
            dir: dir.to_path_buf(),
            timeout,
        }
    }

    #[test]
    fn second_acquire_times_out_while_first_is_held() {
        let dir = TempDir::new().unwrap();
        let _held = acquire(&spec(dir.path(), Duration::from_secs(1))).unwrap();

        let err = acquire(&spec(dir.path(), Duration::from_millis(200))).unwrap_err();
        assert!(matches!(err, JourError::Concurrency { .. }));
        assert_eq!(err.exit_code(), crate::errors::EXIT_CONCURRENCY);
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let first = acquire(&spec(dir.path(), Duration::from_secs(1))).unwrap();
        drop(first);
        assert!(acquire(&spec(dir.path(), Duration::from_millis(200))).is_ok());
    }

    #[test]
    fn waiter_proceeds_once_holder_releases() {
        let dir = TempDir::new().unwrap();
        let held = acquire(&spec(dir.path(), Duration::from_secs(1))).unwrap();

        let (tx, rx) = mpsc::channel();
        let waiter_spec = spec(dir.path(), Duration::from_secs(10));
        let waiter = thread::spawn(move || {
            let guard = acquire(&waiter_spec);
            tx.send(guard.is_ok()).unwrap();
        });

        thread::sleep(Duration::from_millis(200));
        assert!(rx.try_recv().is_err(), "waiter must block while lock is held");
        drop(held);

        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        waiter.join().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn read_only_lock_file_left_behind_still_locks() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let lock_path = spec(dir.path(), Duration::from_secs(1)).path();
        fs::write(&lock_path, "").unwrap();
        fs::set_permissions(&lock_path, fs::Permissions::from_mode(0o444)).unwrap();

        let _held = acquire(&spec(dir.path(), Duration::from_secs(1))).unwrap();
        let err = acquire(&spec(dir.path(), Duration::from_millis(100))).unwrap_err();
        assert!(matches!(err, JourError::Concurrency { .. }));
    }

    #[test]
    fn different_names_do_not_contend() {
        let dir = TempDir::new().unwrap();
        let _a = acquire(&spec(dir.path(), Duration::from_secs(1))).unwrap();
        let other = LockSpec {
            name: "other".into(),
            ..spec(dir.path(), Duration::from_millis(100))
        };
        assert!(acquire(&other).is_ok());
    }
}
