// src/arena/lock.rs
//! Cross-process lock guarding the mutable half of the arena
//!
//! Built on `flock(2)` over a lock file next to the region. `flock` excludes
//! per open file description, so two handles opened by threads of the same
//! process exclude each other exactly like two processes do. An in-process
//! mutex additionally serializes threads sharing a single handle.

use crate::utils::errors::{MazeError, Result};
use nix::fcntl::{flock, FlockArg};
use parking_lot::{Mutex, MutexGuard};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

/// Named cross-process mutex
pub struct ArenaLock {
    path: PathBuf,
    file: File,
    local: Mutex<()>,
}

impl ArenaLock {
    /// Open the lock file, creating it if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| {
                MazeError::Lock(format!("cannot open lock file {}: {}", path.display(), e))
            })?;

        Ok(Self {
            path,
            file,
            local: Mutex::new(()),
        })
    }

    /// Block until no other holder remains, then take the lock
    pub fn acquire(&self) -> Result<LockGuard<'_>> {
        let local = self.local.lock();

        // EINTR just means a signal arrived while we were waiting
        loop {
            match flock(self.file.as_raw_fd(), FlockArg::LockExclusive) {
                Ok(()) => break,
                Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => {
                    return Err(MazeError::Lock(format!(
                        "flock on {} failed: {}",
                        self.path.display(),
                        e
                    )))
                }
            }
        }
        trace!(path = %self.path.display(), "Arena lock acquired");

        Ok(LockGuard {
            lock: self,
            _local: local,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Held lock; released on drop, on every exit path
pub struct LockGuard<'a> {
    lock: &'a ArenaLock,
    _local: MutexGuard<'a, ()>,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = flock(self.lock.file.as_raw_fd(), FlockArg::Unlock) {
            warn!(path = %self.lock.path.display(), "Failed to release arena lock: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_reacquire_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let lock = ArenaLock::open(dir.path().join("maze.lock")).unwrap();

        drop(lock.acquire().unwrap());
        drop(lock.acquire().unwrap());
    }

    #[test]
    fn test_separate_handles_exclude_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maze.lock");
        let inside = Arc::new(AtomicBool::new(false));
        let entries = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                let inside = Arc::clone(&inside);
                let entries = Arc::clone(&entries);
                thread::spawn(move || {
                    let lock = ArenaLock::open(&path).unwrap();
                    for _ in 0..20 {
                        let _guard = lock.acquire().unwrap();
                        assert!(!inside.swap(true, Ordering::SeqCst), "two holders at once");
                        thread::sleep(Duration::from_micros(50));
                        inside.store(false, Ordering::SeqCst);
                        entries.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(entries.load(Ordering::SeqCst), 80);
    }

    #[test]
    fn test_shared_handle_excludes_threads() {
        let dir = tempfile::tempdir().unwrap();
        let lock = Arc::new(ArenaLock::open(dir.path().join("maze.lock")).unwrap());
        let inside = Arc::new(AtomicBool::new(false));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    for _ in 0..20 {
                        let _guard = lock.acquire().unwrap();
                        assert!(!inside.swap(true, Ordering::SeqCst));
                        inside.store(false, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
