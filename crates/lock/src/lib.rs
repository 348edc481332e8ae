//! The mutator lock file (spec §4.4).
//!
//! A store on disk is guarded by an exclusive `<prefix>/lock` file: at
//! open, one process creates it and starts a heartbeat thread that
//! touches its mtime on a fixed interval so that a crashed process's lock
//! looks stale to the next opener. Grounded on the pack's own
//! `Historical` cache, which also runs a small fixed-interval background
//! job against a shared backend — here narrowed to a single heartbeat
//! rather than a GC sweep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use urkel_fs::{FileSystem, OpenFile};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Lock acquisition tuning (spec §4.4: `stale_ms`, `retry_ms`, `attempts`, `interval_ms`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
    /// A lock younger than this (by mtime) is held by a live process.
    pub stale_ms: u64,
    /// How long to sleep between acquisition attempts.
    pub retry_ms: u64,
    /// How many attempts to make before giving up.
    pub attempts: u32,
    /// Heartbeat period once the lock is held.
    pub interval_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            stale_ms: 10_000,
            retry_ms: 50,
            attempts: 20,
            interval_ms: 1_000,
        }
    }
}

/// The lock could not be acquired within the configured attempts.
#[derive(Debug, Clone, thiserror::Error)]
#[error("lock at {path} held by another process (mtime within {stale_ms}ms, {attempts} attempts exhausted)")]
pub struct LockBusy {
    /// The lock file path.
    pub path: String,
    /// The staleness threshold that was in effect.
    pub stale_ms: u64,
    /// How many attempts were made.
    pub attempts: u32,
}

/// An error raised while acquiring or operating a [`Lock`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// See [`LockBusy`].
    #[error(transparent)]
    Busy(#[from] LockBusy),
    /// A filesystem call failed while acquiring, touching, or releasing the lock.
    #[error(transparent)]
    Fs(#[from] urkel_fs::FsError),
}

/// The crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// An exclusive, heartbeating lock on a store's `<prefix>/lock` file.
///
/// Dropping the lock stops the heartbeat thread and deletes the file, the
/// same way closing a store does (spec §4.4 "On close, stop the
/// heartbeat and delete the file").
pub struct Lock<F: FileSystem> {
    fs: F,
    path: String,
    stop: Arc<AtomicBool>,
    heartbeat: Option<JoinHandle<()>>,
}

impl<F: FileSystem> Lock<F> {
    /// Attempts to acquire the lock at `<prefix>/lock`, retrying past a
    /// stale or clock-skewed holder per `config` (spec §4.4).
    pub fn acquire(fs: F, prefix: &str, config: LockConfig) -> Result<Self> {
        let path = format!("{prefix}/lock");

        for attempt in 0..config.attempts {
            match fs.stat(&path) {
                Err(_) => {
                    // Doesn't exist (or isn't readable): try to claim it.
                    let file = fs.open(&path, true)?;
                    file.touch()?;
                    return Ok(Self::spawn_heartbeat(fs, path, config));
                }
                Ok(meta) => {
                    let now = now_ms();

                    if meta.mtime_ms > now {
                        // Clock skew: a lock timestamped in the future can never
                        // age into staleness under the current clock. Treat it
                        // as abandoned.
                        tracing::warn!(%path, mtime = meta.mtime_ms, now, "lock mtime is in the future, clearing");
                        let _ = fs.unlink(&path);
                        continue;
                    }

                    if now.saturating_sub(meta.mtime_ms) >= config.stale_ms {
                        tracing::info!(%path, "stale lock, reclaiming");
                        let _ = fs.unlink(&path);
                        continue;
                    }

                    tracing::debug!(%path, attempt, "lock held, retrying");
                    thread::sleep(Duration::from_millis(config.retry_ms));
                }
            }
        }

        Err(LockBusy {
            path,
            stale_ms: config.stale_ms,
            attempts: config.attempts,
        }
        .into())
    }

    fn spawn_heartbeat(fs: F, path: String, config: LockConfig) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let heartbeat = {
            let fs = fs.clone();
            let path = path.clone();
            let stop = stop.clone();

            thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(config.interval_ms));

                    if stop.load(Ordering::SeqCst) {
                        break;
                    }

                    if let Ok(file) = fs.open(&path, false) {
                        if let Err(err) = file.touch() {
                            tracing::warn!(%path, %err, "lock heartbeat failed");
                        }
                    }
                }
            })
        };

        Self {
            fs,
            path,
            stop,
            heartbeat: Some(heartbeat),
        }
    }

    /// Stops the heartbeat and deletes the lock file.
    pub fn release(mut self) -> Result<()> {
        self.stop_heartbeat();
        self.fs.unlink(&self.path)?;
        Ok(())
    }

    fn stop_heartbeat(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.heartbeat.take() {
            let _ = handle.join();
        }
    }
}

impl<F: FileSystem> Drop for Lock<F> {
    fn drop(&mut self) {
        self.stop_heartbeat();
        if let Err(err) = self.fs.unlink(&self.path) {
            tracing::warn!(path = %self.path, %err, "failed to remove lock file on drop");
        }
    }
}
