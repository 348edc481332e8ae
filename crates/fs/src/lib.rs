//! The filesystem capability (spec §6 "Filesystem capability").
//!
//! `urkel-store` is generic over [`FileSystem`] the same way the trie
//! engine is generic over `urkel-hash`'s `Hasher`, so the log store can
//! run against real segment files or an in-memory stand-in without any
//! conditional code in the store itself — mirroring the pack's own
//! `DataBackend` trait, which the teacher implements once for a
//! `MemoryBackend` and once for a RocksDB-backed store.

mod error;
mod memory;
mod stdfs;

pub use error::{Errno, FsError, Result};
pub use memory::MemoryFs;
pub use stdfs::StdFs;

/// File metadata as returned by `stat`/`fstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    /// Size in bytes.
    pub len: u64,
    /// `true` if the path names a directory.
    pub is_dir: bool,
    /// Last-modified time, milliseconds since the Unix epoch.
    ///
    /// Used by `urkel-lock` to detect a stale or clock-skewed heartbeat
    /// file (spec §4.4); the core store never reads this field.
    pub mtime_ms: u64,
}

/// A filesystem capability: open/stat/rename/unlink/mkdir/readdir plus
/// positioned reads and writes on open files (spec §6).
pub trait FileSystem: Clone + Send + Sync + 'static {
    /// A handle to an open file.
    type File: OpenFile;

    /// Opens `path`, creating it (and, if `create` is set, any missing
    /// parent components are NOT created — callers must `mkdir` first)
    /// when it doesn't exist.
    fn open(&self, path: &str, create: bool) -> Result<Self::File>;

    /// Returns metadata for `path` without opening it.
    fn stat(&self, path: &str) -> Result<Metadata>;

    /// Renames `from` to `to`, replacing `to` if it exists.
    fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Removes the file at `path`.
    fn unlink(&self, path: &str) -> Result<()>;

    /// Creates the directory at `path`.
    fn mkdir(&self, path: &str) -> Result<()>;

    /// Lists entry names directly under `path`.
    fn readdir(&self, path: &str) -> Result<Vec<String>>;
}

/// A handle to an open file: positioned read/write, fsync, truncate, and
/// metadata (spec §6). All methods take `&self` since a store shares one
/// handle between its writer and its readers (spec §5 "one writer buffer
/// and one active segment fd per store; many reader fds may be open
/// concurrently").
pub trait OpenFile: Send + Sync {
    /// Reads into `buf` starting at `pos`, returning the number of bytes read.
    fn read_at(&self, buf: &mut [u8], pos: u64) -> Result<usize>;

    /// Writes `buf` at `pos`, returning the number of bytes written.
    fn write_at(&self, buf: &[u8], pos: u64) -> Result<usize>;

    /// Flushes any OS buffering to stable storage.
    fn fsync(&self) -> Result<()>;

    /// Returns the current file length.
    fn len(&self) -> Result<u64>;

    /// `true` if the file is currently empty.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Truncates (or extends with zeros) the file to `len` bytes.
    fn set_len(&self, len: u64) -> Result<()>;

    /// Bumps the file's modification time to now, writing a sentinel byte
    /// if the file is empty so the underlying OS has something to stamp.
    ///
    /// This is the heartbeat primitive of `urkel-lock` (spec §4.4
    /// "truncates (touches) the file on a fixed interval").
    fn touch(&self) -> Result<()> {
        self.write_at(&[0u8], 0).map(|_| ())
    }
}
