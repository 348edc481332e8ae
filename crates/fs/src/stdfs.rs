use std::fs::{self, OpenOptions};
use std::os::unix::fs::FileExt;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use crate::error::FsError;
use crate::{FileSystem, Metadata, OpenFile, Result};

/// A filesystem capability backed by the real operating system.
#[derive(Debug, Clone, Default)]
pub struct StdFs;

impl StdFs {
    /// Creates a new real-disk filesystem capability.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for StdFs {
    type File = StdFile;

    fn open(&self, path: &str, create: bool) -> Result<Self::File> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(create)
            .open(path)
            .map_err(|e| FsError::new("open", e))?;

        Ok(StdFile(Arc::new(file)))
    }

    fn stat(&self, path: &str) -> Result<Metadata> {
        let meta = fs::metadata(path).map_err(|e| FsError::new("stat", e))?;
        let mtime_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Ok(Metadata {
            len: meta.len(),
            is_dir: meta.is_dir(),
            mtime_ms,
        })
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        fs::rename(from, to).map_err(|e| FsError::new("rename", e))
    }

    fn unlink(&self, path: &str) -> Result<()> {
        let meta = fs::metadata(path).map_err(|e| FsError::new("unlink", e))?;

        if meta.is_dir() {
            fs::remove_dir_all(path).map_err(|e| FsError::new("unlink", e))
        } else {
            fs::remove_file(path).map_err(|e| FsError::new("unlink", e))
        }
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| FsError::new("mkdir", e))
    }

    fn readdir(&self, path: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in fs::read_dir(path).map_err(|e| FsError::new("readdir", e))? {
            let entry = entry.map_err(|e| FsError::new("readdir", e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        names.sort();

        Ok(names)
    }
}

/// An open file handle backed by the real operating system.
///
/// Wrapped in an `Arc` so a store can share one handle between its writer
/// and any number of concurrent readers, using positioned I/O
/// (`pread`/`pwrite` via [`FileExt`]) instead of a shared seek cursor.
#[derive(Debug, Clone)]
pub struct StdFile(Arc<std::fs::File>);

impl OpenFile for StdFile {
    fn read_at(&self, buf: &mut [u8], pos: u64) -> Result<usize> {
        self.0
            .read_at(buf, pos)
            .map_err(|e| FsError::new("read", e))
    }

    fn write_at(&self, buf: &[u8], pos: u64) -> Result<usize> {
        self.0
            .write_at(buf, pos)
            .map_err(|e| FsError::new("write", e))
    }

    fn fsync(&self) -> Result<()> {
        self.0.sync_all().map_err(|e| FsError::new("fsync", e))
    }

    fn len(&self) -> Result<u64> {
        self.0
            .metadata()
            .map(|m| m.len())
            .map_err(|e| FsError::new("fstat", e))
    }

    fn set_len(&self, len: u64) -> Result<()> {
        self.0.set_len(len).map_err(|e| FsError::new("ftruncate", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_positioned_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segment");
        let fs = StdFs::new();

        let file = fs.open(path.to_str().unwrap(), true).unwrap();

        file.write_at(b"hello", 0).unwrap();
        file.write_at(b"world", 5).unwrap();
        file.fsync().unwrap();

        assert_eq!(file.len().unwrap(), 10);

        let mut buf = [0u8; 10];
        file.read_at(&mut buf, 0).unwrap();
        assert_eq!(&buf, b"helloworld");
    }

    #[test]
    fn stat_rename_unlink() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let fs = StdFs::new();

        fs.open(a.to_str().unwrap(), true).unwrap();
        assert_eq!(fs.stat(a.to_str().unwrap()).unwrap().len, 0);

        fs.rename(a.to_str().unwrap(), b.to_str().unwrap()).unwrap();
        assert!(fs.stat(a.to_str().unwrap()).is_err());

        fs.unlink(b.to_str().unwrap()).unwrap();
        assert!(fs.stat(b.to_str().unwrap()).is_err());
    }

    #[test]
    fn readdir_lists_segments() {
        let dir = tempfile::tempdir().unwrap();
        let fs = StdFs::new();

        fs.open(dir.path().join("0000000001").to_str().unwrap(), true)
            .unwrap();
        fs.open(dir.path().join("0000000002").to_str().unwrap(), true)
            .unwrap();

        let names = fs.readdir(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(names, vec!["0000000001", "0000000002"]);
    }
}
