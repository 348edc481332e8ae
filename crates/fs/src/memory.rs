use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use hashbrown::{HashMap, HashSet};
use parking_lot::Mutex;

use crate::error::FsError;
use crate::{FileSystem, Metadata, OpenFile, Result};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug)]
struct MemoryInode {
    data: Mutex<Vec<u8>>,
    mtime_ms: AtomicU64,
}

impl MemoryInode {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            data: Mutex::new(Vec::new()),
            mtime_ms: AtomicU64::new(now_ms()),
        })
    }
}

#[derive(Debug, Default)]
struct Inner {
    files: HashMap<String, Arc<MemoryInode>>,
    dirs: HashSet<String>,
}

/// An in-memory filesystem capability, interchangeable with [`StdFs`](crate::StdFs).
///
/// Grounded on the pack's own `MemoryBackend` (`Arc<Mutex<HashMap<..>>>`),
/// generalised from a flat key-value map to a tiny path/directory model so
/// the log store's segment layout (`<prefix>/0000000001`, ...) has
/// somewhere to live without touching real disk — used throughout the
/// test suite for fast, deterministic crash-recovery scenarios.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryFs {
    /// Creates a new, empty in-memory filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    fn not_found(syscall: &'static str) -> FsError {
        FsError::new(syscall, io::Error::from(io::ErrorKind::NotFound))
    }

    fn already_exists(syscall: &'static str) -> FsError {
        FsError::new(syscall, io::Error::from(io::ErrorKind::AlreadyExists))
    }

    fn parent(path: &str) -> &str {
        match path.rfind('/') {
            Some(i) => &path[..i],
            None => "",
        }
    }
}

impl FileSystem for MemoryFs {
    type File = MemoryFile;

    fn open(&self, path: &str, create: bool) -> Result<Self::File> {
        let mut inner = self.inner.lock();

        if let Some(data) = inner.files.get(path) {
            return Ok(MemoryFile(data.clone()));
        }

        if !create {
            return Err(Self::not_found("open"));
        }

        let inode = MemoryInode::new();
        inner.files.insert(path.to_string(), inode.clone());

        Ok(MemoryFile(inode))
    }

    fn stat(&self, path: &str) -> Result<Metadata> {
        let inner = self.inner.lock();

        if let Some(inode) = inner.files.get(path) {
            return Ok(Metadata {
                len: inode.data.lock().len() as u64,
                is_dir: false,
                mtime_ms: inode.mtime_ms.load(Ordering::SeqCst),
            });
        }

        if inner.dirs.contains(path) {
            return Ok(Metadata {
                len: 0,
                is_dir: true,
                mtime_ms: 0,
            });
        }

        Err(Self::not_found("stat"))
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut inner = self.inner.lock();

        if let Some(data) = inner.files.remove(from) {
            inner.files.insert(to.to_string(), data);
            return Ok(());
        }

        if inner.dirs.remove(from) {
            let prefix = format!("{from}/");
            let moved: Vec<String> = inner
                .files
                .keys()
                .filter(|k| k.starts_with(&prefix))
                .cloned()
                .collect();

            for key in moved {
                if let Some(data) = inner.files.remove(&key) {
                    let suffix = &key[prefix.len()..];
                    inner.files.insert(format!("{to}/{suffix}"), data);
                }
            }

            inner.dirs.insert(to.to_string());
            return Ok(());
        }

        Err(Self::not_found("rename"))
    }

    fn unlink(&self, path: &str) -> Result<()> {
        let mut inner = self.inner.lock();

        if inner.files.remove(path).is_some() {
            return Ok(());
        }

        if inner.dirs.remove(path) {
            let prefix = format!("{path}/");
            inner.files.retain(|k, _| !k.starts_with(&prefix));
            return Ok(());
        }

        Err(Self::not_found("unlink"))
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        let mut inner = self.inner.lock();

        if inner.dirs.contains(path) {
            return Ok(());
        }

        if inner.files.contains_key(path) {
            return Err(Self::already_exists("mkdir"));
        }

        inner.dirs.insert(path.to_string());

        Ok(())
    }

    fn readdir(&self, path: &str) -> Result<Vec<String>> {
        let inner = self.inner.lock();
        let prefix = format!("{path}/");
        let mut names: Vec<String> = inner
            .files
            .keys()
            .filter(|k| k.starts_with(&prefix) && Self::parent(k) == path)
            .map(|k| k[prefix.len()..].to_string())
            .collect();

        names.sort();

        Ok(names)
    }
}

/// An open in-memory file handle, backed by a shared, reference-counted inode.
#[derive(Debug, Clone)]
pub struct MemoryFile(Arc<MemoryInode>);

impl OpenFile for MemoryFile {
    fn read_at(&self, buf: &mut [u8], pos: u64) -> Result<usize> {
        let data = self.0.data.lock();
        let pos = pos as usize;

        if pos >= data.len() {
            return Ok(0);
        }

        let n = buf.len().min(data.len() - pos);
        buf[..n].copy_from_slice(&data[pos..pos + n]);

        Ok(n)
    }

    fn write_at(&self, buf: &[u8], pos: u64) -> Result<usize> {
        let mut data = self.0.data.lock();
        let pos = pos as usize;
        let end = pos + buf.len();

        if data.len() < end {
            data.resize(end, 0);
        }

        data[pos..end].copy_from_slice(buf);
        self.0.mtime_ms.store(now_ms(), Ordering::SeqCst);

        Ok(buf.len())
    }

    fn fsync(&self) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> Result<u64> {
        Ok(self.0.data.lock().len() as u64)
    }

    fn set_len(&self, len: u64) -> Result<()> {
        self.0.data.lock().resize(len as usize, 0);
        self.0.mtime_ms.store(now_ms(), Ordering::SeqCst);
        Ok(())
    }

    fn touch(&self) -> Result<()> {
        if self.0.data.lock().is_empty() {
            self.0.data.lock().push(0);
        }
        self.0.mtime_ms.store(now_ms(), Ordering::SeqCst);
        Ok(())
    }
}

impl MemoryFile {
    /// Test-only seam: stamps an arbitrary mtime, bypassing the real clock.
    /// Used to exercise clock-skew handling that can't be forced through
    /// the real filesystem clock in `write_at`/`touch`/`set_len`.
    pub fn set_mtime_for_test(&self, mtime_ms: u64) {
        self.0.mtime_ms.store(mtime_ms, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_create_and_read_write() {
        let fs = MemoryFs::new();

        assert!(fs.open("/a", false).is_err());

        let f = fs.open("/a", true).unwrap();
        f.write_at(b"hello", 0).unwrap();

        let f2 = fs.open("/a", false).unwrap();
        let mut buf = [0u8; 5];
        f2.read_at(&mut buf, 0).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn mkdir_readdir_rename_unlink() {
        let fs = MemoryFs::new();

        fs.mkdir("/store").unwrap();
        fs.open("/store/0000000001", true).unwrap();
        fs.open("/store/0000000002", true).unwrap();

        let names = fs.readdir("/store").unwrap();
        assert_eq!(names, vec!["0000000001", "0000000002"]);

        fs.rename("/store", "/store2").unwrap();
        assert!(fs.readdir("/store").unwrap().is_empty());
        assert_eq!(fs.readdir("/store2").unwrap().len(), 2);

        fs.unlink("/store2").unwrap();
        assert!(fs.stat("/store2").is_err());
    }
}
