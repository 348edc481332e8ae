//! The append-only log store (spec §4.2).
//!
//! A [`Store`] owns one writer buffer and one active segment file plus a
//! growing set of lazily-opened reader handles for sealed segments
//! (spec §5 "one writer buffer and one active segment fd per store; many
//! reader fds may be open concurrently"). It knows nothing about the
//! trie's node shapes — `urkel-tree` hands it raw encoded bytes and gets
//! pointers back, the same separation the pack draws between its `Smt`
//! algorithm and its `TreeBackend` trait.

use std::collections::HashMap;

use parking_lot::Mutex;
use rand::Rng;

use urkel_fs::{FileSystem, OpenFile};
use urkel_types::{Error, IoError, NodePointer, NodeTag, Result, ValuePointer};

use crate::meta::{MetaRecord, META_RECORD_LEN};
use crate::segment::{parse_segment_name, segment_path};
use crate::writer::SegmentWriter;

/// Live-segment count, total bytes, and the current meta root (spec.
/// §4.2 ambient addition: `Store::stats()`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of segment files currently open (sealed readers plus the active writer).
    pub live_segments: usize,
    /// Total bytes across all open segments, durable plus buffered.
    pub total_bytes: u64,
    /// The root pointer of the most recent commit, `None` for an empty tree.
    pub current_root_ptr: Option<NodePointer>,
}

struct StoreInner<F: FileSystem> {
    writer: SegmentWriter<F::File>,
    readers: HashMap<u16, F::File>,
    last_root: Option<NodePointer>,
}

/// The append-only segment log backing one tree instance.
pub struct Store<F: FileSystem> {
    fs: F,
    prefix: String,
    max_segment_size: u64,
    inner: Mutex<StoreInner<F>>,
}

impl<F: FileSystem> Store<F> {
    /// Opens (or creates) the store at `prefix`, recovering the most
    /// recent durable root (spec §4.2.3).
    ///
    /// Returns the store and the root pointer of the last fsynced meta
    /// record, or `None` for a fresh or fully-empty store.
    pub fn open(fs: F, prefix: &str, max_segment_size: u64) -> Result<(Self, Option<NodePointer>)> {
        if fs.stat(prefix).is_err() {
            fs.mkdir(prefix).map_err(|e| fs_err("mkdir", e))?;
        }

        let mut indices = Self::list_segment_indices(&fs, prefix)?;
        indices.sort_unstable();

        loop {
            let Some(&highest) = indices.last() else {
                return Self::open_fresh(fs, prefix, max_segment_size);
            };

            let path = segment_path(prefix, highest);
            let file = fs.open(&path, false).map_err(|e| fs_err("open", e))?;
            let len = file.len().map_err(|e| fs_err("fstat", e))?;

            match Self::recover_meta(&file, highest, len) {
                Some((offset, meta)) => {
                    let keep = offset + META_RECORD_LEN as u64;
                    if keep < len {
                        tracing::info!(segment = highest, from = len, to = keep, "truncating torn tail");
                        file.set_len(keep).map_err(|e| fs_err("ftruncate", e))?;
                    }

                    let writer = SegmentWriter::new(file, highest, keep);
                    let store = Self {
                        fs,
                        prefix: prefix.to_string(),
                        max_segment_size,
                        inner: Mutex::new(StoreInner {
                            writer,
                            readers: HashMap::new(),
                            last_root: meta.root_ptr,
                        }),
                    };

                    return Ok((store, meta.root_ptr));
                }
                None => {
                    tracing::warn!(segment = highest, "no valid meta record in segment, discarding it");
                    drop(file);
                    fs.unlink(&path).map_err(|e| fs_err("unlink", e))?;
                    indices.pop();
                }
            }
        }
    }

    fn open_fresh(fs: F, prefix: &str, max_segment_size: u64) -> Result<(Self, Option<NodePointer>)> {
        let path = segment_path(prefix, 1);
        let file = fs.open(&path, true).map_err(|e| fs_err("open", e))?;
        let writer = SegmentWriter::new(file, 1, 0);

        let store = Self {
            fs,
            prefix: prefix.to_string(),
            max_segment_size,
            inner: Mutex::new(StoreInner {
                writer,
                readers: HashMap::new(),
                last_root: None,
            }),
        };

        Ok((store, None))
    }

    fn list_segment_indices(fs: &F, prefix: &str) -> Result<Vec<u16>> {
        let names = fs.readdir(prefix).map_err(|e| fs_err("readdir", e))?;
        Ok(names.iter().filter_map(|n| parse_segment_name(n)).collect())
    }

    /// Scans `file` backward from its tail for a valid, plausible meta
    /// record (spec §4.2.3 "scans backward ... looking for the
    /// magic-tagged meta record"). A record is accepted once its CRC
    /// validates and its root pointer points at an earlier position than
    /// itself — guarding against the magic bytes appearing inside
    /// unrelated value or node data.
    fn recover_meta(file: &F::File, segment: u16, len: u64) -> Option<(u64, MetaRecord)> {
        if len < META_RECORD_LEN as u64 {
            return None;
        }

        let mut offset = len - META_RECORD_LEN as u64;

        loop {
            let mut buf = vec![0u8; META_RECORD_LEN];
            if file.read_at(&mut buf, offset).ok() == Some(META_RECORD_LEN) {
                if let Ok(meta) = MetaRecord::decode(&buf) {
                    if Self::root_ptr_precedes(meta.root_ptr, segment, offset) {
                        return Some((offset, meta));
                    }
                }
            }

            if offset == 0 {
                return None;
            }
            offset -= 1;
        }
    }

    fn root_ptr_precedes(ptr: Option<NodePointer>, segment: u16, meta_offset: u64) -> bool {
        match ptr {
            None => true,
            Some(p) if p.segment < segment => true,
            Some(p) if p.segment == segment => (p.offset as u64) + (p.size as u64) <= meta_offset,
            Some(_) => false,
        }
    }

    /// Appends a raw value payload, returning its pointer.
    pub fn append_value(&self, bytes: &[u8]) -> Result<ValuePointer> {
        let mut inner = self.inner.lock();
        self.ensure_capacity(&mut inner, bytes.len())?;

        let offset = inner.writer.append(bytes);

        Ok(ValuePointer {
            segment: inner.writer.index(),
            offset: offset as u32,
            size: bytes.len() as u16,
        })
    }

    /// Appends a raw internal or leaf record, returning its pointer.
    pub fn append_node(&self, bytes: &[u8], tag: NodeTag) -> Result<NodePointer> {
        let mut inner = self.inner.lock();
        self.ensure_capacity(&mut inner, bytes.len())?;

        let offset = inner.writer.append(bytes);
        let ptr = NodePointer {
            segment: inner.writer.index(),
            offset: offset as u32,
            size: bytes.len() as u16,
            tag,
        };
        // Validates the pointer's fields fit their packed bit widths before
        // it is handed back to the caller to embed in a parent record.
        ptr.pack()?;

        Ok(ptr)
    }

    /// Reads the raw bytes a [`NodePointer`] refers to.
    pub fn read_node(&self, ptr: NodePointer) -> Result<Vec<u8>> {
        self.read_segment(ptr.segment, ptr.offset, ptr.size as usize)
    }

    /// Reads the raw bytes a [`ValuePointer`] refers to.
    pub fn read_value(&self, ptr: ValuePointer) -> Result<Vec<u8>> {
        self.read_segment(ptr.segment, ptr.offset, ptr.size as usize)
    }

    fn read_segment(&self, segment: u16, offset: u32, size: usize) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();

        if segment == inner.writer.index() {
            return inner.writer.read_at(offset as u64, size);
        }

        if let Some(file) = inner.readers.get(&segment) {
            return read_whole(file, segment, offset as u64, size);
        }

        let path = segment_path(&self.prefix, segment);
        let file = self.fs.open(&path, false).map_err(|e| fs_err("open", e))?;
        let bytes = read_whole(&file, segment, offset as u64, size)?;
        inner.readers.insert(segment, file);

        Ok(bytes)
    }

    /// Appends a meta root record for `root_ptr` and fsyncs it (spec §4.1.4 step 5).
    pub fn commit_meta(&self, root_ptr: Option<NodePointer>) -> Result<()> {
        let meta = MetaRecord { root_ptr };
        let bytes = meta.encode()?;

        let mut inner = self.inner.lock();
        self.ensure_capacity(&mut inner, bytes.len())?;
        inner.writer.append(&bytes);
        inner.writer.flush_and_sync()?;
        inner.last_root = root_ptr;

        Ok(())
    }

    /// Seals the active segment and opens the next one if `additional`
    /// more bytes would exceed `max_segment_size` (spec §4.2.1 "A segment
    /// is sealed when its size would exceed `max_segment_size` on the
    /// next write").
    fn ensure_capacity(&self, inner: &mut StoreInner<F>, additional: usize) -> Result<()> {
        if inner.writer.len() + additional as u64 <= self.max_segment_size {
            return Ok(());
        }

        inner.writer.flush()?;

        let next_index = inner.writer.index() + 1;
        let path = segment_path(&self.prefix, next_index);
        let file = self.fs.open(&path, true).map_err(|e| fs_err("open", e))?;
        let new_writer = SegmentWriter::new(file, next_index, 0);
        let old_writer = std::mem::replace(&mut inner.writer, new_writer);
        let old_index = old_writer.index();

        inner.readers.insert(old_index, old_writer.into_file());
        tracing::info!(sealed = old_index, next = next_index, "segment sealed");

        Ok(())
    }

    fn segment_len(&self, segment: u16) -> Result<Option<u64>> {
        let mut inner = self.inner.lock();

        if segment == inner.writer.index() {
            return Ok(Some(inner.writer.len()));
        }
        if let Some(file) = inner.readers.get(&segment) {
            return Ok(Some(file.len().map_err(|e| fs_err("fstat", e))?));
        }

        let path = segment_path(&self.prefix, segment);
        match self.fs.open(&path, false) {
            Ok(file) => {
                let len = file.len().map_err(|e| fs_err("fstat", e))?;
                inner.readers.insert(segment, file);
                Ok(Some(len))
            }
            Err(_) => Ok(None),
        }
    }

    /// Walks backward across segments collecting historical root pointers,
    /// newest first, for the root cache's startup backfill (spec §4.2.5
    /// `init_cache_size`). `limit = None` walks every segment down to 1.
    pub fn historical_roots(&self, limit: Option<usize>) -> Result<Vec<Option<NodePointer>>> {
        let mut out = Vec::new();
        let mut segment = {
            let inner = self.inner.lock();
            inner.writer.index()
        };

        loop {
            let Some(len) = self.segment_len(segment)? else {
                break;
            };

            if len >= META_RECORD_LEN as u64 {
                let mut offset = len - META_RECORD_LEN as u64;
                loop {
                    if let Ok(bytes) = self.read_segment(segment, offset as u32, META_RECORD_LEN) {
                        if let Ok(meta) = MetaRecord::decode(&bytes) {
                            if Self::root_ptr_precedes(meta.root_ptr, segment, offset) {
                                out.push(meta.root_ptr);
                                if limit.is_some_and(|l| out.len() >= l) {
                                    return Ok(out);
                                }
                            }
                        }
                    }

                    if offset == 0 {
                        break;
                    }
                    offset -= 1;
                }
            }

            if segment == 1 {
                break;
            }
            segment -= 1;
        }

        Ok(out)
    }

    /// Live segment count, total bytes, and the current meta root.
    pub fn stats(&self) -> Result<StoreStats> {
        let inner = self.inner.lock();
        let mut total_bytes = inner.writer.len();

        for file in inner.readers.values() {
            total_bytes += file.len().map_err(|e| fs_err("fstat", e))?;
        }

        Ok(StoreStats {
            live_segments: inner.readers.len() + 1,
            total_bytes,
            current_root_ptr: inner.last_root,
        })
    }

    /// The directory this store's segments live under.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The filesystem capability this store was opened with.
    pub fn fs(&self) -> &F {
        &self.fs
    }
}

fn read_whole<T: OpenFile>(file: &T, segment: u16, pos: u64, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    let n = file
        .read_at(&mut buf, pos)
        .map_err(|e| Error::from(IoError::in_segment("read", segment as u32, pos, len, io_of(e))))?;

    if n != len {
        return Err(Error::from(IoError::in_segment(
            "read",
            segment as u32,
            pos,
            len,
            std::io::Error::new(std::io::ErrorKind::Other, format!("short read: got {n} of {len} bytes")),
        )));
    }

    Ok(buf)
}

fn io_of(e: urkel_fs::FsError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}

fn fs_err(syscall: &'static str, e: urkel_fs::FsError) -> Error {
    Error::from(IoError::new(syscall, 0, 0, io_of(e)))
}

/// Picks a sibling staging directory for compaction: the main prefix
/// plus a random suffix and a trailing marker (spec §4.2.4 step 1).
pub fn compaction_prefix(main_prefix: &str) -> String {
    let suffix: u64 = rand::rng().random();
    format!("{main_prefix}.compact-{suffix:016x}~")
}

/// Finalizes a compaction: removes the old segment directory and moves
/// the new one into place (spec §4.2.4 step 5). Must only be called once
/// the new prefix has a durable meta record of its own.
pub fn swap_into_place<F: FileSystem>(fs: &F, old_prefix: &str, new_prefix: &str) -> Result<()> {
    fs.unlink(old_prefix).map_err(|e| fs_err("unlink", e))?;
    fs.rename(new_prefix, old_prefix).map_err(|e| fs_err("rename", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use urkel_fs::{FileSystem, MemoryFs, OpenFile};
    use urkel_types::NodeTag;

    #[test]
    fn fresh_store_has_no_root() {
        let fs = MemoryFs::new();
        let (_store, root) = Store::open(fs, "/store", 4096).unwrap();
        assert_eq!(root, None);
    }

    #[test]
    fn append_and_read_value_round_trips() {
        let fs = MemoryFs::new();
        let (store, _) = Store::open(fs, "/store", 4096).unwrap();

        let ptr = store.append_value(b"hello world").unwrap();
        assert_eq!(store.read_value(ptr).unwrap(), b"hello world");
    }

    #[test]
    fn commit_and_reopen_recovers_root() {
        let fs = MemoryFs::new();
        let (store, _) = Store::open(fs.clone(), "/store", 4096).unwrap();

        let vptr = store.append_value(b"v").unwrap();
        let mut leaf_bytes = Vec::new();
        leaf_bytes.extend_from_slice(&vptr.pack());
        leaf_bytes.extend_from_slice(&[0xABu8; 20]);
        let nptr = store.append_node(&leaf_bytes, NodeTag::Leaf).unwrap();

        store.commit_meta(Some(nptr)).unwrap();
        drop(store);

        let (store2, root) = Store::open(fs, "/store", 4096).unwrap();
        assert_eq!(root, Some(nptr));
        assert_eq!(store2.read_node(nptr).unwrap(), leaf_bytes);
    }

    #[test]
    fn torn_tail_after_meta_is_truncated() {
        let fs = MemoryFs::new();
        let (store, _) = Store::open(fs.clone(), "/store", 4096).unwrap();

        let vptr = store.append_value(b"v").unwrap();
        let mut leaf_bytes = Vec::new();
        leaf_bytes.extend_from_slice(&vptr.pack());
        leaf_bytes.extend_from_slice(&[0xCDu8; 20]);
        let nptr = store.append_node(&leaf_bytes, NodeTag::Leaf).unwrap();
        store.commit_meta(Some(nptr)).unwrap();
        drop(store);

        // Simulate a crash mid-write of the next commit: bytes land on
        // disk after the last valid meta record, but no meta ever follows
        // them.
        let raw = fs.open("/store/0000000001", false).unwrap();
        let len = raw.len().unwrap();
        raw.write_at(b"torn-garbage-that-never-committed", len).unwrap();

        let (store2, root) = Store::open(fs, "/store", 4096).unwrap();
        assert_eq!(root, Some(nptr));
        assert_eq!(store2.read_node(nptr).unwrap(), leaf_bytes);
    }

    #[test]
    fn segment_rolls_over_past_max_size() {
        let fs = MemoryFs::new();
        let (store, _) = Store::open(fs, "/store", 32).unwrap();

        let p1 = store.append_value(&[1u8; 20]).unwrap();
        let p2 = store.append_value(&[2u8; 20]).unwrap();

        assert_eq!(p1.segment, 1);
        assert_eq!(p2.segment, 2);
        assert_eq!(store.read_value(p1).unwrap(), vec![1u8; 20]);
        assert_eq!(store.read_value(p2).unwrap(), vec![2u8; 20]);
    }

    #[test]
    fn historical_roots_walks_backward_newest_first() {
        let fs = MemoryFs::new();
        let (store, _) = Store::open(fs, "/store", 4096).unwrap();

        let mut roots = Vec::new();
        for i in 0..5u8 {
            let vptr = store.append_value(&[i; 4]).unwrap();
            let mut bytes = Vec::new();
            bytes.extend_from_slice(&vptr.pack());
            bytes.extend_from_slice(&[i; 20]);
            let ptr = store.append_node(&bytes, NodeTag::Leaf).unwrap();
            store.commit_meta(Some(ptr)).unwrap();
            roots.push(ptr);
        }

        let history = store.historical_roots(Some(3)).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0], Some(roots[4]));
        assert_eq!(history[1], Some(roots[3]));
        assert_eq!(history[2], Some(roots[2]));
    }

    #[test]
    fn stats_reports_root_and_segments() {
        let fs = MemoryFs::new();
        let (store, _) = Store::open(fs, "/store", 4096).unwrap();

        let vptr = store.append_value(b"v").unwrap();
        let mut leaf_bytes = Vec::new();
        leaf_bytes.extend_from_slice(&vptr.pack());
        leaf_bytes.extend_from_slice(&[0u8; 20]);
        let nptr = store.append_node(&leaf_bytes, NodeTag::Leaf).unwrap();
        store.commit_meta(Some(nptr)).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.live_segments, 1);
        assert_eq!(stats.current_root_ptr, Some(nptr));
        assert!(stats.total_bytes > 0);
    }
}
