//! The writer buffer of a single segment (spec §4.2.2).
//!
//! Encoded records accumulate in memory until a flush threshold is hit
//! or a meta root is appended; flush pushes the buffer to the segment
//! file. Reads for positions already pushed go straight to the file;
//! reads for the still-buffered tail are served from memory, sharing the
//! same length counter a reader would otherwise have to reconstruct from
//! `fstat` (spec §5 "the writer and reader of the same segment share a
//! length counter").

use urkel_fs::OpenFile;
use urkel_types::{Error, IoError, Result};

/// Appends bytes to one open segment file, buffering until flushed.
pub struct SegmentWriter<T: OpenFile> {
    file: T,
    index: u16,
    /// Bytes already durably written to `file` (at offset 0..on_disk_len).
    on_disk_len: u64,
    /// Bytes appended since the last flush, not yet written to `file`.
    buffer: Vec<u8>,
}

impl<T: OpenFile> SegmentWriter<T> {
    /// Wraps an already-open segment file whose current durable length is `on_disk_len`.
    pub fn new(file: T, index: u16, on_disk_len: u64) -> Self {
        Self {
            file,
            index,
            on_disk_len,
            buffer: Vec::new(),
        }
    }

    /// This writer's segment index.
    pub fn index(&self) -> u16 {
        self.index
    }

    /// Total length, durable plus buffered.
    pub fn len(&self) -> u64 {
        self.on_disk_len + self.buffer.len() as u64
    }

    /// `true` if nothing has ever been written to this segment.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends `bytes`, returning the offset they were written at. Does
    /// not itself flush to disk.
    pub fn append(&mut self, bytes: &[u8]) -> u64 {
        let offset = self.len();
        self.buffer.extend_from_slice(bytes);
        offset
    }

    /// Pushes any buffered bytes to the segment file.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let n = self
            .file
            .write_at(&self.buffer, self.on_disk_len)
            .map_err(|e| io_err("write", self.index, self.on_disk_len, self.buffer.len(), e))?;

        if n != self.buffer.len() {
            return Err(io_err(
                "write",
                self.index,
                self.on_disk_len,
                self.buffer.len(),
                std::io::Error::new(std::io::ErrorKind::Other, format!("short write: wrote {n} of {} bytes", self.buffer.len())),
            ));
        }

        self.on_disk_len += self.buffer.len() as u64;
        self.buffer.clear();

        Ok(())
    }

    /// Flushes, then fsyncs the segment file (spec §4.2.2 "on meta append, calls fsync").
    pub fn flush_and_sync(&mut self) -> Result<()> {
        self.flush()?;
        self.file
            .fsync()
            .map_err(|e| io_err("fsync", self.index, self.on_disk_len, 0, e))
    }

    /// Reads `len` bytes starting at `pos`, serving from the durable file
    /// or the in-memory tail as appropriate. A read may not span both.
    pub fn read_at(&self, pos: u64, len: usize) -> Result<Vec<u8>> {
        let end = pos + len as u64;

        if end <= self.on_disk_len {
            let mut buf = vec![0u8; len];
            let n = self
                .file
                .read_at(&mut buf, pos)
                .map_err(|e| io_err("read", self.index, pos, len, e))?;

            if n != len {
                return Err(io_err(
                    "read",
                    self.index,
                    pos,
                    len,
                    std::io::Error::new(std::io::ErrorKind::Other, format!("short read: got {n} of {len} bytes")),
                ));
            }

            Ok(buf)
        } else if pos >= self.on_disk_len {
            let start = (pos - self.on_disk_len) as usize;
            self.buffer
                .get(start..start + len)
                .map(|s| s.to_vec())
                .ok_or_else(|| {
                    io_err(
                        "read",
                        self.index,
                        pos,
                        len,
                        std::io::Error::new(std::io::ErrorKind::Other, "read past buffered tail"),
                    )
                })
        } else {
            Err(io_err(
                "read",
                self.index,
                pos,
                len,
                std::io::Error::new(std::io::ErrorKind::Other, "read spans the durable/buffered boundary"),
            ))
        }
    }
}

fn io_err(syscall: &'static str, segment: u16, pos: u64, size: usize, source: std::io::Error) -> Error {
    Error::from(IoError::in_segment(syscall, segment as u32, pos, size, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use urkel_fs::{FileSystem, MemoryFs};

    #[test]
    fn buffered_reads_before_flush() {
        let fs = MemoryFs::new();
        let file = fs.open("/seg", true).unwrap();
        let mut writer = SegmentWriter::new(file, 1, 0);

        let off = writer.append(b"hello");
        assert_eq!(off, 0);
        assert_eq!(writer.read_at(0, 5).unwrap(), b"hello");

        writer.flush().unwrap();
        assert_eq!(writer.read_at(0, 5).unwrap(), b"hello");
    }

    #[test]
    fn sequential_appends_track_offsets() {
        let fs = MemoryFs::new();
        let file = fs.open("/seg", true).unwrap();
        let mut writer = SegmentWriter::new(file, 1, 0);

        let a = writer.append(b"abc");
        let b = writer.append(b"de");
        assert_eq!(a, 0);
        assert_eq!(b, 3);
        assert_eq!(writer.len(), 5);
    }
}
