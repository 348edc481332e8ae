//! The meta root record (spec §4.2.1, §6 "Meta record").
//!
//! ```text
//! magic  : 4 bytes  = 0x6D 0x65 0x74 0x61 ("meta")
//! state  : u16      (reserved, 0)
//! size   : u16      = 0x0040
//! rootPtr: 7 bytes
//! padding: zeroed, out to byte 60
//! crc32c : 4 bytes  over [state..padding]
//! ```
//!
//! This is the only self-describing record in a segment: recovery finds
//! it by its magic tag, not by a length prefix, since nodes and values
//! carry no length of their own (spec §4.2.1 "Records are not
//! self-describing except for the meta record").

use urkel_types::{EncodingError, Error, NodePointer, Result};

/// Total on-disk size of a meta record.
pub const META_RECORD_LEN: usize = 64;

const MAGIC: [u8; 4] = *b"meta";
const SIZE_FIELD: u16 = META_RECORD_LEN as u16;
const CRC_SPAN_START: usize = 4;
const CRC_SPAN_END: usize = META_RECORD_LEN - 4;

/// A decoded meta root record: the canonical tree state at one commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaRecord {
    /// The root pointer in effect as of this commit. `None` denotes the empty tree (NIL root).
    pub root_ptr: Option<NodePointer>,
}

impl MetaRecord {
    /// Encodes the record into its fixed 64-byte wire form, including the trailing CRC.
    pub fn encode(&self) -> Result<[u8; META_RECORD_LEN]> {
        let mut out = [0u8; META_RECORD_LEN];
        out[0..4].copy_from_slice(&MAGIC);
        out[4..6].copy_from_slice(&0u16.to_be_bytes()); // state, reserved
        out[6..8].copy_from_slice(&SIZE_FIELD.to_be_bytes());

        let packed = match self.root_ptr {
            Some(ptr) => ptr.pack()?,
            None => NodePointer::NIL.pack()?,
        };
        out[8..15].copy_from_slice(&packed);
        // out[15..60] stays zeroed padding.

        let crc = crc32c::crc32c(&out[CRC_SPAN_START..CRC_SPAN_END]);
        out[60..64].copy_from_slice(&crc.to_be_bytes());

        Ok(out)
    }

    /// Decodes and validates a meta record from an exactly-64-byte slice.
    ///
    /// Checks the magic tag, the declared size field, and the CRC; does
    /// not itself validate that the root pointer lies within an earlier
    /// segment (the store does that, since it needs the active segment
    /// index to judge "earlier").
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != META_RECORD_LEN {
            return Err(encoding_error(0, "meta record has the wrong length"));
        }

        if bytes[0..4] != MAGIC {
            return Err(encoding_error(0, "meta record magic mismatch"));
        }

        let size = u16::from_be_bytes([bytes[6], bytes[7]]);
        if size != SIZE_FIELD {
            return Err(encoding_error(6, "meta record size field mismatch"));
        }

        let expected_crc = u32::from_be_bytes([bytes[60], bytes[61], bytes[62], bytes[63]]);
        let actual_crc = crc32c::crc32c(&bytes[CRC_SPAN_START..CRC_SPAN_END]);
        if expected_crc != actual_crc {
            return Err(encoding_error(60, "meta record crc mismatch"));
        }

        let mut ptr_bytes = [0u8; 7];
        ptr_bytes.copy_from_slice(&bytes[8..15]);
        let ptr = NodePointer::unpack(&ptr_bytes)?;

        let root_ptr = if ptr.is_nil() { None } else { Some(ptr) };

        Ok(Self { root_ptr })
    }
}

fn encoding_error(offset: u64, reason: &'static str) -> Error {
    Error::from(EncodingError::new(offset, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use urkel_types::NodeTag;

    #[test]
    fn round_trips_nil_root() {
        let meta = MetaRecord { root_ptr: None };
        let bytes = meta.encode().unwrap();
        assert_eq!(MetaRecord::decode(&bytes).unwrap(), meta);
    }

    #[test]
    fn round_trips_real_root() {
        let ptr = NodePointer {
            segment: 3,
            offset: 128,
            size: 64,
            tag: NodeTag::Internal,
        };
        let meta = MetaRecord { root_ptr: Some(ptr) };
        let bytes = meta.encode().unwrap();
        assert_eq!(bytes.len(), META_RECORD_LEN);
        assert_eq!(MetaRecord::decode(&bytes).unwrap(), meta);
    }

    #[test]
    fn rejects_bad_magic() {
        let meta = MetaRecord { root_ptr: None };
        let mut bytes = meta.encode().unwrap();
        bytes[0] = b'x';
        assert!(MetaRecord::decode(&bytes).is_err());
    }

    #[test]
    fn rejects_corrupted_crc() {
        let meta = MetaRecord { root_ptr: None };
        let mut bytes = meta.encode().unwrap();
        bytes[20] ^= 0xFF;
        assert!(MetaRecord::decode(&bytes).is_err());
    }
}
