//! The append-only log store (spec §4.2): segment files, the writer
//! buffer, meta root records, crash recovery, and the filesystem side of
//! compaction. The trie engine in `urkel-tree` is the only consumer —
//! this crate has no notion of keys, values as a domain concept, or
//! node shapes, only bytes and pointers, mirroring the separation the
//! pack draws between its `Smt` algorithm crate and its storage-backend
//! crates (`valence-coprocessor-rocksdb`, the in-memory `MemoryBackend`).

mod meta;
mod segment;
mod store;
mod writer;

pub use meta::{MetaRecord, META_RECORD_LEN};
pub use segment::{parse_segment_name, segment_path};
pub use store::{compaction_prefix, swap_into_place, Store, StoreStats};
