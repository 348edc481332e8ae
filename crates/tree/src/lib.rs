//! `urkel`: a base-2 sparse Merkle trie over an append-only log store
//! (spec §3–§4). This crate owns the node model, the mutation and proof
//! algorithms, the root cache, and the snapshot/transaction API; the
//! underlying segment log lives in `urkel-store`, digests and wire
//! encodings in `urkel-hash`/`urkel-types`, and the mutator lock file in
//! `urkel-lock`.
//!
//! ```ignore
//! use urkel::{Options, Tree};
//! use urkel_hash::Blake3;
//! use urkel_fs::MemoryFs;
//!
//! let tree = Tree::<Blake3, _>::open(MemoryFs::new(), Options { bits: 256, ..Default::default() })?;
//! let mut tx = tree.transaction()?;
//! tx.insert(b"key-padded-to-32-bytes..........", b"value".to_vec())?;
//! tx.commit()?;
//! # Ok::<(), urkel::Error>(())
//! ```

mod cache;
mod commit;
mod compact;
mod engine;
mod error;
mod iter;
mod node;
mod options;
mod resolver;
mod snapshot;
mod transaction;
mod tree;

pub use cache::RootCache;
pub use compact::compact;
pub use error::{Error, Result};
pub use iter::Iter;
pub use node::Node;
pub use options::{Options, DEFAULT_MAX_SEGMENT_SIZE};
pub use snapshot::Snapshot;
pub use transaction::Transaction;
pub use tree::Tree;

pub use urkel_hash::{Blake3, Hasher, Sha256, Sha256Truncated};
pub use urkel_proof::{Proof, ProofKind};
pub use urkel_types::{Digest, ProofError};
