//! The tree engine's error type: the union of `urkel-types`' taxonomy
//! (spec §7) with the filesystem and lock-acquisition failures that only
//! arise at the `Tree`/`Store` boundary.

use urkel_types::{Digest, EncodingError, MissingNode};

/// The crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// An error raised by the trie engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// See `urkel_types::Error`: `MissingNode`, `IoError`, `EncodingError`.
    #[error(transparent)]
    Core(#[from] urkel_types::Error),
    /// The mutator lock could not be acquired, or failed mid-heartbeat.
    #[error(transparent)]
    Lock(#[from] urkel_lock::Error),
    /// A raw filesystem call failed outside the store's own error taxonomy
    /// (e.g. `mkdir` while opening a fresh prefix).
    #[error(transparent)]
    Fs(#[from] urkel_fs::FsError),
    /// `Tree::transaction` was called while another transaction is still
    /// live (spec §4.4: one mutable transaction per tree at a time). A
    /// process-local contract violation, not malformed on-disk bytes.
    #[error("a transaction is already live on this tree")]
    TransactionActive,
}

pub(crate) fn encoding(offset: u64, reason: impl Into<String>) -> Error {
    Error::Core(EncodingError::new(offset, reason).into())
}

/// Builds a [`MissingNode`] error for a walk that ran past the tree's
/// configured key width (spec §4.1.1: "If depth reaches N on an Internal
/// ... raise `MissingNode`").
pub(crate) fn missing_node(root_hash: Digest, node_hash: Digest, key: &[u8], depth: usize) -> Error {
    MissingNode {
        root_hash,
        node_hash,
        key: Digest::new(key.to_vec()),
        depth,
    }
    .into()
}
