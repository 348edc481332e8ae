//! The error taxonomy of spec. §7.
//!
//! Shaped after the pack's own `jellyfish-merkle` node-decode error: a
//! `thiserror` enum whose variants carry the fields a caller needs to act
//! on programmatically, rather than an opaque string.

use crate::digest::Digest;

/// The crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// A pointer referred to data that cannot be read: a corrupt or
/// unrecognised root. Fatal to the current operation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("missing node: root={root_hash} node={node_hash} key={key} depth={depth}")]
pub struct MissingNode {
    /// The root the lookup started from.
    pub root_hash: Digest,
    /// The unresolved node's digest.
    pub node_hash: Digest,
    /// The key being looked up.
    pub key: Digest,
    /// The depth at which resolution failed.
    pub depth: usize,
}

/// A filesystem call returned the wrong byte count or an unexpected errno.
/// Fatal to the current operation.
#[derive(Debug, thiserror::Error)]
#[error("io error during {syscall}: segment={segment_index:?} pos={pos} size={size}: {source}")]
pub struct IoError {
    /// The syscall that failed (`"read"`, `"write"`, `"fsync"`, ...).
    pub syscall: &'static str,
    /// The segment file involved, if any.
    pub segment_index: Option<u32>,
    /// The position the call was attempted at.
    pub pos: u64,
    /// The size requested.
    pub size: usize,
    /// The underlying OS error.
    #[source]
    pub source: std::io::Error,
}

impl IoError {
    /// Builds an [`IoError`] not tied to a specific segment (e.g. lock file I/O).
    pub fn new(syscall: &'static str, pos: u64, size: usize, source: std::io::Error) -> Self {
        Self {
            syscall,
            segment_index: None,
            pos,
            size,
            source,
        }
    }

    /// Builds an [`IoError`] tied to a segment file.
    pub fn in_segment(
        syscall: &'static str,
        segment_index: u32,
        pos: u64,
        size: usize,
        source: std::io::Error,
    ) -> Self {
        Self {
            syscall,
            segment_index: Some(segment_index),
            pos,
            size,
            source,
        }
    }
}

/// Malformed on-disk or on-wire bytes.
///
/// During recovery this triggers truncation of the torn tail; during
/// proof decoding it surfaces to the caller.
#[derive(Debug, Clone, thiserror::Error)]
#[error("encoding error at offset {offset}: {reason}")]
pub struct EncodingError {
    /// The byte offset at which decoding failed.
    pub offset: u64,
    /// A human-readable reason.
    pub reason: String,
}

impl EncodingError {
    /// Builds a new encoding error.
    pub fn new(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            offset,
            reason: reason.into(),
        }
    }
}

/// The crate-wide error type: the union of the fatal taxonomy members of
/// spec. §7. `AssertionError` is deliberately not a variant here — a
/// violated internal invariant is a bug, not a recoverable condition, and
/// is raised via [`assertion_failed`] instead, which never returns.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// See [`MissingNode`].
    #[error(transparent)]
    MissingNode(#[from] MissingNode),
    /// See [`IoError`].
    #[error(transparent)]
    Io(#[from] IoError),
    /// See [`EncodingError`].
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// The outcome of [`verify`](crate)-style proof verification.
///
/// Returned as a value, never raised — spec. §4.3/§7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofError {
    /// The proof folds to the claimed root and, for collision proofs, the witness key differs.
    Ok,
    /// The proof folds to a digest other than the claimed root.
    HashMismatch,
    /// A collision proof whose witness key equals the queried key (always invalid).
    SameKey,
    /// The proof's structure could not be interpreted.
    Unknown,
}

/// Logs and panics on a violated internal invariant (spec's `AssertionError`).
///
/// This is deliberately not a `Result` variant: the specification calls
/// these "always a bug; not catchable as part of normal flow", so callers
/// cannot be expected to recover from one — the equivalent of Rust's own
/// `unreachable!()`.
#[track_caller]
pub fn assertion_failed(msg: impl Into<String>) -> ! {
    let msg = msg.into();
    tracing::error!(%msg, "internal invariant violated");
    panic!("urkel: internal invariant violated: {msg}");
}
