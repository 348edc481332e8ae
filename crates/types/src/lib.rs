//! Shared digest, pointer and error types for the Urkel tree store.
//!
//! These types have no opinion about hashing or I/O; they exist so that
//! `urkel-hash`, `urkel-fs`, `urkel-store`, `urkel-proof` and `urkel-tree`
//! can agree on the wire shapes without depending on each other.

mod digest;
mod error;
mod pointer;

pub use digest::{bit_at, depth_to_index, Digest};
pub use error::{assertion_failed, EncodingError, Error, IoError, MissingNode, ProofError, Result};
pub use pointer::{NodePointer, NodeTag, ValuePointer};

/// The maximum length of a stored value, spec §3.1.
pub const MAX_VALUE_LEN: usize = u16::MAX as usize;
