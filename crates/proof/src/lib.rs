//! The proof codec and verifier (spec §4.3).
//!
//! A [`Proof`] is the witness a remote verifier needs to check a single
//! key against a root hash: either the value at that key (`EXISTS`), a
//! `DEAD_END` witnessing that descent hit NIL before any leaf, or a
//! `COLLISION` witnessing that descent hit a different leaf. Encoding and
//! the verification fold are consensus-critical and are implemented
//! exactly as specified, not reinterpreted.

mod verify;
mod wire;

pub use verify::verify;
pub use wire::{decode, encode};

use urkel_types::Digest;

/// The witness carried by a [`Proof`] (spec §4.3 "type").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofKind {
    /// The key is present; carries the value inline.
    Exists(Vec<u8>),
    /// Descent hit NIL before any leaf: the key is absent.
    DeadEnd,
    /// Descent hit a leaf for a different key: the key is absent.
    Collision {
        /// The key actually stored at the position the queried key would occupy.
        other_key: Digest,
        /// `H(value)` of that other leaf (the value itself is never transmitted).
        other_value_digest: Digest,
    },
}

/// A proof of inclusion or exclusion for one key against one root.
///
/// Siblings are ordered shallowest to deepest, matching the wire format
/// (spec §4.3); `None` denotes a sibling equal to the zero sentinel,
/// which the bitmap marks instead of transmitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    /// Sibling digests, shallowest first; `None` is the zero sentinel.
    pub siblings: Vec<Option<Digest>>,
    /// The proof's witness.
    pub kind: ProofKind,
}

impl Proof {
    /// Builds a new proof from a sibling path and a witness kind.
    pub fn new(siblings: Vec<Option<Digest>>, kind: ProofKind) -> Self {
        Self { siblings, kind }
    }
}
