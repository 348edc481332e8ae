//! The node model (spec §3.2).
//!
//! Node polymorphism is a tagged sum, not a class hierarchy: the four
//! spec variants map directly onto a Rust `enum`, `NIL` is the
//! zero-sized unit variant rather than an allocated singleton, and
//! `Internal`/`Leaf` are copy-on-write in the sense that mutation
//! produces a new boxed value instead of mutating in place (spec §9
//! "Node polymorphism").

use urkel_types::{Digest, NodePointer, ValuePointer};

/// One node of the trie: absent, branching, a stored key, or an
/// unresolved on-disk placeholder (spec §3.2).
#[derive(Debug, Clone)]
pub enum Node {
    /// Absent subtree. Hashes to the hasher's zero sentinel.
    Nil,
    /// A branch with exactly two children.
    Internal(Box<Internal>),
    /// A stored key, reachable as the sole live key on its bit path.
    Leaf(Box<Leaf>),
    /// An unresolved placeholder for an `Internal` or `Leaf` written to disk.
    Hash(HashNode),
}

/// An `Internal` node: two children plus a cached digest and, once
/// written, the on-disk pointer of this exact child pairing (spec §3.2
/// invariant 4: digest depends only on the children).
#[derive(Debug, Clone)]
pub struct Internal {
    /// The `bit = 0` child.
    pub left: Node,
    /// The `bit = 1` child.
    pub right: Node,
    /// `H(0x01 ‖ left.digest ‖ right.digest)`, computed eagerly at construction.
    pub digest: Digest,
    /// Set once this exact node has been written; `None` means dirty (spec §4.1.4).
    pub pointer: Option<NodePointer>,
}

/// A `Leaf` node: the key it stores, and its value either resident or
/// reachable only via pointer (spec §3.2).
#[derive(Debug, Clone)]
pub struct Leaf {
    /// The N-bit key this leaf is the sole holder of.
    pub key: Vec<u8>,
    /// The value bytes, if resident in memory.
    pub value: Option<Vec<u8>>,
    /// Set once the value has been written to the store.
    pub value_ptr: Option<ValuePointer>,
    /// `H(0x00 ‖ key ‖ H(value))`, computed eagerly at construction.
    pub digest: Digest,
    /// Set once this exact node has been written; `None` means dirty.
    pub pointer: Option<NodePointer>,
}

/// An unresolved reference to an `Internal` or `Leaf` record on disk.
#[derive(Debug, Clone, Copy)]
pub struct HashNode {
    /// The digest of the node this placeholder stands in for.
    pub digest: Digest,
    /// Where to find it.
    pub pointer: NodePointer,
}

impl Node {
    /// This node's digest. `zero` is the hasher's zero sentinel, needed
    /// since `Nil` itself carries no digest of its own (spec §3.1: "a NIL
    /// child contributes its own sentinel zero bytes").
    pub fn digest(&self, zero: &Digest) -> Digest {
        match self {
            Node::Nil => zero.clone(),
            Node::Internal(i) => i.digest.clone(),
            Node::Leaf(l) => l.digest.clone(),
            Node::Hash(h) => h.digest.clone(),
        }
    }

    /// `true` for the `Nil` variant.
    pub fn is_nil(&self) -> bool {
        matches!(self, Node::Nil)
    }

    /// `true` if this node is already fully durable (a `Hash` placeholder,
    /// or an `Internal`/`Leaf` whose `pointer` is set — spec §4.1.4's
    /// "commit walks dirty nodes" skips these).
    pub fn is_written(&self) -> bool {
        match self {
            Node::Nil => true,
            Node::Hash(_) => true,
            Node::Internal(i) => i.pointer.is_some(),
            Node::Leaf(l) => l.pointer.is_some(),
        }
    }

    /// Builds a new, dirty `Leaf` from a key and resident value,
    /// computing its digest immediately.
    pub fn new_leaf<H: urkel_hash::Hasher>(key: Vec<u8>, value: Vec<u8>) -> Node {
        let digest = urkel_hash::leaf_digest::<H>(&key, &value);

        Node::Leaf(Box::new(Leaf {
            key,
            value: Some(value),
            value_ptr: None,
            digest,
            pointer: None,
        }))
    }

    /// Builds a new, dirty `Internal` from two children, computing its digest immediately.
    pub fn new_internal<H: urkel_hash::Hasher>(left: Node, right: Node, zero: &Digest) -> Node {
        let left_digest = left.digest(zero);
        let right_digest = right.digest(zero);
        let digest = urkel_hash::internal_digest::<H>(&left_digest, &right_digest);

        Node::Internal(Box::new(Internal {
            left,
            right,
            digest,
            pointer: None,
        }))
    }
}
