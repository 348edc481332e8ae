//! Turning a [`Node::Hash`] placeholder into its decoded `Internal` or
//! `Leaf` (spec §4.1.1 "On Hash, resolve from the store and retry at the
//! same depth"; §9 "a resolver that returns either a decoded node or an
//! error, never yielding control inside the walk except at the I/O call
//! itself").

use urkel_fs::FileSystem;
use urkel_hash::{leaf_digest, Hasher};
use urkel_store::Store;
use urkel_types::{Digest, NodePointer, NodeTag, ValuePointer};

use crate::node::{HashNode, Internal, Leaf, Node};
use crate::Result;

/// Resolves `node` one level: a `Hash` placeholder is decoded into its
/// `Internal` or `Leaf` form (with its own children still unresolved
/// `Hash`/`Nil` placeholders); every other variant passes through
/// unchanged.
pub(crate) fn resolve<H: Hasher, F: FileSystem>(store: &Store<F>, node: Node) -> Result<Node> {
    match node {
        Node::Hash(h) => decode_node::<H, F>(store, h.digest, h.pointer),
        other => Ok(other),
    }
}

fn decode_node<H: Hasher, F: FileSystem>(store: &Store<F>, digest: Digest, ptr: NodePointer) -> Result<Node> {
    let bytes = store.read_node(ptr)?;

    match ptr.tag {
        NodeTag::Internal => {
            let h = H::SIZE;
            let want = 7 + h + 7 + h;
            if bytes.len() != want {
                return Err(crate::error::encoding(0, format!("internal record is {} bytes, expected {want}", bytes.len())));
            }

            let mut lptr_bytes = [0u8; 7];
            lptr_bytes.copy_from_slice(&bytes[0..7]);
            let lptr = NodePointer::unpack(&lptr_bytes)?;
            let lhash = Digest::new(bytes[7..7 + h].to_vec());

            let mut rptr_bytes = [0u8; 7];
            rptr_bytes.copy_from_slice(&bytes[7 + h..7 + h + 7]);
            let rptr = NodePointer::unpack(&rptr_bytes)?;
            let rhash = Digest::new(bytes[7 + h + 7..want].to_vec());

            let left = if lptr.is_nil() {
                Node::Nil
            } else {
                Node::Hash(HashNode { digest: lhash, pointer: lptr })
            };
            let right = if rptr.is_nil() {
                Node::Nil
            } else {
                Node::Hash(HashNode { digest: rhash, pointer: rptr })
            };

            Ok(Node::Internal(Box::new(Internal {
                left,
                right,
                digest,
                pointer: Some(ptr),
            })))
        }
        NodeTag::Leaf => {
            if bytes.len() < 8 {
                return Err(crate::error::encoding(0, "leaf record shorter than a value pointer"));
            }

            let mut vptr_bytes = [0u8; 8];
            vptr_bytes.copy_from_slice(&bytes[0..8]);
            let value_ptr = ValuePointer::unpack(&vptr_bytes);
            let key = bytes[8..].to_vec();

            Ok(Node::Leaf(Box::new(Leaf {
                key,
                value: None,
                value_ptr: Some(value_ptr),
                digest,
                pointer: Some(ptr),
            })))
        }
    }
}

/// Reads a leaf's value, preferring the resident copy over a store round trip.
pub(crate) fn resolve_value<F: FileSystem>(store: &Store<F>, leaf: &Leaf) -> Result<Vec<u8>> {
    match &leaf.value {
        Some(v) => Ok(v.clone()),
        None => {
            let ptr = leaf.value_ptr.expect("a leaf without a resident value carries a value pointer");
            Ok(store.read_value(ptr)?)
        }
    }
}

/// `H(value)` for a leaf, without transmitting the value itself (used to
/// build a collision witness, spec §4.3).
pub(crate) fn value_digest<H: Hasher, F: FileSystem>(store: &Store<F>, leaf: &Leaf) -> Result<Digest> {
    let value = resolve_value(store, leaf)?;
    Ok(H::hash(&value))
}

/// Computes the digest of the node record a committed [`NodePointer`]
/// refers to, by decoding the record and rehashing its fields — the meta
/// record stores only the root pointer, not its digest (spec §6 "Meta
/// record"), so reopening a store must recompute it.
pub(crate) fn root_digest_at<H: Hasher, F: FileSystem>(store: &Store<F>, ptr: NodePointer) -> Result<Digest> {
    let bytes = store.read_node(ptr)?;

    match ptr.tag {
        NodeTag::Internal => {
            let h = H::SIZE;
            let want = 7 + h + 7 + h;
            if bytes.len() != want {
                return Err(crate::error::encoding(0, format!("internal record is {} bytes, expected {want}", bytes.len())));
            }
            let lhash = Digest::new(bytes[7..7 + h].to_vec());
            let rhash = Digest::new(bytes[7 + h + 7..want].to_vec());
            Ok(urkel_hash::internal_digest::<H>(&lhash, &rhash))
        }
        NodeTag::Leaf => {
            if bytes.len() < 8 {
                return Err(crate::error::encoding(0, "leaf record shorter than a value pointer"));
            }
            let mut vptr_bytes = [0u8; 8];
            vptr_bytes.copy_from_slice(&bytes[0..8]);
            let value_ptr = ValuePointer::unpack(&vptr_bytes);
            let key = bytes[8..].to_vec();
            let value = store.read_value(value_ptr)?;
            Ok(leaf_digest::<H>(&key, &value))
        }
    }
}
