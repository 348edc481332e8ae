//! Flushing dirty nodes to the store (spec §4.1.4 "Commit"): a post-order
//! walk that writes every `Internal`/`Leaf` whose `pointer` is still
//! `None`, skipping anything already durable, and replaces each written
//! node with a `Hash` placeholder once it falls at or below
//! `cache_depth` (spec §4.2.5 — shallow nodes stay resident so the next
//! walk doesn't have to round-trip the disk for them).

use urkel_fs::FileSystem;
use urkel_hash::Hasher;
use urkel_store::Store;
use urkel_types::{Digest, NodePointer, NodeTag};

use crate::node::{HashNode, Internal, Leaf, Node};
use crate::Result;

/// Writes every dirty node reachable from `root`, then commits the
/// resulting root pointer as a new meta record. Returns the (possibly
/// collapsed-to-`Hash`) root alongside its on-disk pointer, or `None` if
/// the tree is empty.
pub fn commit<H: Hasher, F: FileSystem>(store: &Store<F>, root: Node, cache_depth: usize) -> Result<(Node, Option<NodePointer>)> {
    let zero = H::zero();
    let root = commit_node::<H, F>(store, root, 0, cache_depth, &zero)?;
    let root_ptr = node_pointer(&root);
    store.commit_meta(root_ptr)?;
    Ok((root, root_ptr))
}

pub(crate) fn node_pointer(node: &Node) -> Option<NodePointer> {
    match node {
        Node::Nil => None,
        Node::Hash(h) => Some(h.pointer),
        Node::Internal(i) => i.pointer,
        Node::Leaf(l) => l.pointer,
    }
}

pub(crate) fn ptr_of(node: &Node) -> NodePointer {
    node_pointer(node).unwrap_or(NodePointer::NIL)
}

fn commit_node<H: Hasher, F: FileSystem>(store: &Store<F>, node: Node, depth: usize, cache_depth: usize, zero: &Digest) -> Result<Node> {
    match node {
        Node::Nil => Ok(Node::Nil),
        Node::Hash(h) => Ok(Node::Hash(h)),
        Node::Leaf(leaf) if leaf.pointer.is_some() => Ok(Node::Leaf(leaf)),
        Node::Leaf(leaf) => commit_leaf::<H, F>(store, *leaf, depth, cache_depth),
        Node::Internal(internal) if internal.pointer.is_some() => Ok(Node::Internal(internal)),
        Node::Internal(internal) => commit_internal::<H, F>(store, *internal, depth, cache_depth, zero),
    }
}

fn commit_leaf<H: Hasher, F: FileSystem>(store: &Store<F>, mut leaf: Leaf, depth: usize, cache_depth: usize) -> Result<Node> {
    let value_ptr = match leaf.value_ptr {
        Some(ptr) => ptr,
        None => {
            let value = leaf.value.as_deref().expect("a dirty leaf carries a resident value");
            store.append_value(value)?
        }
    };

    let mut bytes = Vec::with_capacity(8 + leaf.key.len());
    bytes.extend_from_slice(&value_ptr.pack());
    bytes.extend_from_slice(&leaf.key);
    let pointer = store.append_node(&bytes, NodeTag::Leaf)?;

    leaf.value_ptr = Some(value_ptr);
    leaf.pointer = Some(pointer);

    if depth >= cache_depth {
        Ok(Node::Hash(HashNode { digest: leaf.digest, pointer }))
    } else {
        Ok(Node::Leaf(Box::new(leaf)))
    }
}

fn commit_internal<H: Hasher, F: FileSystem>(
    store: &Store<F>,
    mut internal: Internal,
    depth: usize,
    cache_depth: usize,
    zero: &Digest,
) -> Result<Node> {
    internal.left = commit_node::<H, F>(store, internal.left, depth + 1, cache_depth, zero)?;
    internal.right = commit_node::<H, F>(store, internal.right, depth + 1, cache_depth, zero)?;

    let left_ptr = ptr_of(&internal.left);
    let left_hash = internal.left.digest(zero);
    let right_ptr = ptr_of(&internal.right);
    let right_hash = internal.right.digest(zero);

    let mut bytes = Vec::with_capacity(7 + H::SIZE + 7 + H::SIZE);
    bytes.extend_from_slice(&left_ptr.pack().map_err(crate::Error::Core)?);
    bytes.extend_from_slice(left_hash.as_bytes());
    bytes.extend_from_slice(&right_ptr.pack().map_err(crate::Error::Core)?);
    bytes.extend_from_slice(right_hash.as_bytes());

    let pointer = store.append_node(&bytes, NodeTag::Internal)?;
    internal.pointer = Some(pointer);

    if depth >= cache_depth {
        Ok(Node::Hash(HashNode { digest: internal.digest, pointer }))
    } else {
        Ok(Node::Internal(Box::new(internal)))
    }
}

#[cfg(test)]
mod tests {
    use urkel_fs::MemoryFs;
    use urkel_hash::Blake3;

    use super::*;
    use crate::engine::{get, insert};

    #[test]
    fn commit_then_reopen_resolves_values() {
        let fs = MemoryFs::new();
        let (store, _) = Store::open(fs, "/store", 1 << 20).unwrap();

        let key = [7u8; 32];
        let root = insert::<Blake3, _>(&store, Node::Nil, &key, b"v".to_vec(), 256).unwrap();
        let (root, root_ptr) = commit::<Blake3, _>(&store, root, 4).unwrap();
        assert!(root_ptr.is_some());

        let got = get::<Blake3, _>(&store, &root, &key, 256).unwrap();
        assert_eq!(got, Some(b"v".to_vec()));
    }

    #[test]
    fn reinsert_same_value_then_commit_is_noop_write() {
        let fs = MemoryFs::new();
        let (store, _) = Store::open(fs, "/store", 1 << 20).unwrap();

        let key = [3u8; 32];
        let root = insert::<Blake3, _>(&store, Node::Nil, &key, b"a".to_vec(), 256).unwrap();
        let (root, _) = commit::<Blake3, _>(&store, root, 4).unwrap();
        let stats_before = store.stats().unwrap();

        let root = insert::<Blake3, _>(&store, root, &key, b"a".to_vec(), 256).unwrap();
        let (_, _) = commit::<Blake3, _>(&store, root, 4).unwrap();
        let stats_after = store.stats().unwrap();

        assert_eq!(stats_before.total_bytes, stats_after.total_bytes);
    }

    #[test]
    fn nodes_above_cache_depth_are_resident_after_commit() {
        let fs = MemoryFs::new();
        let (store, _) = Store::open(fs, "/store", 1 << 20).unwrap();

        let mut root = Node::Nil;
        for i in 0..4u8 {
            let mut key = [0u8; 32];
            key[0] = i << 6;
            root = insert::<Blake3, _>(&store, root, &key, vec![i], 256).unwrap();
        }

        let (root, _) = commit::<Blake3, _>(&store, root, 0).unwrap();
        assert!(matches!(root, Node::Hash(_)));
    }

    #[test]
    fn empty_tree_commits_to_no_root_pointer() {
        let fs = MemoryFs::new();
        let (store, _) = Store::open(fs, "/store", 1 << 20).unwrap();

        let (root, root_ptr) = commit::<Blake3, _>(&store, Node::Nil, 4).unwrap();
        assert!(root.is_nil());
        assert!(root_ptr.is_none());
    }
}
