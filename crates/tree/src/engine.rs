//! The trie engine: lookup, insert, remove, and proof generation (spec
//! §4.1.1–§4.1.3, §4.3). Each walk is an explicit loop over a sibling
//! stack, not recursion through I/O (spec §9) — `resolve` only ever
//! decodes one placeholder at a time and hands control straight back to
//! the loop.

use urkel_fs::FileSystem;
use urkel_hash::Hasher;
use urkel_proof::{Proof, ProofKind};
use urkel_store::Store;
use urkel_types::bit_at;

use crate::error::missing_node;
use crate::node::Node;
use crate::resolver::{resolve, resolve_value, value_digest};
use crate::Result;

fn check_depth<H: Hasher>(root: &Node, key: &[u8], depth: usize, bits: usize) -> Result<()> {
    if depth >= bits {
        let zero = H::zero();
        return Err(missing_node(root.digest(&zero), zero, key, depth));
    }
    Ok(())
}

fn check_depth_at(root_digest: &urkel_types::Digest, node_digest: &urkel_types::Digest, key: &[u8], depth: usize, bits: usize) -> Result<()> {
    if depth >= bits {
        return Err(missing_node(root_digest.clone(), node_digest.clone(), key, depth));
    }
    Ok(())
}

/// `get(root, key)` (spec §4.1.1).
pub fn get<H: Hasher, F: FileSystem>(store: &Store<F>, root: &Node, key: &[u8], bits: usize) -> Result<Option<Vec<u8>>> {
    let mut node = root.clone();
    let mut depth = 0usize;

    loop {
        node = resolve::<H, F>(store, node)?;

        match node {
            Node::Nil => return Ok(None),
            Node::Internal(internal) => {
                check_depth::<H>(root, key, depth, bits)?;
                let bit = bit_at(key, depth);
                node = if bit == 0 { internal.left } else { internal.right };
                depth += 1;
            }
            Node::Leaf(leaf) => {
                if leaf.key == key {
                    return Ok(Some(resolve_value(store, &leaf)?));
                }
                return Ok(None);
            }
            Node::Hash(_) => unreachable!("resolve always decodes Hash placeholders"),
        }
    }
}

/// `insert(root, key, value)` (spec §4.1.2).
///
/// Idempotent: reinserting the same `(key, value)` leaves the resulting
/// digest unchanged, because the loop reconstructs with the *existing*
/// leaf (preserving its on-disk pointer, so `commit` need not rewrite it)
/// whenever the new leaf digest matches.
pub fn insert<H: Hasher, F: FileSystem>(
    store: &Store<F>,
    root: Node,
    key: &[u8],
    value: Vec<u8>,
    bits: usize,
) -> Result<Node> {
    let zero = H::zero();
    let root_digest = root.digest(&zero);
    let mut stack: Vec<Node> = Vec::new();
    let mut depth = 0usize;
    let mut node = root;

    let terminal = loop {
        node = resolve::<H, F>(store, node)?;

        match node {
            Node::Nil => break Node::new_leaf::<H>(key.to_vec(), value),
            Node::Internal(internal) => {
                check_depth_at(&root_digest, &internal.digest, key, depth, bits)?;
                let bit = bit_at(key, depth);
                if bit == 0 {
                    stack.push(internal.right);
                    node = internal.left;
                } else {
                    stack.push(internal.left);
                    node = internal.right;
                }
                depth += 1;
                continue;
            }
            Node::Leaf(existing) => {
                if existing.key == key {
                    let new_digest = urkel_hash::leaf_digest::<H>(key, &value);
                    if new_digest == existing.digest {
                        break Node::Leaf(existing);
                    }
                    break Node::new_leaf::<H>(key.to_vec(), value);
                }

                let mut d = depth;
                while bit_at(key, d) == bit_at(&existing.key, d) {
                    stack.push(Node::Nil);
                    d += 1;
                }
                stack.push(Node::Leaf(existing));
                d += 1;
                depth = d;
                break Node::new_leaf::<H>(key.to_vec(), value);
            }
            Node::Hash(_) => unreachable!("resolve always decodes Hash placeholders"),
        }
    };

    Ok(reconstruct::<H>(terminal, stack, key, depth, &zero))
}

/// `remove(root, key)` (spec §4.1.3).
pub fn remove<H: Hasher, F: FileSystem>(store: &Store<F>, root: Node, key: &[u8], bits: usize) -> Result<Node> {
    let zero = H::zero();
    let root_digest = root.digest(&zero);
    let mut stack: Vec<Node> = Vec::new();
    let mut depth = 0usize;
    let mut node = root;

    loop {
        node = resolve::<H, F>(store, node)?;

        match node {
            Node::Nil => return Ok(reconstruct::<H>(Node::Nil, stack, key, depth, &zero)),
            Node::Internal(internal) => {
                check_depth_at(&root_digest, &internal.digest, key, depth, bits)?;
                let bit = bit_at(key, depth);
                if bit == 0 {
                    stack.push(internal.right);
                    node = internal.left;
                } else {
                    stack.push(internal.left);
                    node = internal.right;
                }
                depth += 1;
            }
            Node::Leaf(existing) => {
                if existing.key != key {
                    return Ok(reconstruct::<H>(Node::Leaf(existing), stack, key, depth, &zero));
                }
                if depth == 0 {
                    return Ok(Node::Nil);
                }

                let sibling = resolve::<H, F>(store, stack.pop().expect("a leaf below the root has a sibling"))?;
                depth -= 1;

                let terminal = match sibling {
                    Node::Leaf(sibling_leaf) => {
                        while depth > 0 && bit_at(key, depth - 1) == bit_at(&sibling_leaf.key, depth - 1) {
                            match stack.last() {
                                Some(Node::Nil) => {
                                    stack.pop();
                                    depth -= 1;
                                }
                                _ => break,
                            }
                        }
                        Node::Leaf(sibling_leaf)
                    }
                    other => {
                        stack.push(other);
                        Node::Nil
                    }
                };

                return Ok(reconstruct::<H>(terminal, stack, key, depth, &zero));
            }
            Node::Hash(_) => unreachable!("resolve always decodes Hash placeholders"),
        }
    }
}

fn reconstruct<H: Hasher>(terminal: Node, mut stack: Vec<Node>, key: &[u8], mut depth: usize, zero: &urkel_types::Digest) -> Node {
    let mut node = terminal;

    while let Some(sibling) = stack.pop() {
        depth -= 1;
        node = if bit_at(key, depth) == 0 {
            Node::new_internal::<H>(node, sibling, zero)
        } else {
            Node::new_internal::<H>(sibling, node, zero)
        };
    }

    node
}

/// `prove(root, key)`: builds an inclusion/exclusion [`Proof`] for `key`
/// against `root` (spec §4.3).
pub fn prove<H: Hasher, F: FileSystem>(store: &Store<F>, root: &Node, key: &[u8], bits: usize) -> Result<Proof> {
    let zero = H::zero();
    let root_digest = root.digest(&zero);
    let mut node = root.clone();
    let mut siblings = Vec::new();
    let mut depth = 0usize;

    loop {
        node = resolve::<H, F>(store, node)?;

        match node {
            Node::Nil => {
                return Ok(Proof::new(elide(siblings), ProofKind::DeadEnd));
            }
            Node::Internal(internal) => {
                check_depth_at(&root_digest, &internal.digest, key, depth, bits)?;
                let bit = bit_at(key, depth);
                let (next, sibling_digest) = if bit == 0 {
                    (internal.left, internal.right.digest(&zero))
                } else {
                    (internal.right, internal.left.digest(&zero))
                };
                siblings.push(sibling_digest);
                node = next;
                depth += 1;
            }
            Node::Leaf(leaf) => {
                if leaf.key == key {
                    let value = resolve_value(store, &leaf)?;
                    return Ok(Proof::new(elide(siblings), ProofKind::Exists(value)));
                }

                let other_value_digest = value_digest::<H, F>(store, &leaf)?;
                return Ok(Proof::new(
                    elide(siblings),
                    ProofKind::Collision {
                        other_key: urkel_types::Digest::new(leaf.key),
                        other_value_digest,
                    },
                ));
            }
            Node::Hash(_) => unreachable!("resolve always decodes Hash placeholders"),
        }
    }
}

fn elide(siblings: Vec<urkel_types::Digest>) -> Vec<Option<urkel_types::Digest>> {
    siblings.into_iter().map(|d| if d.is_zero() { None } else { Some(d) }).collect()
}
