//! Compaction (spec §4.2.4): rewrite only the live nodes and values
//! reachable from the current root into a fresh segment set, then swap
//! it into place. Safe to abort at any point — the old prefix is never
//! touched until the new one has a durable meta record.

use urkel_fs::FileSystem;
use urkel_hash::Hasher;
use urkel_store::{compaction_prefix, swap_into_place, Store};
use urkel_types::{Digest, NodeTag};

use crate::commit::{node_pointer, ptr_of};
use crate::node::{HashNode, Node};
use crate::options::Options;
use crate::resolver::{resolve, resolve_value};
use crate::tree::Tree;
use crate::Result;

/// Compacts the on-disk tree at `options.prefix`, then reopens it.
///
/// Panics if `options.prefix` is `None` — compaction rewrites segment
/// files, which only exist for an on-disk tree.
pub fn compact<H: Hasher, F: FileSystem>(fs: F, options: Options) -> Result<Tree<H, F>> {
    let main_prefix = options
        .prefix
        .clone()
        .expect("compaction requires an on-disk tree (options.prefix is None)");

    let new_prefix = {
        let tree = Tree::<H, F>::open(fs.clone(), options.clone())?;
        let root = tree.snapshot().into_root();
        let zero = H::zero();

        let staging = compaction_prefix(&main_prefix);
        let (new_store, _) = Store::open(fs.clone(), &staging, options.max_segment_size)?;

        let new_root = copy_live::<H, F>(tree.store(), &new_store, root, &zero)?;
        new_store.commit_meta(node_pointer(&new_root))?;

        staging
        // `tree`'s lock is released here, before the old directory is touched.
    };

    swap_into_place(&fs, &main_prefix, &new_prefix)?;

    Tree::<H, F>::open(fs, options)
}

fn copy_live<H: Hasher, F: FileSystem>(old: &Store<F>, new: &Store<F>, node: Node, zero: &Digest) -> Result<Node> {
    let node = resolve::<H, F>(old, node)?;

    match node {
        Node::Nil => Ok(Node::Nil),
        Node::Hash(_) => unreachable!("resolve always decodes Hash placeholders"),
        Node::Leaf(leaf) => {
            let value = resolve_value(old, &leaf)?;
            let value_ptr = new.append_value(&value)?;

            let mut bytes = Vec::with_capacity(8 + leaf.key.len());
            bytes.extend_from_slice(&value_ptr.pack());
            bytes.extend_from_slice(&leaf.key);
            let pointer = new.append_node(&bytes, NodeTag::Leaf)?;

            Ok(Node::Hash(HashNode { digest: leaf.digest, pointer }))
        }
        Node::Internal(internal) => {
            let left = copy_live::<H, F>(old, new, internal.left, zero)?;
            let right = copy_live::<H, F>(old, new, internal.right, zero)?;

            let left_ptr = ptr_of(&left);
            let right_ptr = ptr_of(&right);

            let mut bytes = Vec::with_capacity(7 + H::SIZE + 7 + H::SIZE);
            bytes.extend_from_slice(&left_ptr.pack().map_err(crate::Error::Core)?);
            bytes.extend_from_slice(left.digest(zero).as_bytes());
            bytes.extend_from_slice(&right_ptr.pack().map_err(crate::Error::Core)?);
            bytes.extend_from_slice(right.digest(zero).as_bytes());
            let pointer = new.append_node(&bytes, NodeTag::Internal)?;

            Ok(Node::Hash(HashNode { digest: internal.digest, pointer }))
        }
    }
}

#[cfg(test)]
mod tests {
    use urkel_fs::MemoryFs;
    use urkel_hash::Blake3;

    use super::*;

    #[test]
    fn compacted_tree_preserves_root_and_values() {
        let fs = MemoryFs::new();
        let options = Options { bits: 256, prefix: Some("/store".to_string()), ..Default::default() };

        let tree = Tree::<Blake3, _>::open(fs.clone(), options.clone()).unwrap();
        let keys: Vec<[u8; 32]> = (0..8u8)
            .map(|i| {
                let mut k = [0u8; 32];
                k[0] = i;
                k
            })
            .collect();
        {
            let mut tx = tree.transaction().unwrap();
            for (i, k) in keys.iter().enumerate() {
                tx.insert(k, vec![i as u8]).unwrap();
            }
            tx.commit().unwrap();
        }
        let before = tree.root_digest();
        drop(tree);

        let compacted = compact::<Blake3, _>(fs, options).unwrap();
        assert_eq!(compacted.root_digest(), before);

        let snap = compacted.snapshot();
        for (i, k) in keys.iter().enumerate() {
            assert_eq!(snap.get(k).unwrap(), Some(vec![i as u8]));
        }
    }
}
