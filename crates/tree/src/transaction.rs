//! A mutable snapshot of the current root (spec §4.1.6): `commit`
//! persists and publishes the new root, `clear` discards uncommitted
//! changes. The tree enforces that only one transaction is live at a
//! time (spec §4.1.6, §4.4); dropping a transaction without committing
//! releases that slot without publishing anything.

use urkel_fs::FileSystem;
use urkel_hash::Hasher;
use urkel_proof::Proof;
use urkel_types::Digest;

use crate::commit::commit;
use crate::engine::{get, insert, prove, remove};
use crate::node::Node;
use crate::tree::Tree;
use crate::Result;

/// A mutable working copy of a tree's root, held exclusively until
/// committed, cleared, or dropped.
pub struct Transaction<'a, H: Hasher, F: FileSystem> {
    tree: &'a Tree<H, F>,
    root: Node,
    released: bool,
}

impl<'a, H: Hasher, F: FileSystem> Transaction<'a, H, F> {
    pub(crate) fn new(tree: &'a Tree<H, F>, root: Node) -> Self {
        Self { tree, root, released: false }
    }

    /// The digest of this transaction's in-progress root.
    pub fn root_digest(&self) -> Digest {
        self.root.digest(&self.tree.zero())
    }

    /// Looks up `key` against the in-progress root.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        get::<H, F>(self.tree.store(), &self.root, key, self.tree.options().bits)
    }

    /// Builds a proof against the in-progress root.
    pub fn prove(&self, key: &[u8]) -> Result<Proof> {
        prove::<H, F>(self.tree.store(), &self.root, key, self.tree.options().bits)
    }

    /// Sets `key` to `value` in the working root (spec §4.1.2). Not
    /// written to disk until [`Self::commit`].
    pub fn insert(&mut self, key: &[u8], value: Vec<u8>) -> Result<()> {
        let root = std::mem::replace(&mut self.root, Node::Nil);
        self.root = insert::<H, F>(self.tree.store(), root, key, value, self.tree.options().bits)?;
        Ok(())
    }

    /// Removes `key` from the working root (spec §4.1.3), a no-op if absent.
    pub fn remove(&mut self, key: &[u8]) -> Result<()> {
        let root = std::mem::replace(&mut self.root, Node::Nil);
        self.root = remove::<H, F>(self.tree.store(), root, key, self.tree.options().bits)?;
        Ok(())
    }

    /// Discards every uncommitted change, resetting to the tree's
    /// currently published root. The transaction remains live.
    pub fn clear(&mut self) {
        self.root = self.tree.snapshot().into_root();
    }

    /// Writes every dirty node (spec §4.1.4), publishes the new root on
    /// the owning tree, and releases the transaction slot.
    pub fn commit(mut self) -> Result<Digest> {
        let root = std::mem::replace(&mut self.root, Node::Nil);
        let (root, _ptr) = commit::<H, F>(self.tree.store(), root, self.tree.options().cache_depth)?;
        let digest = root.digest(&self.tree.zero());
        self.tree.publish(root, digest.clone());
        self.tree.release_transaction();
        self.released = true;
        Ok(digest)
    }
}

impl<'a, H: Hasher, F: FileSystem> Drop for Transaction<'a, H, F> {
    fn drop(&mut self) {
        if !self.released {
            self.tree.release_transaction();
        }
    }
}

#[cfg(test)]
mod tests {
    use urkel_fs::MemoryFs;
    use urkel_hash::Blake3;

    use super::*;
    use crate::options::Options;

    #[test]
    fn clear_discards_uncommitted_inserts() {
        let fs = MemoryFs::new();
        let tree = Tree::<Blake3, _>::open(fs, Options { bits: 256, ..Default::default() }).unwrap();

        let mut tx = tree.transaction().unwrap();
        tx.insert(&[1u8; 32], b"v".to_vec()).unwrap();
        assert!(tx.get(&[1u8; 32]).unwrap().is_some());

        tx.clear();
        assert!(tx.get(&[1u8; 32]).unwrap().is_none());
    }

    #[test]
    fn dropping_without_commit_leaves_tree_unpublished_and_releases_slot() {
        let fs = MemoryFs::new();
        let tree = Tree::<Blake3, _>::open(fs, Options { bits: 256, ..Default::default() }).unwrap();
        let zero = Blake3::zero();

        {
            let mut tx = tree.transaction().unwrap();
            tx.insert(&[2u8; 32], b"v".to_vec()).unwrap();
        }

        assert_eq!(tree.root_digest(), zero);
        assert!(tree.transaction().is_ok());
    }
}
