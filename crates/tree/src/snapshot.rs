//! A read-only view bound to a fixed root hash (spec §4.1.6): "multiple
//! snapshots share the same store but never write."

use std::marker::PhantomData;

use urkel_fs::FileSystem;
use urkel_hash::Hasher;
use urkel_proof::Proof;
use urkel_store::Store;
use urkel_types::Digest;

use crate::engine::{get, prove};
use crate::iter::Iter;
use crate::node::Node;
use crate::Result;

/// A read-only binding of a root hash to its subtree, shared against a
/// store without ever mutating it.
pub struct Snapshot<'a, H: Hasher, F: FileSystem> {
    store: &'a Store<F>,
    root: Node,
    digest: Digest,
    bits: usize,
    _hasher: PhantomData<H>,
}

impl<'a, H: Hasher, F: FileSystem> Snapshot<'a, H, F> {
    pub(crate) fn new(store: &'a Store<F>, root: Node, digest: Digest, bits: usize) -> Self {
        Self { store, root, digest, bits, _hasher: PhantomData }
    }

    /// The digest this snapshot is pinned to.
    pub fn root_digest(&self) -> &Digest {
        &self.digest
    }

    /// Looks up `key` (spec §4.1.1).
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        get::<H, F>(self.store, &self.root, key, self.bits)
    }

    /// Builds an inclusion/exclusion proof for `key` (spec §4.3).
    pub fn prove(&self, key: &[u8]) -> Result<Proof> {
        prove::<H, F>(self.store, &self.root, key, self.bits)
    }

    /// A lazy (key, value) walk of every entry reachable from this root
    /// (spec §4.1.5).
    pub fn iter(&self) -> Iter<'a, H, F> {
        Iter::new(self.store, self.root.clone())
    }

    /// Consumes the snapshot, returning its bound root node.
    pub(crate) fn into_root(self) -> Node {
        self.root
    }
}

#[cfg(test)]
mod tests {
    use urkel_fs::MemoryFs;
    use urkel_hash::Blake3;

    use super::*;
    use crate::engine::insert;
    use urkel_store::Store as UrkelStore;

    #[test]
    fn snapshot_reads_are_pinned_to_its_root() {
        let fs = MemoryFs::new();
        let (store, _) = UrkelStore::open(fs, "/store", 1 << 20).unwrap();

        let key = [1u8; 32];
        let root_v1 = insert::<Blake3, _>(&store, Node::Nil, &key, b"v1".to_vec(), 256).unwrap();
        let zero = Blake3::zero();
        let snap = Snapshot::<Blake3, _>::new(&store, root_v1.clone(), root_v1.digest(&zero), 256);

        let root_v2 = insert::<Blake3, _>(&store, root_v1, &key, b"v2".to_vec(), 256).unwrap();
        let _ = root_v2;

        assert_eq!(snap.get(&key).unwrap(), Some(b"v1".to_vec()));
    }
}
