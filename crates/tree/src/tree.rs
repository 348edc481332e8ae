//! The top-level handle: opening a store, recovering its current root,
//! and serving snapshots and transactions against it (spec §4.1.6).

use std::marker::PhantomData;
use std::num::NonZeroUsize;

use parking_lot::Mutex;

use urkel_fs::FileSystem;
use urkel_hash::Hasher;
use urkel_lock::{Lock, LockConfig};
use urkel_store::Store;
use urkel_types::Digest;

use crate::cache::RootCache;
use crate::node::{HashNode, Node};
use crate::options::Options;
use crate::resolver::root_digest_at;
use crate::snapshot::Snapshot;
use crate::transaction::Transaction;
use crate::Result;

/// Ephemeral in-process prefix used when no on-disk `prefix` is configured.
const EPHEMERAL_PREFIX: &str = "/urkel";

/// Minimum root cache capacity, independent of `init_cache_size`, so a
/// freshly opened tree always has room to cache roots committed after
/// open even when `init_cache_size` is small or zero.
const MIN_CACHE_CAPACITY: usize = 16;

/// Cache capacity picked when `init_cache_size == -1` ("index everything"):
/// the backfill walk is still unbounded, but the cache itself stays
/// bounded, so only this many of the oldest-discovered roots survive the
/// walk once newer ones push them out.
const FULL_SCAN_CACHE_CAPACITY: usize = 256;

struct TreeState {
    digest: Digest,
    root: Node,
}

/// A handle to one Urkel trie: its store, its lock (if on-disk), its root
/// cache, and the currently published root.
pub struct Tree<H: Hasher, F: FileSystem> {
    store: Store<F>,
    options: Options,
    lock: Option<Lock<F>>,
    cache: Mutex<RootCache>,
    state: Mutex<TreeState>,
    tx_active: Mutex<bool>,
    _hasher: PhantomData<H>,
}

impl<H: Hasher, F: FileSystem> Tree<H, F> {
    /// Opens (or creates) the tree at `options.prefix`, recovering its
    /// most recent durable root and backfilling the root cache per
    /// `options.init_cache_size` (spec §4.2.3, §4.2.5).
    ///
    /// A `prefix` of `None` skips lock acquisition entirely: the mutator
    /// lock exists to arbitrate *processes* sharing a directory (spec
    /// §4.4), which has no meaning for an ephemeral, single-process store.
    pub fn open(fs: F, options: Options) -> Result<Self> {
        let prefix = options.prefix.clone().unwrap_or_else(|| EPHEMERAL_PREFIX.to_string());

        let lock = if options.prefix.is_some() {
            Some(Lock::acquire(fs.clone(), &prefix, LockConfig::default())?)
        } else {
            None
        };

        let (store, root_ptr) = Store::open(fs, &prefix, options.max_segment_size)?;
        let zero = H::zero();

        let root = match root_ptr {
            None => Node::Nil,
            Some(ptr) => {
                let digest = root_digest_at::<H, F>(&store, ptr)?;
                Node::Hash(HashNode { digest, pointer: ptr })
            }
        };
        let digest = root.digest(&zero);

        let capacity_hint = if options.init_cache_size < 0 {
            FULL_SCAN_CACHE_CAPACITY
        } else {
            options.init_cache_size as usize
        };
        let capacity = NonZeroUsize::new(MIN_CACHE_CAPACITY.max(capacity_hint)).unwrap();
        let mut cache = RootCache::new(capacity);

        if options.init_cache_size != 0 {
            let limit = if options.init_cache_size < 0 {
                None
            } else {
                Some(options.init_cache_size as usize)
            };
            for ptr in store.historical_roots(limit)?.into_iter().flatten() {
                if let Ok(d) = root_digest_at::<H, F>(&store, ptr) {
                    cache.put(d.clone(), Node::Hash(HashNode { digest: d, pointer: ptr }));
                }
            }
        }
        cache.put(digest.clone(), root.clone());

        Ok(Self {
            store,
            options,
            lock,
            cache: Mutex::new(cache),
            state: Mutex::new(TreeState { digest, root }),
            tx_active: Mutex::new(false),
            _hasher: PhantomData,
        })
    }

    /// The digest of the tree's currently published root.
    pub fn root_digest(&self) -> Digest {
        self.state.lock().digest.clone()
    }

    /// Configured options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub(crate) fn store(&self) -> &Store<F> {
        &self.store
    }

    pub(crate) fn zero(&self) -> Digest {
        H::zero()
    }

    /// A read-only view of the currently published root.
    pub fn snapshot(&self) -> Snapshot<'_, H, F> {
        let state = self.state.lock();
        Snapshot::new(&self.store, state.root.clone(), state.digest.clone(), self.options.bits)
    }

    /// A read-only view of a historical root, served from the root cache.
    /// Fails with [`crate::Error`] if `cache_only` is set and the root
    /// isn't cached, or if the root cannot be located at all.
    pub fn snapshot_at(&self, root: &Digest) -> Result<Snapshot<'_, H, F>> {
        if let Some(node) = self.cache.lock().get(root) {
            return Ok(Snapshot::new(&self.store, node, root.clone(), self.options.bits));
        }

        if self.options.cache_only {
            return Err(crate::error::missing_node(root.clone(), root.clone(), &[], 0));
        }

        for ptr in self.store.historical_roots(None)?.into_iter().flatten() {
            if let Ok(d) = root_digest_at::<H, F>(&self.store, ptr) {
                if &d == root {
                    let node = Node::Hash(HashNode { digest: d.clone(), pointer: ptr });
                    self.cache.lock().put(d.clone(), node.clone());
                    return Ok(Snapshot::new(&self.store, node, d, self.options.bits));
                }
            }
        }

        Err(crate::error::missing_node(root.clone(), root.clone(), &[], 0))
    }

    /// Begins the tree's single live transaction (spec §4.1.6: "Only one
    /// transaction may be live at a time ... enforced by contract within
    /// a process"). Returns an error if one is already open.
    pub fn transaction(&self) -> Result<Transaction<'_, H, F>> {
        let mut active = self.tx_active.lock();
        if *active {
            return Err(crate::error::Error::TransactionActive);
        }
        *active = true;

        let state = self.state.lock();
        Ok(Transaction::new(self, state.root.clone()))
    }

    pub(crate) fn release_transaction(&self) {
        *self.tx_active.lock() = false;
    }

    /// Publishes a newly committed root, updating the current state and
    /// caching it for future snapshots.
    pub(crate) fn publish(&self, root: Node, digest: Digest) {
        self.cache.lock().put(digest.clone(), root.clone());
        *self.state.lock() = TreeState { digest, root };
    }
}

#[cfg(test)]
mod tests {
    use urkel_fs::MemoryFs;
    use urkel_hash::Blake3;

    use super::*;

    #[test]
    fn opens_empty_tree_at_zero_root() {
        let fs = MemoryFs::new();
        let opts = Options { bits: 256, ..Default::default() };
        let tree = Tree::<Blake3, _>::open(fs, opts).unwrap();
        assert_eq!(tree.root_digest(), Blake3::zero());
    }

    #[test]
    fn transaction_commit_publishes_and_reopen_sees_it() {
        let fs = MemoryFs::new();
        let opts = Options { bits: 256, prefix: Some("/store".to_string()), ..Default::default() };
        let tree = Tree::<Blake3, _>::open(fs.clone(), opts.clone()).unwrap();

        let key = [5u8; 32];
        {
            let mut tx = tree.transaction().unwrap();
            tx.insert(&key, b"v".to_vec()).unwrap();
            tx.commit().unwrap();
        }

        assert_ne!(tree.root_digest(), Blake3::zero());

        let tree2 = Tree::<Blake3, _>::open(fs, opts).unwrap();
        let snap = tree2.snapshot();
        assert_eq!(snap.get(&key).unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn second_concurrent_transaction_is_rejected() {
        let fs = MemoryFs::new();
        let opts = Options { bits: 256, ..Default::default() };
        let tree = Tree::<Blake3, _>::open(fs, opts).unwrap();

        let _tx1 = tree.transaction().unwrap();
        assert!(tree.transaction().is_err());
    }
}
