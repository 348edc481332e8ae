//! The root cache (spec §4.2.5): a bounded map from historical root
//! digest to its resident subtree head, so a snapshot opened against a
//! recently committed root can skip the disk round trip entirely.

use std::num::NonZeroUsize;

use lru::LruCache;
use urkel_types::Digest;

use crate::node::Node;

/// A bounded LRU of root digest → resident subtree head.
pub struct RootCache {
    entries: LruCache<Digest, Node>,
}

impl RootCache {
    /// Builds an empty cache with room for `capacity` roots.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Looks up a cached root, promoting it to most-recently-used.
    pub fn get(&mut self, root: &Digest) -> Option<Node> {
        self.entries.get(root).cloned()
    }

    /// `true` if `root` is currently cached, without affecting recency.
    pub fn contains(&self, root: &Digest) -> bool {
        self.entries.contains(root)
    }

    /// Inserts or refreshes a cached root.
    pub fn put(&mut self, root: Digest, node: Node) {
        self.entries.put(root, node);
    }

    /// Number of roots currently cached.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the cache holds no roots.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
