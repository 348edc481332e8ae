//! Lazy (key, value) iteration over a committed root (spec §4.1.5): a
//! worklist of pending nodes, expanded left-first, with `Hash` frames
//! resolved on demand. Iteration order is bitwise, not sorted user-key
//! order (spec §4.1.5, §1 Non-goals).

use std::marker::PhantomData;

use urkel_fs::FileSystem;
use urkel_hash::Hasher;
use urkel_store::Store;

use crate::node::Node;
use crate::resolver::{resolve, resolve_value};
use crate::Result;

/// A lazy, depth-first iterator over every (key, value) pair reachable
/// from a root.
pub struct Iter<'a, H: Hasher, F: FileSystem> {
    store: &'a Store<F>,
    stack: Vec<Node>,
    _hasher: PhantomData<H>,
}

impl<'a, H: Hasher, F: FileSystem> Iter<'a, H, F> {
    pub(crate) fn new(store: &'a Store<F>, root: Node) -> Self {
        Self {
            store,
            stack: vec![root],
            _hasher: PhantomData,
        }
    }
}

impl<'a, H: Hasher, F: FileSystem> Iterator for Iter<'a, H, F> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = self.stack.pop()?;
            let node = match resolve::<H, F>(self.store, node) {
                Ok(n) => n,
                Err(e) => return Some(Err(e)),
            };

            match node {
                Node::Nil => continue,
                Node::Internal(internal) => {
                    self.stack.push(internal.right);
                    self.stack.push(internal.left);
                    continue;
                }
                Node::Leaf(leaf) => {
                    let value = match resolve_value(self.store, &leaf) {
                        Ok(v) => v,
                        Err(e) => return Some(Err(e)),
                    };
                    return Some(Ok((leaf.key, value)));
                }
                Node::Hash(_) => unreachable!("resolve always decodes Hash placeholders"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use urkel_fs::MemoryFs;
    use urkel_hash::Blake3;

    use super::*;
    use crate::engine::insert;

    #[test]
    fn visits_every_key_left_first() {
        let fs = MemoryFs::new();
        let (store, _) = Store::open(fs, "/store", 1 << 20).unwrap();

        let mut root = Node::Nil;
        let keys = [[0x00u8; 2], [0x40u8; 2], [0x80u8; 2], [0xC0u8; 2]];
        for (i, k) in keys.iter().enumerate() {
            root = insert::<Blake3, _>(&store, root, k, vec![i as u8], 16).unwrap();
        }

        let iter = Iter::<Blake3, _>::new(&store, root);
        let collected: Vec<_> = iter.map(|r| r.unwrap()).collect();

        let mut observed_keys: Vec<_> = collected.iter().map(|(k, _)| k.clone()).collect();
        let mut expected_keys: Vec<_> = keys.iter().map(|k| k.to_vec()).collect();
        observed_keys.sort();
        expected_keys.sort();
        assert_eq!(observed_keys, expected_keys);
        assert_eq!(collected.len(), 4);
    }
}
