//! Proof verification (spec §4.3, §8 "Proof non-forgery").
//!
//! Verification folds the sibling path deepest-first: the witness leaf
//! (or NIL) digest is combined with the deepest sibling, then that result
//! with the next-shallowest sibling, and so on up to the root — the
//! reverse of the shallowest-first order the proof is transmitted in.

use urkel_hash::{internal_digest, leaf_digest, leaf_digest_from_value_digest, Hasher};
use urkel_types::{bit_at, Digest, ProofError};

use crate::{Proof, ProofKind};

/// Verifies `proof` for `key` against `root`.
///
/// Returns [`ProofError::Ok`] with `Some(value)` when the proof is an
/// `EXISTS` proof that folds to `root`; `Some` is never returned for
/// `DEAD_END`/`COLLISION` proofs, even when valid, since they witness
/// absence. Any other outcome carries `None`.
pub fn verify<H: Hasher>(root: &Digest, key: &[u8], proof: &Proof) -> (ProofError, Option<Vec<u8>>) {
    let (other_key, other_value_digest) = match &proof.kind {
        ProofKind::Collision {
            other_key,
            other_value_digest,
        } => (Some(other_key), Some(other_value_digest)),
        _ => (None, None),
    };

    if let Some(other_key) = other_key {
        if other_key.as_bytes() == key {
            return (ProofError::SameKey, None);
        }
    }

    let mut digest = match &proof.kind {
        ProofKind::Exists(value) => leaf_digest::<H>(key, value),
        ProofKind::DeadEnd => H::zero(),
        ProofKind::Collision { .. } => {
            leaf_digest_from_value_digest::<H>(other_key.unwrap().as_bytes(), other_value_digest.unwrap())
        }
    };

    for depth in (0..proof.siblings.len()).rev() {
        let sibling = proof.siblings[depth].clone().unwrap_or_else(H::zero);

        digest = if bit_at(key, depth) == 0 {
            internal_digest::<H>(&digest, &sibling)
        } else {
            internal_digest::<H>(&sibling, &digest)
        };
    }

    if &digest != root {
        return (ProofError::HashMismatch, None);
    }

    match &proof.kind {
        ProofKind::Exists(value) => (ProofError::Ok, Some(value.clone())),
        ProofKind::DeadEnd | ProofKind::Collision { .. } => (ProofError::Ok, None),
    }
}

#[cfg(test)]
mod tests {
    use urkel_hash::Blake3;
    use urkel_types::Digest;

    use super::*;

    fn internal(left: &Digest, right: &Digest) -> Digest {
        internal_digest::<Blake3>(left, right)
    }

    #[test]
    fn exists_proof_verifies_against_real_tree() {
        // A 2-bit-deep trie holding one key at path `10`, both siblings NIL.
        let key = [0b1000_0000u8];
        let value = b"v".to_vec();

        let root = root_for(&key, &value);
        let proof = Proof::new(vec![None, None], ProofKind::Exists(value.clone()));

        let (err, got) = verify::<Blake3>(&root, &key, &proof);
        assert_eq!(err, ProofError::Ok);
        assert_eq!(got, Some(value));
    }

    fn root_for(key: &[u8], value: &[u8]) -> Digest {
        let leaf = leaf_digest::<Blake3>(key, value);
        let mut digest = leaf;
        for depth in (0..2).rev() {
            let sibling = Blake3::zero();
            digest = if bit_at(key, depth) == 0 {
                internal(&digest, &sibling)
            } else {
                internal(&sibling, &digest)
            };
        }
        digest
    }

    #[test]
    fn dead_end_verifies_as_absence() {
        let key = [0b0000_0000u8];
        let root = Blake3::zero();
        let proof = Proof::new(vec![], ProofKind::DeadEnd);

        let (err, value) = verify::<Blake3>(&root, &key, &proof);
        assert_eq!(err, ProofError::Ok);
        assert_eq!(value, None);
    }

    #[test]
    fn collision_with_same_key_is_rejected() {
        let key = [0b1010_1010u8];
        let root = Blake3::zero();
        let proof = Proof::new(
            vec![],
            ProofKind::Collision {
                other_key: Digest::new(key.to_vec()),
                other_value_digest: Blake3::zero(),
            },
        );

        let (err, _) = verify::<Blake3>(&root, &key, &proof);
        assert_eq!(err, ProofError::SameKey);
    }

    #[test]
    fn wrong_root_is_hash_mismatch() {
        let key = [0b1000_0000u8];
        let value = b"v".to_vec();
        let proof = Proof::new(vec![None, None], ProofKind::Exists(value));

        let wrong_root = Digest::new(vec![0xffu8; 32]);
        let (err, _) = verify::<Blake3>(&wrong_root, &key, &proof);
        assert_eq!(err, ProofError::HashMismatch);
    }
}
