//! Round-trip and non-forgery properties (spec §8).

use proptest::prelude::*;
use urkel_hash::{internal_digest, leaf_digest, Blake3, Hasher};
use urkel_proof::{decode, encode, verify, Proof, ProofKind};
use urkel_types::{bit_at, Digest, ProofError};

const KEY_BITS: usize = 8;

fn root_for_single_key(key: &[u8], value: &[u8]) -> Digest {
    let mut digest = leaf_digest::<Blake3>(key, value);
    for depth in (0..KEY_BITS).rev() {
        let sibling = Blake3::zero();
        digest = if bit_at(key, depth) == 0 {
            internal_digest::<Blake3>(&digest, &sibling)
        } else {
            internal_digest::<Blake3>(&sibling, &digest)
        };
    }
    digest
}

proptest! {
    #[test]
    fn wire_round_trip_exists(key_byte: u8, value in proptest::collection::vec(any::<u8>(), 0..64)) {
        let key = [key_byte];
        let root = root_for_single_key(&key, &value);
        let proof = Proof::new(vec![None; KEY_BITS], ProofKind::Exists(value.clone()));

        let bytes = encode(&proof, 32);
        let decoded = decode(&bytes, 32, 1).unwrap();
        prop_assert_eq!(&decoded, &proof);

        let (err, got) = verify::<Blake3>(&root, &key, &decoded);
        prop_assert_eq!(err, ProofError::Ok);
        prop_assert_eq!(got, Some(value));
    }

    #[test]
    fn tampering_with_a_sibling_is_detected(key_byte: u8, value in proptest::collection::vec(any::<u8>(), 1..64), flip_index in 0..KEY_BITS) {
        let key = [key_byte];
        let root = root_for_single_key(&key, &value);

        let mut siblings = vec![None; KEY_BITS];
        siblings[flip_index] = Some(Digest::new(vec![0xAB; 32]));
        let forged = Proof::new(siblings, ProofKind::Exists(value));

        let (err, got) = verify::<Blake3>(&root, &key, &forged);
        prop_assert_eq!(err, ProofError::HashMismatch);
        prop_assert_eq!(got, None);
    }

    #[test]
    fn tampering_with_the_value_is_detected(key_byte: u8, value in proptest::collection::vec(any::<u8>(), 1..64)) {
        let key = [key_byte];
        let root = root_for_single_key(&key, &value);

        let mut forged_value = value.clone();
        forged_value.push(0);
        let forged = Proof::new(vec![None; KEY_BITS], ProofKind::Exists(forged_value));

        let (err, _) = verify::<Blake3>(&root, &key, &forged);
        prop_assert_eq!(err, ProofError::HashMismatch);
    }
}
