//! The proof wire format (spec §4.3).
//!
//! ```text
//! header   : u16 big-endian — top 2 bits are the type tag, low 14 bits
//!            are the sibling count N
//! bitmap   : ceil(N / 8) bytes — bit i set means sibling i is the
//!            all-zero digest and is omitted from the body entirely; a
//!            clear bit means sibling i is transmitted
//! siblings : H bytes each, for every bit clear in the bitmap, shallowest
//!            sibling first
//! payload  : type-specific (see below)
//! ```
//!
//! `EXISTS` payload is `u16` value length followed by the value bytes.
//! `DEAD_END` has no payload. `COLLISION` payload is the witness key
//! (`key_len_bytes` bytes) followed by `H` bytes of `H(value)`.
use urkel_types::{Digest, EncodingError, Error, Result};

use crate::{Proof, ProofKind};

const TAG_EXISTS: u16 = 0b00;
const TAG_DEAD_END: u16 = 0b01;
const TAG_COLLISION: u16 = 0b10;

const TAG_SHIFT: u32 = 14;
const COUNT_MASK: u16 = (1 << TAG_SHIFT) - 1;

fn encoding_error(offset: u64, reason: impl Into<String>) -> Error {
    Error::from(EncodingError::new(offset, reason))
}

/// Encodes a [`Proof`] to its wire form.
///
/// `hash_len` must equal the digest width of every sibling, and of the
/// collision witness's value digest where applicable.
pub fn encode(proof: &Proof, hash_len: usize) -> Vec<u8> {
    let count = proof.siblings.len() as u16;
    let tag = match &proof.kind {
        ProofKind::Exists(_) => TAG_EXISTS,
        ProofKind::DeadEnd => TAG_DEAD_END,
        ProofKind::Collision { .. } => TAG_COLLISION,
    };

    let header = (tag << TAG_SHIFT) | (count & COUNT_MASK);
    let bitmap_len = proof.siblings.len().div_ceil(8);

    let mut out = Vec::with_capacity(2 + bitmap_len + proof.siblings.len() * hash_len + 32);
    out.extend_from_slice(&header.to_be_bytes());

    let mut bitmap = vec![0u8; bitmap_len];
    for (i, sibling) in proof.siblings.iter().enumerate() {
        if sibling.is_none() {
            bitmap[i / 8] |= 1 << (7 - (i % 8));
        }
    }
    out.extend_from_slice(&bitmap);

    for sibling in proof.siblings.iter().flatten() {
        out.extend_from_slice(sibling.as_bytes());
    }

    match &proof.kind {
        ProofKind::Exists(value) => {
            out.extend_from_slice(&(value.len() as u16).to_be_bytes());
            out.extend_from_slice(value);
        }
        ProofKind::DeadEnd => {}
        ProofKind::Collision {
            other_key,
            other_value_digest,
        } => {
            out.extend_from_slice(other_key.as_bytes());
            out.extend_from_slice(other_value_digest.as_bytes());
        }
    }

    out
}

/// Decodes a [`Proof`] from its wire form.
///
/// `hash_len` is the digest width of the hasher the proof was produced
/// under; `key_len_bytes` is the trie's fixed key width, needed to size
/// the collision witness key.
pub fn decode(bytes: &[u8], hash_len: usize, key_len_bytes: usize) -> Result<Proof> {
    if bytes.len() < 2 {
        return Err(encoding_error(0, "proof shorter than header"));
    }

    let header = u16::from_be_bytes([bytes[0], bytes[1]]);
    let tag = header >> TAG_SHIFT;
    let count = (header & COUNT_MASK) as usize;

    let mut cursor = 2usize;
    let bitmap_len = count.div_ceil(8);

    let bitmap = bytes
        .get(cursor..cursor + bitmap_len)
        .ok_or_else(|| encoding_error(cursor as u64, "proof truncated in bitmap"))?;
    cursor += bitmap_len;

    let mut siblings = Vec::with_capacity(count);
    for i in 0..count {
        let is_zero = bitmap[i / 8] & (1 << (7 - (i % 8))) != 0;

        if is_zero {
            siblings.push(None);
        } else {
            let sib = bytes
                .get(cursor..cursor + hash_len)
                .ok_or_else(|| encoding_error(cursor as u64, "proof truncated in siblings"))?;
            siblings.push(Some(Digest::new(sib.to_vec())));
            cursor += hash_len;
        }
    }

    let kind = match tag {
        TAG_EXISTS => {
            let len_bytes = bytes
                .get(cursor..cursor + 2)
                .ok_or_else(|| encoding_error(cursor as u64, "proof truncated in value length"))?;
            let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
            cursor += 2;

            let value = bytes
                .get(cursor..cursor + len)
                .ok_or_else(|| encoding_error(cursor as u64, "proof truncated in value"))?;

            ProofKind::Exists(value.to_vec())
        }
        TAG_DEAD_END => ProofKind::DeadEnd,
        TAG_COLLISION => {
            let key = bytes
                .get(cursor..cursor + key_len_bytes)
                .ok_or_else(|| encoding_error(cursor as u64, "proof truncated in witness key"))?;
            cursor += key_len_bytes;

            let value_digest = bytes
                .get(cursor..cursor + hash_len)
                .ok_or_else(|| {
                    encoding_error(cursor as u64, "proof truncated in witness value digest")
                })?;

            ProofKind::Collision {
                other_key: Digest::new(key.to_vec()),
                other_value_digest: Digest::new(value_digest.to_vec()),
            }
        }
        other => return Err(encoding_error(0, format!("unknown proof tag {other}"))),
    };

    Ok(Proof::new(siblings, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sib(byte: u8) -> Option<Digest> {
        Some(Digest::new(vec![byte; 32]))
    }

    #[test]
    fn round_trips_exists() {
        let proof = Proof::new(
            vec![sib(1), None, sib(3)],
            ProofKind::Exists(b"hello".to_vec()),
        );

        let bytes = encode(&proof, 32);
        let decoded = decode(&bytes, 32, 20).unwrap();

        assert_eq!(decoded, proof);
    }

    #[test]
    fn round_trips_dead_end() {
        let proof = Proof::new(vec![None, None, sib(9)], ProofKind::DeadEnd);
        let bytes = encode(&proof, 32);
        assert_eq!(decode(&bytes, 32, 20).unwrap(), proof);
    }

    #[test]
    fn round_trips_collision() {
        let proof = Proof::new(
            vec![sib(1), sib(2)],
            ProofKind::Collision {
                other_key: Digest::new(vec![7u8; 20]),
                other_value_digest: Digest::new(vec![8u8; 32]),
            },
        );

        let bytes = encode(&proof, 32);
        assert_eq!(decode(&bytes, 32, 20).unwrap(), proof);
    }

    #[test]
    fn rejects_truncated_header() {
        assert!(decode(&[0u8], 32, 20).is_err());
    }

    #[test]
    fn zero_siblings_elide_body() {
        let proof = Proof::new(vec![None, None, None, None], ProofKind::DeadEnd);
        let bytes = encode(&proof, 32);
        assert_eq!(bytes.len(), 2 + 1);
    }
}
