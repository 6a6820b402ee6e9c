//! Hashing primitives: a stable `urlhash`, the exact-content `exhash`, and the
//! similarity `smhash` (SimHash).
//!
//! These are treated as the exact-hashing/similarity-hashing external
//! collaborators in the design this crate follows, but are implemented here
//! concretely so the crate runs end to end.

use std::collections::HashMap;
use std::hash::Hasher;
use twox_hash::xxh3::Hash64;

use crc::{Crc, CRC_32_ISO_HDLC, CRC_64_XZ};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);
const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_XZ);

/// A stable hash over a normalized URL string, used as the key for [`Nurl`](crate::nurl::Nurl)
/// records in the [`Nap`](crate::nap::Nap).
pub fn urlhash(normalized_url: &str) -> String {
    let mut hasher = Hash64::default();
    hasher.write(normalized_url.as_bytes());
    format!("{:016x}", hasher.finish())
}

/// Exact content hash: CRC32(body) in little-endian ‖ size(body) in
/// little-endian, hex-encoded. Collisions are possible; followers are
/// compared against a master hash, not deduplicated by exhash alone, at the
/// granularity the worker pipeline already operates on.
pub fn exhash(body: &[u8]) -> String {
    let crc = CRC32.checksum(body);
    let size = body.len() as u32;
    let mut bytes = [0u8; 8];
    bytes[0..4].copy_from_slice(&crc.to_le_bytes());
    bytes[4..8].copy_from_slice(&size.to_le_bytes());
    hex::encode(bytes)
}

/// Folds a token's CRC64/XZ checksum down to a 32-bit fingerprint by XORing
/// its high and low halves.
fn token_fingerprint(token: &str) -> u32 {
    let crc = CRC64.checksum(token.as_bytes());
    ((crc >> 32) as u32) ^ (crc as u32)
}

/// SimHash fingerprint over a token→count mapping: 32 signed accumulators,
/// each token's folded 32-bit fingerprint contributes `+count` to bits that
/// are set and `-count` to bits that are clear; the final bit is 1 iff its
/// accumulator is positive.
pub fn smhash(words: &HashMap<String, u32>) -> u32 {
    let mut acc = [0i64; 32];
    for (token, count) in words {
        let fp = token_fingerprint(token);
        let count = *count as i64;
        for (bit, slot) in acc.iter_mut().enumerate() {
            if fp & (1 << bit) != 0 {
                *slot += count;
            } else {
                *slot -= count;
            }
        }
    }
    let mut fingerprint = 0u32;
    for (bit, slot) in acc.iter().enumerate() {
        if *slot > 0 {
            fingerprint |= 1 << bit;
        }
    }
    fingerprint
}

/// Number of differing bits between two fingerprints.
pub fn hamming_distance(a: u32, b: u32) -> u32 {
    (a ^ b).count_ones()
}

/// Tiny hex-encoding shim so we don't pull in the `hex` crate for eight bytes.
mod hex {
    pub fn encode(bytes: [u8; 8]) -> String {
        let mut s = String::with_capacity(16);
        for b in bytes {
            s.push_str(&format!("{:02x}", b));
        }
        s
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn urlhash_is_stable() {
        assert_eq!(urlhash("https://a.edu/"), urlhash("https://a.edu/"));
        assert_ne!(urlhash("https://a.edu/"), urlhash("https://b.edu/"));
    }

    #[test]
    fn exhash_matches_len_and_is_16_hex_chars() {
        let h = exhash(b"hello world");
        assert_eq!(h.len(), 16);
    }

    #[test]
    fn identical_bodies_hash_identically() {
        assert_eq!(exhash(b"same bytes"), exhash(b"same bytes"));
        assert_ne!(exhash(b"same bytes"), exhash(b"different bytes!"));
    }

    #[test]
    fn near_identical_word_counts_are_close_in_hamming_distance() {
        let mut a = HashMap::new();
        a.insert("the".to_string(), 10);
        a.insert("quick".to_string(), 3);
        a.insert("fox".to_string(), 2);

        let mut b = a.clone();
        b.insert("dog".to_string(), 1);

        let fa = smhash(&a);
        let fb = smhash(&b);
        assert!(hamming_distance(fa, fb) <= 5);
    }

    #[test]
    fn very_different_documents_are_far_in_hamming_distance() {
        let mut a = HashMap::new();
        a.insert("alpha".to_string(), 50);
        a.insert("beta".to_string(), 40);

        let mut b = HashMap::new();
        b.insert("zeta".to_string(), 50);
        b.insert("omega".to_string(), 40);

        let fa = smhash(&a);
        let fb = smhash(&b);
        assert!(hamming_distance(fa, fb) > 5);
    }
}
