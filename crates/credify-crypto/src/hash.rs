//! Hash functions for Credify
//!
//! SHA-256 everywhere: leaves, interior nodes, derived addresses and
//! content identifiers.

use sha2::{Digest, Sha256};

/// Compute SHA-256
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute SHA-256 over several byte slices
pub fn sha256_multi(data: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for d in data {
        hasher.update(d);
    }
    hasher.finalize().into()
}

/// Hash `left || right`
pub fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    sha256_multi(&[&left[..], &right[..]])
}

/// Hash two nodes with the byte-wise smaller one on the left.
///
/// Equal nodes keep `a` on the left.
pub fn hash_sorted_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    if a <= b {
        hash_pair(a, b)
    } else {
        hash_pair(b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_multi_matches_concatenation() {
        assert_eq!(sha256_multi(&[&b"ab"[..], &b"c"[..]]), sha256(b"abc"));
    }

    #[test]
    fn test_sorted_pair_is_symmetric() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_eq!(hash_sorted_pair(&a, &b), hash_sorted_pair(&b, &a));
        assert_eq!(hash_sorted_pair(&b, &a), hash_pair(&a, &b));
        assert_ne!(hash_sorted_pair(&a, &b), hash_pair(&b, &a));
    }
}
