//! Digest primitives for the ledger engine
//!
//! Every hash in the system goes through [`sha256_hex`]: block hashes,
//! chain identifiers, and node addresses. Keeping one choke point means
//! mining and verification can never disagree on the digest function.

use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Calculate the SHA-256 digest of the input and return it as a
/// lowercase hex string.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Check that a string has the shape of a hex-encoded SHA-256 digest.
pub fn is_valid_digest(digest: &str) -> bool {
    digest.len() == DIGEST_HEX_LEN && digest.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_shape() {
        let digest = sha256_hex(b"hello world");
        assert_eq!(digest.len(), DIGEST_HEX_LEN);
        assert!(is_valid_digest(&digest));
    }

    #[test]
    fn test_digest_is_deterministic() {
        assert_eq!(sha256_hex(b"swift"), sha256_hex(b"swift"));
        assert_ne!(sha256_hex(b"swift"), sha256_hex(b"Swift"));
    }

    #[test]
    fn test_known_vector() {
        // SHA-256 of the empty string
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_is_valid_digest() {
        assert!(!is_valid_digest("abcd"));
        assert!(!is_valid_digest(&"z".repeat(DIGEST_HEX_LEN)));
        assert!(is_valid_digest(&"0".repeat(DIGEST_HEX_LEN)));
    }
}
