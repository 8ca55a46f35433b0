//! Proof-of-work puzzle functions
//!
//! The puzzle counts zero bits from the least-significant end of the
//! digest's binary expansion. Any monotone, hard-to-invert function of the
//! digest would do; what matters is that mining and verification agree on
//! this one.

use crate::block::Block;

/// Expand a hex digest into its binary representation, one zero-padded
/// 4-bit group per nibble. Non-hex characters contribute no bits.
pub fn hex_to_bits(digest: &str) -> String {
    digest
        .chars()
        .filter_map(|c| c.to_digit(16))
        .map(|v| format!("{:04b}", v))
        .collect()
}

/// Count zero bits from the least-significant end of the digest, up to the
/// first 1-bit or the start of the string.
pub fn trailing_zero_bits(digest: &str) -> u64 {
    let mut zeros = 0u64;
    for c in digest.chars().rev() {
        match c.to_digit(16) {
            Some(0) => zeros += 4,
            Some(v) => {
                zeros += u64::from(v.trailing_zeros());
                return zeros;
            }
            None => return zeros,
        }
    }
    zeros
}

/// True iff the digest satisfies the given difficulty.
pub fn satisfies_difficulty(digest: &str, difficulty: u64) -> bool {
    trailing_zero_bits(digest) >= difficulty
}

/// Check a block's stored hash against its stored difficulty.
///
/// The sole gate for "is this nonce a valid solution", shared by the mining
/// loops and by block verification.
pub fn verify_attempt(block: &Block) -> bool {
    satisfies_difficulty(block.block_hash(), block.difficulty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_bits_pads_nibbles() {
        assert_eq!(hex_to_bits("1"), "0001");
        assert_eq!(hex_to_bits("f0"), "11110000");
        assert_eq!(hex_to_bits("a5"), "10100101");
    }

    #[test]
    fn test_trailing_zero_bits() {
        assert_eq!(trailing_zero_bits("1"), 0);
        assert_eq!(trailing_zero_bits("2"), 1);
        assert_eq!(trailing_zero_bits("8"), 3);
        assert_eq!(trailing_zero_bits("10"), 4);
        assert_eq!(trailing_zero_bits("c00"), 10);
        assert_eq!(trailing_zero_bits("000"), 12);
    }

    #[test]
    fn test_counting_agrees_with_binary_expansion() {
        for digest in ["deadbeef", "c0ffee00", "1234", "8000"] {
            let bits = hex_to_bits(digest);
            let expected = bits.chars().rev().take_while(|&c| c == '0').count() as u64;
            assert_eq!(trailing_zero_bits(digest), expected, "digest {}", digest);
        }
    }

    #[test]
    fn test_satisfies_difficulty() {
        assert!(satisfies_difficulty("abc8", 3));
        assert!(!satisfies_difficulty("abc8", 4));
        // Difficulty zero accepts any digest.
        assert!(satisfies_difficulty("f", 0));
    }

    #[test]
    fn test_verify_attempt_on_searched_nonce() {
        let genesis = Block::genesis("g", "addr");

        let mut found = None;
        for nonce in 0..1024 {
            let candidate =
                Block::linked(&genesis, "data", "addr", nonce, 2, genesis.blockchain_id(), "");
            if verify_attempt(&candidate) {
                found = Some(candidate);
                break;
            }
        }

        let block = found.expect("a 2-bit solution exists within 1024 nonces");
        assert!(trailing_zero_bits(block.block_hash()) >= 2);
    }
}
