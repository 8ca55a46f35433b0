//! # powledger
//!
//! A minimal single-process proof-of-work ledger engine featuring:
//! - An append-only, hash-linked ledger of opaque content blocks
//! - A trailing-zero-bit proof-of-work puzzle
//! - Serial and racing multi-threaded mining
//! - Difficulty retargeting (raise on throughput, decay on idleness)
//! - Heaviest-chain consensus between two independently mined ledgers
//!
//! The engine is meant to be embedded in a host application that supplies
//! the data to store and a node identity that mines it. There is no
//! networking and no persistence; a block carries an opaque string payload,
//! not transactions.

// Core modules
pub mod block;
pub mod chain;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod node;
pub mod pow;

// Re-export commonly used types
pub use block::Block;
pub use chain::{Blockchain, ChainConfig};
pub use error::{ChainError, Result};
pub use ledger::Ledger;
pub use node::{Node, WriteOptions};

use std::time::Duration;

/// Difficulty assigned to a freshly constructed chain.
pub const INITIAL_DIFFICULTY: u64 = 1;

/// Step applied by each difficulty raise or decay.
pub const DIFFICULTY_STEP: u64 = 1;

/// Floor below which decay never pushes the difficulty.
pub const MIN_DIFFICULTY: u64 = 1;

/// Default nonce attempts per mining call.
pub const DEFAULT_TRY_LIMIT: u64 = 100_000;

/// Default number of successful mints between difficulty raises.
pub const DEFAULT_RAISE_THRESHOLD: u64 = 100;

/// Default idle interval after which difficulty decays.
pub const DEFAULT_DECAY_INTERVAL: Duration = Duration::from_secs(1800);

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(INITIAL_DIFFICULTY, 1);
        assert_eq!(DIFFICULTY_STEP, 1);
        assert!(MIN_DIFFICULTY >= 1);
        assert_eq!(DEFAULT_DECAY_INTERVAL, Duration::from_secs(1800));
    }

    #[test]
    fn test_defaults_are_mineable() {
        // The default budget must make difficulty-1 mining a near-certainty.
        assert!(DEFAULT_TRY_LIMIT >= 1_000);
        assert!(DEFAULT_RAISE_THRESHOLD > 0);
    }
}
