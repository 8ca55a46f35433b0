//! Error types for the ledger engine

use thiserror::Error;

/// Main error type for chain operations.
///
/// Mining exhaustion is deliberately not represented here: running out of
/// attempts is a normal outcome and is reported as `None` by the mining
/// calls. Errors cover caller misuse of queries and structural invalidity
/// found during verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("block hash mismatch: stored {stored}, computed {computed}")]
    HashMismatch { stored: String, computed: String },

    #[error("broken chain link: expected previous hash {expected}, block stores {found}")]
    BrokenLink { expected: String, found: String },

    #[error("unmet difficulty: hash has {zeros} trailing zero bits, {required} required")]
    UnmetDifficulty { zeros: u64, required: u64 },

    #[error("requested range {requested} exceeds ledger size {size}")]
    RangeOutOfBounds { requested: usize, size: usize },

    #[error("requested index {index} exceeds ledger size {size}")]
    IndexOutOfBounds { index: usize, size: usize },

    #[error("no block in ledger carries meta tag {0:?}")]
    MetaNotFound(String),
}

/// Result type alias for chain operations
pub type Result<T> = std::result::Result<T, ChainError>;
