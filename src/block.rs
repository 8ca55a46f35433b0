//! Block implementation for the hash-linked ledger

use crate::crypto::sha256_hex;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Previous-hash sentinel carried by a genesis block.
pub const GENESIS_PREV_HASH: &str = "";

/// Nonce sentinel for genesis blocks, outside the mined nonce space.
pub const GENESIS_NONCE: i64 = -1;

/// Difficulty sentinel for genesis blocks; never checked by verification.
pub const GENESIS_DIFFICULTY: u64 = 0;

/// A single entry of the ledger.
///
/// The block hash is computed exactly once, at construction, from the
/// fields present at that moment. The administrative setters below mutate
/// fields without recomputing it: a caller who uses them on a block that is
/// part of a ledger must re-verify (or re-mint) if chain integrity matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    block_id: u64,
    nonce: i64,
    difficulty: u64,
    node_address: String,
    timestamp: String,
    data: String,
    meta_data: String,
    block_hash: String,
    prev_hash: String,
    blockchain_id: String,
}

impl Block {
    /// Create a genesis block from a payload and a miner address.
    ///
    /// Sequence id, nonce, difficulty and previous hash take their fixed
    /// sentinel values; the chain identifier is the genesis block's own
    /// hash, inherited by every block linked after it.
    pub fn genesis(data: &str, node_address: &str) -> Self {
        let timestamp = make_timestamp();
        let block_hash = hash_fields(
            0,
            GENESIS_NONCE,
            GENESIS_DIFFICULTY,
            node_address,
            &timestamp,
            data,
            GENESIS_PREV_HASH,
        );
        let blockchain_id = block_hash.clone();

        Self {
            block_id: 0,
            nonce: GENESIS_NONCE,
            difficulty: GENESIS_DIFFICULTY,
            node_address: node_address.to_string(),
            timestamp,
            data: data.to_string(),
            meta_data: String::new(),
            block_hash,
            prev_hash: GENESIS_PREV_HASH.to_string(),
            blockchain_id,
        }
    }

    /// Create a block linked to `prev`, carrying a candidate nonce.
    ///
    /// The sequence id and previous hash are taken from `prev`; whether the
    /// resulting hash actually satisfies `difficulty` is the proof-of-work
    /// engine's call, not this constructor's.
    pub fn linked(
        prev: &Block,
        data: &str,
        node_address: &str,
        nonce: i64,
        difficulty: u64,
        blockchain_id: &str,
        meta_data: &str,
    ) -> Self {
        let block_id = prev.block_id + 1;
        let timestamp = make_timestamp();
        let block_hash = hash_fields(
            block_id,
            nonce,
            difficulty,
            node_address,
            &timestamp,
            data,
            &prev.block_hash,
        );

        Self {
            block_id,
            nonce,
            difficulty,
            node_address: node_address.to_string(),
            timestamp,
            data: data.to_string(),
            meta_data: meta_data.to_string(),
            block_hash,
            prev_hash: prev.block_hash.clone(),
            blockchain_id: blockchain_id.to_string(),
        }
    }

    /// Recompute the hash from the block's current fields.
    ///
    /// Pure function of the stored fields; agrees bit-for-bit with the hash
    /// computed at construction as long as no field was mutated since.
    pub fn recompute_hash(&self) -> String {
        hash_fields(
            self.block_id,
            self.nonce,
            self.difficulty,
            &self.node_address,
            &self.timestamp,
            &self.data,
            &self.prev_hash,
        )
    }

    /// Whether this block carries the genesis sentinels.
    pub fn is_genesis(&self) -> bool {
        self.block_id == 0 && self.prev_hash == GENESIS_PREV_HASH
    }

    pub fn block_id(&self) -> u64 {
        self.block_id
    }

    pub fn nonce(&self) -> i64 {
        self.nonce
    }

    pub fn difficulty(&self) -> u64 {
        self.difficulty
    }

    pub fn node_address(&self) -> &str {
        &self.node_address
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn meta_data(&self) -> &str {
        &self.meta_data
    }

    pub fn block_hash(&self) -> &str {
        &self.block_hash
    }

    pub fn prev_hash(&self) -> &str {
        &self.prev_hash
    }

    pub fn blockchain_id(&self) -> &str {
        &self.blockchain_id
    }

    /// Set the miner address. Does not recompute the stored hash.
    pub fn set_node_address(&mut self, node_address: &str) {
        self.node_address = node_address.to_string();
    }

    /// Set the payload. Does not recompute the stored hash.
    pub fn set_data(&mut self, data: &str) {
        self.data = data.to_string();
    }

    /// Set the metadata tag. Does not recompute the stored hash.
    pub fn set_meta_data(&mut self, meta_data: &str) {
        self.meta_data = meta_data.to_string();
    }

    /// Set the sequence id. Does not recompute the stored hash.
    pub fn set_block_id(&mut self, block_id: u64) {
        self.block_id = block_id;
    }

    /// Set the chain identifier. Does not recompute the stored hash.
    pub fn set_blockchain_id(&mut self, blockchain_id: &str) {
        self.blockchain_id = blockchain_id.to_string();
    }
}

/// Hash of the block field tuple, through the digest service.
///
/// The preimage joins the fields with `:` in a fixed order so that
/// independent re-verification reproduces the same digest.
fn hash_fields(
    block_id: u64,
    nonce: i64,
    difficulty: u64,
    node_address: &str,
    timestamp: &str,
    data: &str,
    prev_hash: &str,
) -> String {
    let preimage = format!(
        "{}:{}:{}:{}:{}:{}:{}",
        block_id, nonce, difficulty, node_address, timestamp, data, prev_hash
    );
    sha256_hex(preimage.as_bytes())
}

/// Creation timestamp, human-readable UTC.
fn make_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string()
}
