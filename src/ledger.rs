//! Ordered, hash-indexed block storage

use crate::block::Block;
use crate::error::{ChainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The ordered collection of blocks forming one chain of custody.
///
/// Two views over one owned collection: an insertion-ordered sequence for
/// position and range queries, and a hash-to-position map for O(1) lookup.
/// Both are updated together at the single append point. Position 0 is
/// always the genesis block; the ledger grows only by append and is only
/// ever replaced wholesale by consensus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    blocks: Vec<Block>,
    index: HashMap<String, usize>,
}

impl Ledger {
    /// Create a ledger holding the given genesis block at position 0.
    pub fn new(genesis: Block) -> Self {
        let mut ledger = Self {
            blocks: Vec::new(),
            index: HashMap::new(),
        };
        ledger.append(genesis);
        ledger
    }

    /// Append a block, updating both views.
    pub fn append(&mut self, block: Block) {
        self.index
            .insert(block.block_hash().to_string(), self.blocks.len());
        self.blocks.push(block);
    }

    /// Number of blocks in the ledger, genesis included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The genesis block.
    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    /// The most recently appended block.
    pub fn last(&self) -> &Block {
        // A ledger is constructed around its genesis block and never shrinks.
        self.blocks
            .last()
            .expect("ledger holds at least the genesis block")
    }

    /// Look up a block by its hash.
    pub fn get(&self, block_hash: &str) -> Option<&Block> {
        self.index.get(block_hash).map(|&pos| &self.blocks[pos])
    }

    /// Whether a block with the given hash is present.
    pub fn contains(&self, block_hash: &str) -> bool {
        self.index.contains_key(block_hash)
    }

    /// The block at the given position.
    pub fn by_index(&self, index: usize) -> Result<&Block> {
        self.blocks
            .get(index)
            .ok_or(ChainError::IndexOutOfBounds {
                index,
                size: self.blocks.len(),
            })
    }

    /// The last `range` blocks, in ascending sequence order.
    pub fn by_range(&self, range: usize) -> Result<&[Block]> {
        if range > self.blocks.len() {
            return Err(ChainError::RangeOutOfBounds {
                requested: range,
                size: self.blocks.len(),
            });
        }
        Ok(&self.blocks[self.blocks.len() - range..])
    }

    /// All blocks carrying the given metadata tag, in sequence order.
    pub fn by_meta(&self, meta: &str) -> Result<Vec<&Block>> {
        let matches: Vec<&Block> = self
            .blocks
            .iter()
            .filter(|block| block.meta_data() == meta)
            .collect();

        if matches.is_empty() {
            return Err(ChainError::MetaNotFound(meta.to_string()));
        }
        Ok(matches)
    }

    /// All blocks in sequence order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Cumulative proof-of-work score: saturating sum of `2^difficulty`
    /// over every block. The exponential weighting makes a chain whose
    /// difficulty climbed faster outweigh a longer but easier one.
    pub fn cumulative_work(&self) -> u128 {
        self.blocks
            .iter()
            .map(|block| work_of(block.difficulty()))
            .fold(0u128, u128::saturating_add)
    }
}

fn work_of(difficulty: u64) -> u128 {
    if difficulty >= 127 {
        u128::MAX
    } else {
        1u128 << difficulty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with(payloads: &[&str]) -> Ledger {
        let genesis = Block::genesis("genesis", "addrA");
        let chain_id = genesis.blockchain_id().to_string();
        let mut ledger = Ledger::new(genesis);

        for payload in payloads {
            let block = Block::linked(ledger.last(), payload, "addrA", 0, 1, &chain_id, "");
            ledger.append(block);
        }
        ledger
    }

    #[test]
    fn test_append_updates_both_views() {
        let ledger = ledger_with(&["a", "b"]);

        assert_eq!(ledger.len(), 3);
        let tip_hash = ledger.last().block_hash().to_string();
        assert!(ledger.contains(&tip_hash));
        assert_eq!(ledger.get(&tip_hash).unwrap().data(), "b");
        assert_eq!(ledger.by_index(2).unwrap().block_hash(), tip_hash);
    }

    #[test]
    fn test_genesis_at_position_zero() {
        let ledger = ledger_with(&["a"]);
        assert!(ledger.genesis().is_genesis());
        assert_eq!(ledger.by_index(0).unwrap().data(), "genesis");
    }

    #[test]
    fn test_links_hold_across_appends() {
        let ledger = ledger_with(&["a", "b", "c"]);
        for i in 1..ledger.len() {
            assert_eq!(
                ledger.blocks()[i].prev_hash(),
                ledger.blocks()[i - 1].block_hash()
            );
        }
    }

    #[test]
    fn test_by_range_returns_last_n_ascending() {
        let ledger = ledger_with(&["a", "b", "c", "d"]);
        let tail = ledger.by_range(2).unwrap();

        let payloads: Vec<&str> = tail.iter().map(|b| b.data()).collect();
        assert_eq!(payloads, vec!["c", "d"]);
    }

    #[test]
    fn test_by_range_rejects_oversized_request() {
        let ledger = ledger_with(&["a"]);
        let err = ledger.by_range(10).unwrap_err();
        assert_eq!(
            err,
            ChainError::RangeOutOfBounds {
                requested: 10,
                size: 2
            }
        );
    }

    #[test]
    fn test_by_index_rejects_out_of_bounds() {
        let ledger = ledger_with(&[]);
        assert!(matches!(
            ledger.by_index(5),
            Err(ChainError::IndexOutOfBounds { index: 5, size: 1 })
        ));
    }

    #[test]
    fn test_by_meta_not_found() {
        let ledger = ledger_with(&["a"]);
        assert_eq!(
            ledger.by_meta("missing").unwrap_err(),
            ChainError::MetaNotFound("missing".to_string())
        );
    }

    #[test]
    fn test_by_meta_finds_tagged_blocks() {
        let genesis = Block::genesis("genesis", "addrA");
        let chain_id = genesis.blockchain_id().to_string();
        let mut ledger = Ledger::new(genesis);
        let tagged = Block::linked(ledger.last(), "a", "addrA", 0, 1, &chain_id, "invoice");
        ledger.append(tagged);
        let untagged = Block::linked(ledger.last(), "b", "addrA", 0, 1, &chain_id, "");
        ledger.append(untagged);

        let found = ledger.by_meta("invoice").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].data(), "a");
    }

    #[test]
    fn test_cumulative_work_weights_difficulty_exponentially() {
        // Genesis contributes 2^0 = 1.
        let ledger = ledger_with(&["a", "b"]); // two blocks at difficulty 1
        assert_eq!(ledger.cumulative_work(), 1 + 2 + 2);

        // A single difficulty-3 block outweighs both difficulty-1 blocks.
        assert!(work_of(3) > 2 * work_of(1));
    }

    #[test]
    fn test_work_saturates() {
        assert_eq!(work_of(127), u128::MAX);
        assert_eq!(work_of(200), u128::MAX);
    }
}
