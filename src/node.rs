//! Node identity and convenience access to a chain
//!
//! A [`Node`] holds a human-readable name and an address derived from it
//! through the digest service. It wraps the engine's mining calls in a
//! bounded retry loop and offers read helpers over the ledger queries.

use crate::block::Block;
use crate::chain::Blockchain;
use crate::crypto::sha256_hex;
use crate::error::Result;
use tracing::debug;

/// Default number of mining retries per write.
pub const DEFAULT_RETRY_LIMIT: u32 = 20;

/// Per-write options for [`Node::write_data`].
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Number of full mining calls to attempt before giving up.
    pub retry_limit: u32,
    /// Worker threads per mining call; 1 selects the serial miner.
    pub workers: usize,
    /// Metadata tag stored on the mined block.
    pub meta_data: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            retry_limit: DEFAULT_RETRY_LIMIT,
            workers: num_cpus::get(),
            meta_data: String::new(),
        }
    }
}

/// A mining identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    node_name: String,
    node_address: String,
}

impl Node {
    /// Create a node; the address is the digest of the name.
    pub fn new(node_name: &str) -> Self {
        Self {
            node_name: node_name.to_string(),
            node_address: sha256_hex(node_name.as_bytes()),
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn node_address(&self) -> &str {
        &self.node_address
    }

    pub fn set_node_name(&mut self, node_name: &str) {
        self.node_name = node_name.to_string();
    }

    /// Override the derived address.
    pub fn set_node_address(&mut self, node_address: &str) {
        self.node_address = node_address.to_string();
    }

    /// Write a payload into the chain under this node's address.
    ///
    /// Each attempt is one full mining call (serial or concurrent per
    /// `options.workers`); attempts repeat up to `options.retry_limit`
    /// times. The loop carries its own counter, so concurrent writers
    /// cannot interfere with each other's budgets. Returns whether a block
    /// was committed.
    pub fn write_data(&self, chain: &mut Blockchain, data: &str, options: &WriteOptions) -> bool {
        for attempt in 0..options.retry_limit.max(1) {
            let mined = if options.workers <= 1 {
                chain.mine_block(data, &self.node_address, &options.meta_data)
            } else {
                chain.mine_block_concurrently(
                    data,
                    &self.node_address,
                    &options.meta_data,
                    options.workers,
                )
            };

            if mined.is_some() {
                return true;
            }
            debug!("write attempt {} found no solution", attempt + 1);
        }
        false
    }

    /// Payloads of the last `range` blocks, in ascending order.
    pub fn read_data_by_range(&self, chain: &Blockchain, range: usize) -> Result<Vec<String>> {
        let blocks = chain.blocks_by_range(range)?;
        Ok(blocks.iter().map(|b| b.data().to_string()).collect())
    }

    /// Payloads of all blocks carrying the given metadata tag.
    pub fn read_data_by_meta(&self, chain: &Blockchain, meta: &str) -> Result<Vec<String>> {
        let blocks = chain.blocks_by_meta(meta)?;
        Ok(blocks.iter().map(|b| b.data().to_string()).collect())
    }

    /// Blocks carrying the given metadata tag.
    pub fn get_blocks_by_meta<'a>(
        &self,
        chain: &'a Blockchain,
        meta: &str,
    ) -> Result<Vec<&'a Block>> {
        chain.blocks_by_meta(meta)
    }

    /// The block at the given ledger position.
    pub fn get_block_by_index<'a>(&self, chain: &'a Blockchain, index: usize) -> Result<&'a Block> {
        chain.block_by_index(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainConfig;
    use crate::error::ChainError;

    fn serial_write() -> WriteOptions {
        WriteOptions {
            workers: 1,
            ..WriteOptions::default()
        }
    }

    fn test_chain(node: &Node) -> Blockchain {
        Blockchain::new(ChainConfig {
            genesis_data: "genesis".to_string(),
            node_address: node.node_address().to_string(),
            ..ChainConfig::default()
        })
    }

    #[test]
    fn test_address_is_digest_of_name() {
        let node = Node::new("Tester");
        assert_eq!(node.node_name(), "Tester");
        assert_eq!(node.node_address(), sha256_hex(b"Tester"));
    }

    #[test]
    fn test_write_data_commits_a_block() {
        let node = Node::new("Tester");
        let mut chain = test_chain(&node);

        assert!(node.write_data(&mut chain, "written successfully", &serial_write()));

        let last = chain.last_block();
        assert_eq!(last.data(), "written successfully");
        assert_eq!(last.node_address(), node.node_address());
    }

    #[test]
    fn test_write_data_gives_up_after_retry_limit() {
        let node = Node::new("Tester");
        let mut chain = test_chain(&node);
        chain.set_difficulty(64);
        chain.set_try_limit(10);

        let options = WriteOptions {
            retry_limit: 2,
            ..serial_write()
        };

        assert!(!node.write_data(&mut chain, "never lands", &options));
        assert_eq!(chain.ledger_size(), 1);
    }

    #[test]
    fn test_read_data_by_range() {
        let node = Node::new("Tester");
        let mut chain = test_chain(&node);

        for i in 0..8 {
            assert!(node.write_data(&mut chain, &i.to_string(), &serial_write()));
        }

        let output = node.read_data_by_range(&chain, 5).unwrap();
        assert_eq!(output, vec!["3", "4", "5", "6", "7"]);
    }

    #[test]
    fn test_read_range_surfaces_out_of_bounds() {
        let node = Node::new("Tester");
        let chain = test_chain(&node);

        assert!(matches!(
            node.read_data_by_range(&chain, 50),
            Err(ChainError::RangeOutOfBounds { requested: 50, .. })
        ));
    }

    #[test]
    fn test_meta_queries() {
        let node = Node::new("Tester");
        let mut chain = test_chain(&node);

        let tagged = WriteOptions {
            meta_data: "invoice".to_string(),
            ..serial_write()
        };
        assert!(node.write_data(&mut chain, "first", &tagged));
        assert!(node.write_data(&mut chain, "second", &serial_write()));
        assert!(node.write_data(&mut chain, "third", &tagged));

        let payloads = node.read_data_by_meta(&chain, "invoice").unwrap();
        assert_eq!(payloads, vec!["first", "third"]);

        let blocks = node.get_blocks_by_meta(&chain, "invoice").unwrap();
        assert_eq!(blocks.len(), 2);

        assert!(matches!(
            node.read_data_by_meta(&chain, "missing"),
            Err(ChainError::MetaNotFound(_))
        ));
    }

    #[test]
    fn test_get_block_by_index() {
        let node = Node::new("Tester");
        let mut chain = test_chain(&node);
        assert!(node.write_data(&mut chain, "payload", &serial_write()));

        assert_eq!(node.get_block_by_index(&chain, 1).unwrap().data(), "payload");
        assert!(node.get_block_by_index(&chain, 9).is_err());
    }
}
