//! The mining and consensus engine
//!
//! [`Blockchain`] owns one [`Ledger`] plus the mutable difficulty state and
//! exposes serial mining, concurrent racing mining, block and ledger
//! verification, difficulty retargeting and the heaviest-chain consensus
//! rule. All ledger mutation happens at the single commit point after a
//! successful mine, or wholesale through consensus adoption.

use crate::block::{Block, GENESIS_PREV_HASH};
use crate::error::{ChainError, Result};
use crate::ledger::Ledger;
use crate::pow;
use crate::{
    DEFAULT_DECAY_INTERVAL, DEFAULT_RAISE_THRESHOLD, DEFAULT_TRY_LIMIT, DIFFICULTY_STEP,
    INITIAL_DIFFICULTY, MIN_DIFFICULTY,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Construction parameters for a chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Maximum nonce attempts per mining call.
    pub try_limit: u64,
    /// Number of successful mints after which difficulty is raised.
    pub raise_threshold: u64,
    /// Idle interval after which difficulty decays.
    pub decay_interval: Duration,
    /// Address credited with the genesis block.
    pub node_address: String,
    /// Payload stored in the genesis block.
    pub genesis_data: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            try_limit: DEFAULT_TRY_LIMIT,
            raise_threshold: DEFAULT_RAISE_THRESHOLD,
            decay_interval: DEFAULT_DECAY_INTERVAL,
            node_address: "unset".to_string(),
            genesis_data: String::new(),
        }
    }
}

/// A single logical chain: ledger, difficulty state and mining entry points.
///
/// Mining calls against one instance are expected to be serialized by the
/// caller; the engine does not arbitrate two simultaneous calls against the
/// same tip.
#[derive(Debug, Clone)]
pub struct Blockchain {
    ledger: Ledger,
    difficulty: u64,
    raise_threshold: u64,
    try_limit: u64,
    decay_interval: Duration,
    /// Successful mints since the last difficulty raise.
    mints_since_raise: u64,
    /// Instant of the last successful mint (or construction), the decay
    /// trigger's reference point.
    last_mint: Instant,
    blockchain_id: String,
}

impl Blockchain {
    /// Create a chain with an auto-generated genesis block at position 0.
    ///
    /// The chain identifier is the genesis block's hash.
    pub fn new(config: ChainConfig) -> Self {
        let genesis = Block::genesis(&config.genesis_data, &config.node_address);
        let blockchain_id = genesis.blockchain_id().to_string();

        info!("created chain {} with genesis block", blockchain_id);

        Self {
            ledger: Ledger::new(genesis),
            difficulty: INITIAL_DIFFICULTY,
            raise_threshold: config.raise_threshold,
            try_limit: config.try_limit,
            decay_interval: config.decay_interval,
            mints_since_raise: 0,
            last_mint: Instant::now(),
            blockchain_id,
        }
    }

    /// Mine a block on the calling thread.
    ///
    /// Searches nonces `0..try_limit` against the current tip and current
    /// difficulty, constructing a candidate block per attempt. The first
    /// satisfying candidate is appended and returned. Exhausting the
    /// attempt budget is a normal outcome reported as `None`; the caller
    /// may retry, raise the budget, or give up.
    pub fn mine_block(&mut self, data: &str, node_address: &str, meta_data: &str) -> Option<Block> {
        for nonce in 0..self.try_limit as i64 {
            let candidate = Block::linked(
                self.ledger.last(),
                data,
                node_address,
                nonce,
                self.difficulty,
                &self.blockchain_id,
                meta_data,
            );
            if pow::verify_attempt(&candidate) {
                return Some(self.commit(candidate));
            }
        }

        debug!(
            "serial mining exhausted {} attempts at difficulty {}",
            self.try_limit, self.difficulty
        );
        None
    }

    /// Mine a block with `workers` racing threads.
    ///
    /// Worker `w` searches the nonces congruent to `w` modulo the worker
    /// count, so no two workers test the same nonce, each spending an equal
    /// share of the attempt budget. The first worker to find a satisfying
    /// nonce wins a compare-and-set on a shared flag and publishes its
    /// block; the others observe the flag and stop at their next attempt.
    /// Only this orchestrating call appends, so exactly one block is
    /// committed per call. Which satisfying nonce wins is nondeterministic
    /// across runs.
    pub fn mine_block_concurrently(
        &mut self,
        data: &str,
        node_address: &str,
        meta_data: &str,
        workers: usize,
    ) -> Option<Block> {
        if workers <= 1 {
            return self.mine_block(data, node_address, meta_data);
        }

        let share = (self.try_limit / workers as u64).max(1);
        let found = Arc::new(AtomicBool::new(false));
        let winner: Arc<Mutex<Option<Block>>> = Arc::new(Mutex::new(None));
        let prev = self.ledger.last().clone();

        let mut handles = Vec::new();
        for worker_id in 0..workers {
            let found = Arc::clone(&found);
            let winner = Arc::clone(&winner);
            let prev = prev.clone();
            let data = data.to_string();
            let node_address = node_address.to_string();
            let meta_data = meta_data.to_string();
            let blockchain_id = self.blockchain_id.clone();
            let difficulty = self.difficulty;
            let stride = workers as i64;

            let handle = thread::spawn(move || {
                let mut nonce = worker_id as i64;
                for _ in 0..share {
                    // Cooperative cancellation, checked once per attempt.
                    if found.load(Ordering::Relaxed) {
                        return;
                    }

                    let candidate = Block::linked(
                        &prev,
                        &data,
                        &node_address,
                        nonce,
                        difficulty,
                        &blockchain_id,
                        &meta_data,
                    );
                    if pow::verify_attempt(&candidate) {
                        // Winner-takes-all: only the thread that flips the
                        // flag publishes its block.
                        if found
                            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                            .is_ok()
                        {
                            debug!("worker {} won the race with nonce {}", worker_id, nonce);
                            *winner.lock().unwrap_or_else(|e| e.into_inner()) = Some(candidate);
                        }
                        return;
                    }

                    nonce += stride;
                }
            });
            handles.push(handle);
        }

        for handle in handles {
            if handle.join().is_err() {
                warn!("mining worker panicked");
            }
        }

        let mined = winner.lock().unwrap_or_else(|e| e.into_inner()).take();
        match mined {
            Some(block) => Some(self.commit(block)),
            None => {
                debug!(
                    "{} workers exhausted their shares of {} attempts",
                    workers, self.try_limit
                );
                None
            }
        }
    }

    /// The single commit point: append the freshly mined block and
    /// re-evaluate difficulty.
    fn commit(&mut self, block: Block) -> Block {
        info!(
            "mined block {} with nonce {} at difficulty {}",
            block.block_id(),
            block.nonce(),
            block.difficulty()
        );

        self.ledger.append(block);
        self.retarget_after_mint();
        self.ledger.last().clone()
    }

    /// Verify a block against this chain's ledger.
    ///
    /// Checks, in order: (a) the stored hash equals the hash recomputed
    /// from the block's fields, (b) the previous-hash equals the hash of
    /// the ledger entry immediately preceding the block (the empty sentinel
    /// for genesis), (c) the stored hash satisfies the stored difficulty.
    /// The first failing check determines the reported defect.
    pub fn verify_block(&self, block: &Block) -> Result<()> {
        verify_against(&self.ledger, block)
    }

    /// Verify every block of this chain's ledger.
    pub fn verify_ledger(&self) -> Result<()> {
        for block in self.ledger.blocks() {
            verify_against(&self.ledger, block)?;
        }
        Ok(())
    }

    /// Reconcile this chain with a foreign ledger (heaviest chain wins).
    ///
    /// The foreign ledger is adopted wholesale iff its cumulative work
    /// strictly exceeds the local score, it carries the same chain
    /// identifier, and every one of its blocks passes verification. Ties
    /// keep the local ledger. Returns the adopted ledger, or `None` when no
    /// consensus was reached and the local ledger stands.
    pub fn find_consensus(&mut self, foreign: &Ledger) -> Option<&Ledger> {
        let local_work = self.ledger.cumulative_work();
        let foreign_work = foreign.cumulative_work();

        if foreign_work <= local_work {
            debug!(
                "keeping local ledger: work {} vs foreign {}",
                local_work, foreign_work
            );
            return None;
        }

        if foreign.genesis().blockchain_id() != self.blockchain_id {
            warn!(
                "rejecting foreign ledger from chain {}",
                foreign.genesis().blockchain_id()
            );
            return None;
        }

        for block in foreign.blocks() {
            if let Err(defect) = verify_against(foreign, block) {
                warn!(
                    "rejecting foreign ledger: block {} failed verification: {}",
                    block.block_id(),
                    defect
                );
                return None;
            }
        }

        info!(
            "adopting foreign ledger: work {} supersedes local {}",
            foreign_work, local_work
        );
        self.ledger = foreign.clone();
        Some(&self.ledger)
    }

    /// Re-evaluate the decay trigger without mining.
    ///
    /// Lets a host observe difficulty decay during idle periods; mining
    /// calls run the same evaluation after every successful mint.
    pub fn retarget(&mut self) {
        self.apply_decay();
    }

    /// Raise first, decay second, so the outcome is deterministic for a
    /// given history when both triggers hold.
    fn retarget_after_mint(&mut self) {
        self.mints_since_raise += 1;
        if self.raise_threshold != 0 && self.mints_since_raise >= self.raise_threshold {
            self.difficulty += DIFFICULTY_STEP;
            self.mints_since_raise = 0;
            info!(
                "raised difficulty to {} after {} mints",
                self.difficulty, self.raise_threshold
            );
        }

        self.apply_decay();
        self.last_mint = Instant::now();
    }

    fn apply_decay(&mut self) {
        if self.difficulty > MIN_DIFFICULTY && self.last_mint.elapsed() > self.decay_interval {
            self.difficulty = (self.difficulty - DIFFICULTY_STEP).max(MIN_DIFFICULTY);
            // Restart the decay window so each idle interval decays one step.
            self.last_mint = Instant::now();
            info!("decayed difficulty to {} after idle interval", self.difficulty);
        }
    }

    /// The ledger owned by this chain.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Number of blocks in the ledger, genesis included.
    pub fn ledger_size(&self) -> usize {
        self.ledger.len()
    }

    /// The most recently appended block.
    pub fn last_block(&self) -> &Block {
        self.ledger.last()
    }

    /// Look up a block by hash.
    pub fn block_by_hash(&self, block_hash: &str) -> Option<&Block> {
        self.ledger.get(block_hash)
    }

    /// The block at the given ledger position.
    pub fn block_by_index(&self, index: usize) -> Result<&Block> {
        self.ledger.by_index(index)
    }

    /// The last `range` blocks, in ascending sequence order.
    pub fn blocks_by_range(&self, range: usize) -> Result<&[Block]> {
        self.ledger.by_range(range)
    }

    /// All blocks carrying the given metadata tag.
    pub fn blocks_by_meta(&self, meta: &str) -> Result<Vec<&Block>> {
        self.ledger.by_meta(meta)
    }

    /// The chain identifier (hash of the genesis block).
    pub fn blockchain_id(&self) -> &str {
        &self.blockchain_id
    }

    pub fn difficulty(&self) -> u64 {
        self.difficulty
    }

    /// Set the difficulty directly, bypassing retargeting.
    pub fn set_difficulty(&mut self, difficulty: u64) {
        self.difficulty = difficulty;
    }

    pub fn raise_threshold(&self) -> u64 {
        self.raise_threshold
    }

    pub fn set_raise_threshold(&mut self, raise_threshold: u64) {
        self.raise_threshold = raise_threshold;
    }

    pub fn try_limit(&self) -> u64 {
        self.try_limit
    }

    pub fn set_try_limit(&mut self, try_limit: u64) {
        self.try_limit = try_limit;
    }

    pub fn decay_interval(&self) -> Duration {
        self.decay_interval
    }

    pub fn set_decay_interval(&mut self, decay_interval: Duration) {
        self.decay_interval = decay_interval;
    }
}

/// The three-step verification of a block against a given ledger.
fn verify_against(ledger: &Ledger, block: &Block) -> Result<()> {
    let computed = block.recompute_hash();
    if computed != block.block_hash() {
        return Err(ChainError::HashMismatch {
            stored: block.block_hash().to_string(),
            computed,
        });
    }

    if block.block_id() == 0 {
        if block.prev_hash() != GENESIS_PREV_HASH {
            return Err(ChainError::BrokenLink {
                expected: GENESIS_PREV_HASH.to_string(),
                found: block.prev_hash().to_string(),
            });
        }
    } else {
        let prev = ledger
            .by_index(block.block_id() as usize - 1)
            .map_err(|_| ChainError::BrokenLink {
                expected: String::new(),
                found: block.prev_hash().to_string(),
            })?;
        if block.prev_hash() != prev.block_hash() {
            return Err(ChainError::BrokenLink {
                expected: prev.block_hash().to_string(),
                found: block.prev_hash().to_string(),
            });
        }
    }

    if !pow::verify_attempt(block) {
        return Err(ChainError::UnmetDifficulty {
            zeros: pow::trailing_zero_bits(block.block_hash()),
            required: block.difficulty(),
        });
    }

    Ok(())
}
