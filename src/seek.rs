//! Seek strategies and predictor checkpoints
//!
//! Two interchangeable repositioning policies exist across adapters:
//! native seeking, for wrapped engines exposing their own position API,
//! and replay-from-start for stateful block codecs like PS-ADPCM, where
//! the predictor history is a required input to every block decode and
//! must be rebuilt by decoding (and discarding) everything up to the
//! target position.
//!
//! Full replay is O(position) per seek. [`CheckpointTable`] bounds that
//! cost by snapshotting the predictor every K blocks during sequential
//! decode, without changing the external seek contract.

use crate::adpcm::PredictorState;

/// Default checkpoint spacing in blocks (~0.33 s of audio at 44.1 kHz).
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 512;

/// Repositioning policy used by a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekStrategy {
    /// The wrapped engine repositions itself; no replay needed.
    Native,
    /// Reset decoder state and replay from the start (or the nearest
    /// checkpoint), discarding output until the target is reached.
    ReplayFromStart,
}

/// Predictor snapshots taken every `interval` blocks.
///
/// Entry `i` holds the predictor state *entering* block `i * interval`.
/// Snapshots are only recorded during sequential decode, so the table is
/// always a gapless prefix: entry `i` exists only if all earlier entries do.
#[derive(Debug, Clone)]
pub struct CheckpointTable {
    interval: usize,
    entries: Vec<PredictorState>,
}

impl CheckpointTable {
    /// Create an empty table with the given block interval.
    #[must_use]
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            entries: Vec::new(),
        }
    }

    /// Checkpoint spacing in blocks.
    #[must_use]
    pub fn interval(&self) -> usize {
        self.interval
    }

    /// Number of snapshots recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no snapshots have been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all snapshots (on reopen).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Offer the predictor state entering `block_index`.
    ///
    /// Recorded only when `block_index` is exactly the next checkpoint
    /// boundary, which keeps the table a gapless prefix even though the
    /// decode position jumps around across seeks.
    pub fn record(&mut self, block_index: usize, state: PredictorState) {
        if block_index == self.entries.len() * self.interval {
            self.entries.push(state);
        }
    }

    /// Best replay origin for a seek to `target_block`: the latest recorded
    /// checkpoint at or before it. Falls back to the zero state at block 0.
    #[must_use]
    pub fn nearest(&self, target_block: usize) -> (usize, PredictorState) {
        if self.entries.is_empty() {
            return (0, PredictorState::default());
        }
        let index = (target_block / self.interval).min(self.entries.len() - 1);
        (index * self.interval, self.entries[index])
    }
}

impl Default for CheckpointTable {
    fn default() -> Self {
        Self::new(DEFAULT_CHECKPOINT_INTERVAL)
    }
}
