//! Tracks open reference-confidence blocks on both sides of a joint record
//! stream and accumulates block and confidence concordance histograms.

use crate::libs::error::ConcordanceError;
use crate::libs::histogram::{BlockKey, ConfidencePair, Histogram};
use crate::libs::record::{Block, Call, JointRecord};
use log::{debug, warn};
use std::collections::HashSet;

/// The three histograms produced by a tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConcordanceStats {
    /// (length, confidence) of every truth block
    pub truth_blocks: Histogram<BlockKey>,
    /// (length, confidence) of every eval block
    pub eval_blocks: Histogram<BlockKey>,
    /// Overlapping positions per (truth confidence, eval confidence)
    pub confidence_concordance: Histogram<ConfidencePair>,
}

impl ConcordanceStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-wise addition of all three histograms.
    pub fn merge(&mut self, other: &ConcordanceStats) {
        self.truth_blocks.merge(&other.truth_blocks);
        self.eval_blocks.merge(&other.eval_blocks);
        self.confidence_concordance
            .merge(&other.confidence_concordance);
    }
}

/// Single-pass state machine over a contig-grouped, position-sorted stream.
///
/// ```
/// use blockcon::libs::record::{Block, Call, JointRecord};
/// use blockcon::libs::tracker::BlockTracker;
/// use blockcon::libs::histogram::ConfidencePair;
///
/// let mut tracker = BlockTracker::new();
/// let truth = Call::Block(Block::new(1, 10, 99).unwrap());
/// let eval = Call::Block(Block::new(1, 10, 90).unwrap());
/// tracker
///     .process(&JointRecord::new("chr1", 1, Some(truth), Some(eval)).unwrap())
///     .unwrap();
/// let stats = tracker.finish();
/// assert_eq!(stats.confidence_concordance.get(&ConfidencePair::new(99, 90)), 10);
/// ```
#[derive(Debug, Default)]
pub struct BlockTracker {
    current_contig: Option<String>,
    last_position: Option<u64>,
    finished_contigs: HashSet<String>,
    open_truth: Option<Block>,
    open_eval: Option<Block>,
    stats: ConcordanceStats,
}

impl BlockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &ConcordanceStats {
        &self.stats
    }

    pub fn open_truth(&self) -> Option<&Block> {
        self.open_truth.as_ref()
    }

    pub fn open_eval(&self) -> Option<&Block> {
        self.open_eval.as_ref()
    }

    pub fn process(&mut self, record: &JointRecord) -> Result<(), ConcordanceError> {
        record.validate()?;

        if self.current_contig.as_deref() != Some(record.contig.as_str()) {
            self.enter_contig(&record.contig)?;
        } else if let Some(previous) = self.last_position {
            if record.position < previous {
                return Err(ConcordanceError::OutOfOrder {
                    contig: record.contig.clone(),
                    previous,
                    position: record.position,
                });
            }
        }
        self.last_position = Some(record.position);

        // A call on a side ends that side's block; so does moving past its end
        let close_truth = record.truth.is_some()
            || self
                .open_truth
                .is_some_and(|block| record.position > block.end);
        let close_eval = record.eval.is_some()
            || self
                .open_eval
                .is_some_and(|block| record.position > block.end);

        if close_truth || close_eval {
            self.accrue_pairing();
        }
        if close_truth {
            if let Some(block) = self.open_truth.take() {
                self.stats.truth_blocks.increment(block_key(&block), 1);
            }
        }
        if close_eval {
            if let Some(block) = self.open_eval.take() {
                self.stats.eval_blocks.increment(block_key(&block), 1);
            }
        }

        if let Some(Call::Block(block)) = record.truth {
            self.open_truth = Some(block);
        }
        if let Some(Call::Block(block)) = record.eval {
            self.open_eval = Some(block);
        }

        Ok(())
    }

    /// Closes whatever is still open on the current contig.
    pub fn flush(&mut self) {
        if let (Some(truth), Some(eval)) = (&self.open_truth, &self.open_eval) {
            if truth.end != eval.end {
                warn!(
                    "Open blocks end at different positions on {}: truth {}, eval {}",
                    self.current_contig.as_deref().unwrap_or("."),
                    truth.end,
                    eval.end
                );
            }
        }

        self.accrue_pairing();
        if let Some(block) = self.open_truth.take() {
            self.stats.truth_blocks.increment(block_key(&block), 1);
        }
        if let Some(block) = self.open_eval.take() {
            self.stats.eval_blocks.increment(block_key(&block), 1);
        }
    }

    /// Flushes and hands over the final histograms.
    pub fn finish(mut self) -> ConcordanceStats {
        self.flush();
        self.stats
    }

    fn enter_contig(&mut self, contig: &str) -> Result<(), ConcordanceError> {
        if self.finished_contigs.contains(contig) {
            return Err(ConcordanceError::ContigRevisited(contig.to_string()));
        }

        self.flush();
        if let Some(previous) = self.current_contig.take() {
            debug!("Finished contig {}", previous);
            self.finished_contigs.insert(previous);
        }
        debug!("Entering contig {}", contig);
        self.current_contig = Some(contig.to_string());
        self.last_position = None;

        Ok(())
    }

    // Called only when the current pairing is about to break, so each pairing counts once
    fn accrue_pairing(&mut self) {
        if let (Some(truth), Some(eval)) = (&self.open_truth, &self.open_eval) {
            let overlap = truth.overlap(eval);
            if overlap > 0 {
                self.stats
                    .confidence_concordance
                    .increment(ConfidencePair::new(truth.confidence, eval.confidence), overlap);
            }
        }
    }
}

fn block_key(block: &Block) -> BlockKey {
    BlockKey::new(block.length(), block.confidence)
}

/// Runs a single tracker over a whole stream.
pub fn track<'a, I>(records: I) -> Result<ConcordanceStats, ConcordanceError>
where
    I: IntoIterator<Item = &'a JointRecord>,
{
    let mut tracker = BlockTracker::new();
    for record in records {
        tracker.process(record)?;
    }
    Ok(tracker.finish())
}
