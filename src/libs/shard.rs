//! Per-contig sharding: independent trackers on a rayon pool, merged by
//! histogram addition.

use crate::libs::error::ConcordanceError;
use crate::libs::record::JointRecord;
use crate::libs::tracker::{track, ConcordanceStats};
use itertools::Itertools;
use log::debug;
use rayon::prelude::*;
use std::collections::HashSet;

/// Records of one contig, in stream order.
#[derive(Debug, Clone)]
pub struct Shard {
    pub contig: String,
    pub records: Vec<JointRecord>,
}

/// Splits a contig-grouped stream into one shard per contig.
///
/// A contig split into separate runs breaks the input contract.
pub fn split_by_contig<I>(records: I) -> Result<Vec<Shard>, ConcordanceError>
where
    I: IntoIterator<Item = JointRecord>,
{
    let mut shards = vec![];
    let mut seen: HashSet<String> = HashSet::new();

    for (contig, group) in &records.into_iter().chunk_by(|r| r.contig.clone()) {
        if !seen.insert(contig.clone()) {
            return Err(ConcordanceError::ContigRevisited(contig));
        }
        shards.push(Shard {
            contig,
            records: group.collect(),
        });
    }

    Ok(shards)
}

/// Runs one tracker per shard in parallel and sums the results.
pub fn track_shards(shards: &[Shard]) -> Result<ConcordanceStats, ConcordanceError> {
    shards
        .par_iter()
        .map(|shard| {
            debug!("{}: {} records", shard.contig, shard.records.len());
            track(&shard.records)
        })
        .try_reduce(ConcordanceStats::new, |mut acc, stats| {
            acc.merge(&stats);
            Ok(acc)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::record::{Block, Call};

    fn rec(contig: &str, start: u64, end: u64, confidence: u32) -> JointRecord {
        let call = Call::Block(Block::new(start, end, confidence).unwrap());
        JointRecord::new(contig, start, Some(call), Some(call)).unwrap()
    }

    #[test]
    fn test_split_by_contig() {
        let records = vec![
            rec("chr1", 1, 5, 10),
            rec("chr1", 6, 9, 20),
            rec("chr2", 1, 3, 10),
        ];
        let shards = split_by_contig(records).unwrap();
        assert_eq!(shards.len(), 2);
        assert_eq!(shards[0].contig, "chr1");
        assert_eq!(shards[0].records.len(), 2);
        assert_eq!(shards[1].contig, "chr2");

        let records = vec![
            rec("chr1", 1, 5, 10),
            rec("chr2", 1, 3, 10),
            rec("chr1", 6, 9, 20),
        ];
        assert_eq!(
            split_by_contig(records).unwrap_err(),
            ConcordanceError::ContigRevisited("chr1".to_string())
        );
    }

    #[test]
    fn test_track_shards() {
        let records = vec![
            rec("chr1", 1, 5, 10),
            rec("chr1", 6, 9, 20),
            rec("chr2", 1, 3, 10),
            rec("chr3", 100, 100, 30),
        ];
        let single = track(&records).unwrap();
        let sharded = track_shards(&split_by_contig(records).unwrap()).unwrap();
        assert_eq!(single, sharded);
        assert_eq!(sharded.truth_blocks.total(), 4);
        assert_eq!(sharded.confidence_concordance.total(), 5 + 4 + 3 + 1);

        assert_eq!(track_shards(&[]).unwrap(), ConcordanceStats::new());
    }
}
