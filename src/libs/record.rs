use crate::libs::error::ConcordanceError;
use std::fmt;

/// A reference-confidence block: one confidence score over a closed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    pub start: u64,
    pub end: u64, // inclusive
    pub confidence: u32,
}

impl Block {
    /// ```
    /// use blockcon::libs::record::Block;
    /// let block = Block::new(11, 20, 99).unwrap();
    /// assert_eq!(block.length(), 10);
    /// assert!(Block::new(20, 11, 99).is_err());
    /// ```
    pub fn new(start: u64, end: u64, confidence: u32) -> Result<Self, ConcordanceError> {
        if end < start || end - start == u64::MAX {
            return Err(ConcordanceError::InvalidBlock { start, end });
        }
        Ok(Self {
            start,
            end,
            confidence,
        })
    }

    /// Number of positions covered, ends inclusive.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Positions shared by two blocks, 0 when they are disjoint.
    ///
    /// ```
    /// use blockcon::libs::record::Block;
    /// let truth = Block::new(1, 10, 99).unwrap();
    /// let eval = Block::new(6, 12, 98).unwrap();
    /// assert_eq!(truth.overlap(&eval), 5);
    /// assert_eq!(truth.overlap(&Block::new(11, 12, 98).unwrap()), 0);
    /// ```
    pub fn overlap(&self, other: &Block) -> u64 {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end >= start {
            end - start + 1
        } else {
            0
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]:{}", self.start, self.end, self.confidence)
    }
}

/// One side's call at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Block(Block),
    /// A definite-allele call; only its presence matters
    Variant { start: u64 },
}

impl Call {
    pub fn start(&self) -> u64 {
        match self {
            Call::Block(block) => block.start,
            Call::Variant { start } => *start,
        }
    }

    pub fn block(&self) -> Option<&Block> {
        match self {
            Call::Block(block) => Some(block),
            Call::Variant { .. } => None,
        }
    }
}

/// Truth and eval calls starting at the same position of a contig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JointRecord {
    pub contig: String,
    pub position: u64,
    pub truth: Option<Call>,
    pub eval: Option<Call>,
}

impl JointRecord {
    /// Rejects records without any call and calls that start elsewhere.
    pub fn new(
        contig: &str,
        position: u64,
        truth: Option<Call>,
        eval: Option<Call>,
    ) -> Result<Self, ConcordanceError> {
        let record = Self {
            contig: contig.to_string(),
            position,
            truth,
            eval,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn truth_only(contig: &str, call: Call) -> Self {
        Self {
            contig: contig.to_string(),
            position: call.start(),
            truth: Some(call),
            eval: None,
        }
    }

    pub fn eval_only(contig: &str, call: Call) -> Self {
        Self {
            contig: contig.to_string(),
            position: call.start(),
            truth: None,
            eval: Some(call),
        }
    }

    pub fn validate(&self) -> Result<(), ConcordanceError> {
        if self.truth.is_none() && self.eval.is_none() {
            return Err(ConcordanceError::EmptyRecord {
                contig: self.contig.clone(),
                position: self.position,
            });
        }
        for call in self.truth.iter().chain(self.eval.iter()) {
            if call.start() != self.position {
                return Err(ConcordanceError::PositionMismatch {
                    contig: self.contig.clone(),
                    position: self.position,
                    start: call.start(),
                });
            }
            if let Some(block) = call.block() {
                if block.end < block.start || block.end - block.start == u64::MAX {
                    return Err(ConcordanceError::InvalidBlock {
                        start: block.start,
                        end: block.end,
                    });
                }
            }
        }
        Ok(())
    }
}
