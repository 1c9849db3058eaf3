use std::fmt;

/// Violations of the joint record stream contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConcordanceError {
    /// A record that carries neither a truth nor an eval call
    EmptyRecord { contig: String, position: u64 },
    /// Position moved backwards within a contig
    OutOfOrder {
        contig: String,
        previous: u64,
        position: u64,
    },
    /// A contig shows up again after another contig was started
    ContigRevisited(String),
    /// The start of a call differs from the position of its record
    PositionMismatch {
        contig: String,
        position: u64,
        start: u64,
    },
    /// A block whose end lies before its start, or too long to measure
    InvalidBlock { start: u64, end: u64 },
}

impl fmt::Display for ConcordanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcordanceError::EmptyRecord { contig, position } => write!(
                f,
                "Record at {}:{} has neither a truth nor an eval call",
                contig, position
            ),
            ConcordanceError::OutOfOrder {
                contig,
                previous,
                position,
            } => write!(
                f,
                "Records out of order on {}: {} comes after {}",
                contig, position, previous
            ),
            ConcordanceError::ContigRevisited(contig) => write!(
                f,
                "Records of contig {} are not contiguous in the input",
                contig
            ),
            ConcordanceError::PositionMismatch {
                contig,
                position,
                start,
            } => write!(
                f,
                "Call starting at {} does not belong to record {}:{}",
                start, contig, position
            ),
            ConcordanceError::InvalidBlock { start, end } => {
                write!(f, "Invalid block [{}, {}]", start, end)
            }
        }
    }
}

impl std::error::Error for ConcordanceError {}
