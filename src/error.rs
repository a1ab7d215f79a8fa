//! Error types for the block reconstruction pipeline.
//!
//! Parsing and reduction failures abort the batch: admitting a partially
//! parsed record downstream silently corrupts every derived quantity, and
//! detection at the ingestion boundary is cheap. Per-block target ambiguity
//! is recovered locally and surfaced as an annotation on the block instead.

use thiserror::Error;

/// Fatal pipeline errors. Any of these aborts the batch being processed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An observation timestamp matched neither of the two archive formats.
    #[error("unparseable observation timestamp {value:?} on frame {frame_id}")]
    Timestamp { frame_id: i64, value: String },

    /// Frame reduction produced a different number of frames than there are
    /// distinct observation instants in the input.
    #[error("frame reduction inconsistency: {expected} distinct observation instants, {actual} frames produced")]
    ReductionConsistency { expected: usize, actual: usize },

    /// A scheduling block spans more than one proposal. Block partitioning
    /// is guaranteed upstream to respect proposal boundaries, so this
    /// indicates corrupted archive data.
    #[error("block {block_id} spans multiple proposals: {proposals:?}")]
    MultiProposalBlock {
        block_id: i64,
        proposals: Vec<String>,
    },

    /// The configured science proposal pattern is not a valid regex.
    #[error("invalid science proposal pattern: {0}")]
    ProposalPattern(#[from] regex::Error),
}
