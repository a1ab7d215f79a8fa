//! Public API surface for the pipeline.
//!
//! This file consolidates the identifier newtypes and re-exports the record
//! types produced and consumed by the pipeline stages. All types derive
//! Serialize/Deserialize for JSON serialization.

pub use crate::models::block::{Block, PatternEntry, PatternStep, Target, ValueSet};
pub use crate::models::frame::{FrameRecord, RawFrame};
pub use crate::services::extractor::Extraction;
pub use crate::services::feature_table::BlockTable;
pub use crate::services::pipeline::PipelineReport;
pub use crate::services::statistics::{
    EfficiencySummary, InstrumentUsage, MotionSummary, OrphanSummary, PositionBin,
};

use serde::{Deserialize, Serialize};

/// Archive frame identifier (the archive's `id` field).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameId(pub i64);

/// Scheduled block identifier (the archive's `BLKUID` field).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockUid(pub i64);

/// User request identifier (the archive's `REQNUM` field).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestNum(pub i64);

impl FrameId {
    pub fn new(value: i64) -> Self {
        FrameId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl BlockUid {
    pub fn new(value: i64) -> Self {
        BlockUid(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl RequestNum {
    pub fn new(value: i64) -> Self {
        RequestNum(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for BlockUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for RequestNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<BlockUid> for i64 {
    fn from(id: BlockUid) -> Self {
        id.0
    }
}

impl From<RequestNum> for i64 {
    fn from(id: RequestNum) -> Self {
        id.0
    }
}
