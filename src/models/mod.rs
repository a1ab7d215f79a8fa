//! Data model for the block reconstruction pipeline.
//!
//! [`frame`] covers the ingestion boundary: raw archive records and their
//! validated, strongly-typed form. [`block`] holds the derived per-block
//! records produced by extraction. [`time`] collects the timestamp parsing
//! and arithmetic helpers shared by both.

pub mod block;
pub mod frame;
pub mod time;
