//! # obsblocks
//!
//! Reconstruction and analysis of telescope observation blocks from archive
//! frame metadata.
//!
//! The archive reports a flat, unordered stream of frame records, one per
//! exposure per reduction level. This crate rebuilds the scheduler's view of
//! that stream: contiguous groups of exposures sharing a block identifier,
//! annotated with the derived quantities (efficiency ratios, idle gaps,
//! target and motion detection, structural patterns, orphan status) needed
//! for exploratory analysis and plotting.
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: identifier newtypes and the consolidated public types
//! - [`config`]: explicit, immutable pipeline configuration
//! - [`models`]: the frame and block data model, including archive parsing
//! - [`services`]: the pipeline stages (reduction, classification, block
//!   extraction) and cross-block aggregate summaries
//! - [`io`]: dataset page loading and CSV export
//!
//! ## Pipeline
//!
//! ```text
//! raw records -> FrameRecord -> reduce_frames -> extract_blocks
//!             -> BlockTable -> statistics -> (plotting, external)
//! ```
//!
//! The pipeline is single-threaded and batch-oriented: every input is
//! materialized in memory before processing begins, and blocks are
//! recomputed fresh on each run.

pub mod api;
pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod services;

pub use config::{PipelineConfig, TargetPolicy};
pub use error::PipelineError;
pub use services::{run_pipeline, BlockTable, PipelineReport};
