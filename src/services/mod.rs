//! Service layer: the pipeline stages and the aggregate summaries built on
//! their output.

pub mod classifier;

pub mod extractor;

pub mod feature_table;

pub mod pipeline;

pub mod reducer;

pub mod statistics;

pub use classifier::{is_science_proposal, ScienceClassifier};
pub use extractor::{extract_blocks, Extraction};
pub use feature_table::BlockTable;
pub use pipeline::{run_pipeline, PipelineReport};
pub use reducer::reduce_frames;
