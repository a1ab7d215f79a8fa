//! Dataset loading and tabular export.
//!
//! The downloader persists archive pages as `data*.json` files, each holding
//! one JSON array of raw frame records. Loading concatenates every page of a
//! dataset directory into one batch; downloading itself is someone else's
//! job. Export writes the feature table as a flat CSV for reproducible
//! downstream analysis.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::models::frame::RawFrame;
use crate::services::feature_table::BlockTable;

/// Prefix of dataset page files.
const PAGE_FILE_PREFIX: &str = "data";

/// Parse one JSON array of raw frame records.
pub fn parse_raw_frames(json: &str) -> Result<Vec<RawFrame>> {
    serde_json::from_str(json).context("Failed to deserialize frame records JSON")
}

/// Load every `data*` page file in `dir` and concatenate their records.
///
/// Page order does not matter; the pipeline treats the batch as unordered.
pub fn load_raw_frames_dir(dir: &Path) -> Result<Vec<RawFrame>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read dataset directory {}", dir.display()))?;

    let mut page_paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(PAGE_FILE_PREFIX))
        })
        .collect();
    page_paths.sort();

    let mut frames = Vec::new();
    for path in &page_paths {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read page file {}", path.display()))?;
        let mut page = parse_raw_frames(&contents)
            .with_context(|| format!("Failed to parse page file {}", path.display()))?;
        frames.append(&mut page);
    }

    info!(
        "loaded {} frame records from {} page files in {}",
        frames.len(),
        page_paths.len(),
        dir.display()
    );
    Ok(frames)
}

const CSV_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Write the feature table as CSV.
pub fn write_blocks_csv<W: Write>(table: &BlockTable, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "block_id",
        "proposal_id",
        "start_time",
        "end_time",
        "duration_seconds",
        "exposure_sum_seconds",
        "science_exposure_sum_seconds",
        "time_efficiency",
        "science_efficiency_of_exposure",
        "science_efficiency_of_duration",
        "largest_gap_seconds",
        "target",
        "target_anomaly",
        "mean_ra",
        "mean_dec",
        "is_moving",
        "is_science",
        "is_orphan",
        "pattern",
        "request_ids",
        "instruments",
        "frame_count",
    ])?;

    for block in table.iter() {
        csv_writer.write_record([
            block.block_id.to_string(),
            block.proposal_id.clone(),
            block.start_time.format(CSV_TIMESTAMP_FORMAT).to_string(),
            block.end_time.format(CSV_TIMESTAMP_FORMAT).to_string(),
            block.duration_seconds.to_string(),
            block.exposure_sum_seconds.to_string(),
            block.science_exposure_sum_seconds.to_string(),
            block.time_efficiency.to_string(),
            block.science_efficiency_of_exposure.to_string(),
            block.science_efficiency_of_duration.to_string(),
            block.largest_gap_seconds.to_string(),
            block.target.to_string(),
            block.target_anomaly.to_string(),
            block.mean_ra.map(|v| v.to_string()).unwrap_or_default(),
            block.mean_dec.map(|v| v.to_string()).unwrap_or_default(),
            block.is_moving.to_string(),
            block.is_science.to_string(),
            block.is_orphan.to_string(),
            block.pattern_signature(),
            block.request_ids.to_string(),
            block.instruments.to_string(),
            block.frame_count.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Write the feature table as CSV to `path`.
pub fn export_blocks_csv(table: &BlockTable, path: &Path) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create export file {}", path.display()))?;
    write_blocks_csv(table, file)
        .with_context(|| format!("Failed to write block table to {}", path.display()))?;
    info!("exported {} blocks to {}", table.len(), path.display());
    Ok(())
}
