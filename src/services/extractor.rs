//! Block reconstruction, the core of the pipeline.
//!
//! Takes a flat batch of reduced frames and rebuilds the scheduler's block
//! structure: frames are partitioned by `BLKUID`, ordered in time, and each
//! partition is condensed into one [`Block`] with its derived quantities
//! (duration, exposure accounting, efficiency ratios, gap detection, target
//! extraction, motion detection, pattern condensation, orphan status).
//!
//! Blocks are causally independent once partitioned; nothing here carries
//! state across block ids.

use std::collections::HashMap;

use itertools::Itertools;
use log::{debug, warn};

use crate::api::BlockUid;
use crate::config::{PipelineConfig, TargetPolicy};
use crate::error::PipelineError;
use crate::models::block::{Block, PatternEntry, PatternStep, Target, ValueSet};
use crate::models::frame::FrameRecord;
use crate::models::time::{add_seconds, seconds_between};
use crate::services::classifier::ScienceClassifier;

/// The result of one extraction pass: the reconstructed blocks plus
/// diagnostics about what was skipped or recovered along the way.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Blocks in order of first appearance in the input.
    pub blocks: Vec<Block>,
    /// Zero-duration blocks excluded from the output. Not an error, but
    /// worth reporting: a block that carries no usable signal.
    pub degenerate_skipped: usize,
    /// Blocks emitted with a multi-valued target.
    pub target_anomalies: usize,
}

/// Reconstruct scheduling blocks from a batch of reduced frames.
///
/// Input need not be pre-sorted; each block is ordered internally. A block
/// spanning more than one proposal aborts the whole batch: partitioning by
/// `BLKUID` is guaranteed upstream to respect proposal boundaries, and a
/// violation means the archive data is corrupt.
pub fn extract_blocks(
    frames: &[FrameRecord],
    classifier: &ScienceClassifier,
    config: &PipelineConfig,
) -> Result<Extraction, PipelineError> {
    let mut order: Vec<BlockUid> = Vec::new();
    let mut groups: HashMap<BlockUid, Vec<&FrameRecord>> = HashMap::new();
    for frame in frames {
        groups
            .entry(frame.block_id)
            .or_insert_with(|| {
                order.push(frame.block_id);
                Vec::new()
            })
            .push(frame);
    }

    let mut extraction = Extraction::default();
    for block_id in order {
        let mut group = match groups.remove(&block_id) {
            Some(group) => group,
            None => continue,
        };
        group.sort_by_key(|f| f.observed_at);

        match build_block(block_id, &group, classifier, config)? {
            Some(block) => {
                if block.target_anomaly {
                    extraction.target_anomalies += 1;
                }
                extraction.blocks.push(block);
            }
            None => extraction.degenerate_skipped += 1,
        }
    }

    debug!(
        "extracted {} blocks ({} degenerate skipped, {} target anomalies)",
        extraction.blocks.len(),
        extraction.degenerate_skipped,
        extraction.target_anomalies
    );
    Ok(extraction)
}

/// Derive one block from its time-ordered frames. Returns `Ok(None)` for
/// degenerate (zero-duration) blocks.
fn build_block(
    block_id: BlockUid,
    frames: &[&FrameRecord],
    classifier: &ScienceClassifier,
    config: &PipelineConfig,
) -> Result<Option<Block>, PipelineError> {
    let (first, last) = match (frames.first(), frames.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Ok(None),
    };

    let proposals: Vec<String> = frames
        .iter()
        .map(|f| f.proposal_id.clone())
        .unique()
        .collect();
    if proposals.len() > 1 {
        let mut proposals = proposals;
        proposals.sort();
        return Err(PipelineError::MultiProposalBlock {
            block_id: block_id.value(),
            proposals,
        });
    }
    let proposal_id = proposals.into_iter().next().unwrap_or_default();

    let start_time = first.observed_at;
    let end_time = add_seconds(last.observed_at, last.exposure_seconds);
    let duration_seconds = seconds_between(start_time, end_time);
    if duration_seconds <= 0.0 {
        debug!("skipping degenerate block {block_id} (zero duration)");
        return Ok(None);
    }

    // Epsilon on the exposure sum only: duration is non-zero past this point.
    let exposure_sum_seconds: f64 = frames.iter().map(|f| f.exposure_seconds).sum::<f64>()
        + config.exposure_epsilon_seconds;
    let science_exposure_sum_seconds: f64 = frames
        .iter()
        .filter(|f| config.is_science_obstype(&f.observation_type))
        .map(|f| f.exposure_seconds)
        .sum();

    let largest_gap_seconds = frames
        .windows(2)
        .map(|pair| {
            let idle_from = add_seconds(pair[0].observed_at, pair[0].exposure_seconds);
            // Overlapping exposures produce negative "gaps"; clamp, don't flag.
            seconds_between(idle_from, pair[1].observed_at).max(0.0)
        })
        .fold(0.0, f64::max);

    let (target, target_anomaly) = extract_target(block_id, frames, config);

    let threshold = config.moving_threshold_deg;
    let is_moving = match (first.ra, first.dec, last.ra, last.dec) {
        (Some(ra0), Some(dec0), Some(ra1), Some(dec1)) => {
            (ra0 - ra1).abs() > threshold || (dec0 - dec1).abs() > threshold
        }
        // Without centroids on both ends there is nothing to compare.
        _ => false,
    };

    let ras: Vec<f64> = frames.iter().filter_map(|f| f.ra).collect();
    let decs: Vec<f64> = frames.iter().filter_map(|f| f.dec).collect();
    let mean_ra = mean(&ras);
    let mean_dec = mean(&decs);

    let pattern: Vec<PatternEntry> = frames
        .iter()
        .map(|f| PatternStep {
            exposure_seconds: f.exposure_seconds,
            instrument: f.instrument.clone(),
            filter: f.filter.clone(),
            observation_type: f.observation_type.clone(),
        })
        .dedup_with_count()
        .map(|(repeat, step)| PatternEntry { step, repeat })
        .collect();

    let is_science = classifier.is_science(&proposal_id);
    let is_orphan = is_science
        && !frames
            .iter()
            .any(|f| config.is_science_obstype(&f.observation_type));

    Ok(Some(Block {
        block_id,
        proposal_id,
        start_time,
        end_time,
        duration_seconds,
        exposure_sum_seconds,
        science_exposure_sum_seconds,
        time_efficiency: exposure_sum_seconds / duration_seconds,
        science_efficiency_of_exposure: science_exposure_sum_seconds / exposure_sum_seconds,
        science_efficiency_of_duration: science_exposure_sum_seconds / duration_seconds,
        largest_gap_seconds,
        target,
        target_anomaly,
        mean_ra,
        mean_dec,
        is_moving,
        pattern,
        is_science,
        is_orphan,
        request_ids: ValueSet::from_values(frames.iter().map(|f| f.request_id)),
        instruments: ValueSet::from_values(frames.iter().map(|f| f.instrument.clone())),
        frame_count: frames.len(),
    }))
}

/// Extract the block's target identifier from its frames' object names.
///
/// A single shared name is the target. When names disagree, spectroscopic
/// sequences get a second chance under [`TargetPolicy::SettleAware`]: the
/// leading arc and lamp flat may have been taken before the slew completed,
/// so if every frame is of a spectral type and the frames from index 2
/// onward agree, that agreed name wins. Any other multiplicity is an
/// anomaly; the block still comes out, carrying the sorted tuple of names.
fn extract_target(
    block_id: BlockUid,
    frames: &[&FrameRecord],
    config: &PipelineConfig,
) -> (Target, bool) {
    let names: Vec<&str> = frames
        .iter()
        .map(|f| f.object_name.as_str())
        .unique()
        .collect();
    if let [single] = names.as_slice() {
        return (Target::Single((*single).to_string()), false);
    }

    if config.target_policy == TargetPolicy::SettleAware
        && frames
            .iter()
            .all(|f| config.is_spectral_obstype(&f.observation_type))
    {
        let settled: Vec<&str> = frames
            .get(2..)
            .unwrap_or(&[])
            .iter()
            .map(|f| f.object_name.as_str())
            .unique()
            .collect();
        if let [single] = settled.as_slice() {
            return (Target::Single((*single).to_string()), false);
        }
    }

    warn!("block {block_id} has multiple object names: {names:?}");
    let mut names: Vec<String> = names.into_iter().map(str::to_string).collect();
    names.sort();
    (Target::Multiple(names), true)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
