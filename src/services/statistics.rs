//! Cross-block aggregate summaries.
//!
//! Pure functions over the [`BlockTable`], each rolling blocks up by a
//! grouping key (typically proposal id) into the summary records consumed
//! by the plotting layer.

use std::collections::BTreeMap;

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::models::frame::FrameRecord;
use crate::services::feature_table::BlockTable;

/// Guard for ratios whose denominator may legitimately be zero.
const RATIO_EPSILON: f64 = 1e-9;

/// Bins per day at 15-minute resolution.
pub const TIME_BINS_PER_DAY: usize = 24 * 4;
/// RA histogram bins: 15 minutes of hour angle over 24 h.
pub const RA_BINS: usize = 96;
/// Dec histogram bins: 10 degrees over ±90°.
pub const DEC_BINS: usize = 18;

/// Orphaned vs attributed time for one proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrphanSummary {
    pub orphaned_count: usize,
    pub attributed_count: usize,
    pub orphaned_hours: f64,
    pub attributed_hours: f64,
    /// Orphaned share of the proposal's total block duration. `None` when
    /// the proposal accumulated no duration at all.
    pub orphaned_fraction: Option<f64>,
}

/// Exposure accounting for one proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencySummary {
    pub exposure_hours: f64,
    pub science_exposure_hours: f64,
}

/// Moving vs stationary targets for one proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionSummary {
    pub moving_count: usize,
    pub stationary_count: usize,
    pub moving_exposure_hours: f64,
    pub stationary_exposure_hours: f64,
    pub moving_fraction: f64,
}

/// Usage of one instrument under one proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentUsage {
    pub block_count: usize,
    pub exposure_hours: f64,
}

/// One bin of a positional histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionBin {
    /// Lower edge of the bin, degrees.
    pub lower_edge_deg: f64,
    pub block_count: usize,
    pub exposure_hours: f64,
}

/// Count of blocks sharing one condensed pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCount {
    pub pattern: String,
    pub block_count: usize,
}

/// Orphaned vs attributed counts and duration per proposal.
pub fn orphan_summary(table: &BlockTable) -> BTreeMap<String, OrphanSummary> {
    table
        .group_by_proposal()
        .into_iter()
        .map(|(proposal, blocks)| {
            let mut summary = OrphanSummary {
                orphaned_count: 0,
                attributed_count: 0,
                orphaned_hours: 0.0,
                attributed_hours: 0.0,
                orphaned_fraction: None,
            };
            for block in blocks {
                if block.is_orphan {
                    summary.orphaned_count += 1;
                    summary.orphaned_hours += block.duration_hours();
                } else {
                    summary.attributed_count += 1;
                    summary.attributed_hours += block.duration_hours();
                }
            }
            let total = summary.orphaned_hours + summary.attributed_hours;
            if total > 0.0 {
                summary.orphaned_fraction = Some(summary.orphaned_hours / total);
            }
            (proposal, summary)
        })
        .collect()
}

/// Total vs science exposure hours per proposal.
pub fn efficiency_summary(table: &BlockTable) -> BTreeMap<String, EfficiencySummary> {
    table
        .group_by_proposal()
        .into_iter()
        .map(|(proposal, blocks)| {
            let summary = EfficiencySummary {
                exposure_hours: blocks.iter().map(|b| b.exposure_hours()).sum(),
                science_exposure_hours: blocks.iter().map(|b| b.science_exposure_hours()).sum(),
            };
            (proposal, summary)
        })
        .collect()
}

/// Moving vs stationary block counts and exposure hours per proposal.
pub fn motion_summary(table: &BlockTable) -> BTreeMap<String, MotionSummary> {
    table
        .group_by_proposal()
        .into_iter()
        .map(|(proposal, blocks)| {
            let mut summary = MotionSummary {
                moving_count: 0,
                stationary_count: 0,
                moving_exposure_hours: 0.0,
                stationary_exposure_hours: 0.0,
                moving_fraction: 0.0,
            };
            for block in blocks {
                if block.is_moving {
                    summary.moving_count += 1;
                    summary.moving_exposure_hours += block.exposure_hours();
                } else {
                    summary.stationary_count += 1;
                    summary.stationary_exposure_hours += block.exposure_hours();
                }
            }
            let total = summary.moving_exposure_hours + summary.stationary_exposure_hours;
            summary.moving_fraction = summary.moving_exposure_hours / (total + RATIO_EPSILON);
            (proposal, summary)
        })
        .collect()
}

/// Per-proposal usage broken out by instrument. A block with several
/// contributing instruments counts once under each of them.
pub fn instrument_usage(table: &BlockTable) -> BTreeMap<String, BTreeMap<String, InstrumentUsage>> {
    let mut usage: BTreeMap<String, BTreeMap<String, InstrumentUsage>> = BTreeMap::new();
    for block in table.iter() {
        let per_proposal = usage.entry(block.proposal_id.clone()).or_default();
        for instrument in block.instruments.iter() {
            let entry = per_proposal
                .entry(instrument.clone())
                .or_insert(InstrumentUsage {
                    block_count: 0,
                    exposure_hours: 0.0,
                });
            entry.block_count += 1;
            entry.exposure_hours += block.exposure_hours();
        }
    }
    usage
}

/// Histogram of block centroids over RA, in 15-minute-of-hour-angle bins.
/// Blocks without a centroid are skipped.
pub fn ra_histogram(table: &BlockTable) -> Vec<PositionBin> {
    let bin_width = 360.0 / RA_BINS as f64;
    let mut bins: Vec<PositionBin> = (0..RA_BINS)
        .map(|i| PositionBin {
            lower_edge_deg: i as f64 * bin_width,
            block_count: 0,
            exposure_hours: 0.0,
        })
        .collect();
    for block in table.iter() {
        if let Some(ra) = block.mean_ra {
            let index = ((ra / bin_width).floor() as usize).min(RA_BINS - 1);
            bins[index].block_count += 1;
            bins[index].exposure_hours += block.exposure_hours();
        }
    }
    bins
}

/// Histogram of block centroids over Dec, in 10-degree bins spanning ±90°.
pub fn dec_histogram(table: &BlockTable) -> Vec<PositionBin> {
    let bin_width = 180.0 / DEC_BINS as f64;
    let mut bins: Vec<PositionBin> = (0..DEC_BINS)
        .map(|i| PositionBin {
            lower_edge_deg: -90.0 + i as f64 * bin_width,
            block_count: 0,
            exposure_hours: 0.0,
        })
        .collect();
    for block in table.iter() {
        if let Some(dec) = block.mean_dec {
            let index = (((dec + 90.0) / bin_width).floor().max(0.0) as usize).min(DEC_BINS - 1);
            bins[index].block_count += 1;
            bins[index].exposure_hours += block.exposure_hours();
        }
    }
    bins
}

/// Per-proposal census of condensed patterns, most frequent first.
pub fn pattern_census(table: &BlockTable) -> BTreeMap<String, Vec<PatternCount>> {
    let mut census: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for block in table.iter() {
        *census
            .entry(block.proposal_id.clone())
            .or_default()
            .entry(block.pattern_signature())
            .or_insert(0) += 1;
    }
    census
        .into_iter()
        .map(|(proposal, patterns)| {
            let mut counts: Vec<PatternCount> = patterns
                .into_iter()
                .map(|(pattern, block_count)| PatternCount {
                    pattern,
                    block_count,
                })
                .collect();
            counts.sort_by(|a, b| b.block_count.cmp(&a.block_count).then(a.pattern.cmp(&b.pattern)));
            (proposal, counts)
        })
        .collect()
}

/// Frame start times binned into 15-minute-of-day slots, per observation
/// type. Feeds the stacked time-of-day distribution chart.
pub fn time_of_day_distribution(frames: &[FrameRecord]) -> BTreeMap<String, Vec<usize>> {
    let mut distribution: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for frame in frames {
        let bin = (frame.observed_at.hour() * 4 + frame.observed_at.minute() / 15) as usize;
        let bins = distribution
            .entry(frame.observation_type.clone())
            .or_insert_with(|| vec![0; TIME_BINS_PER_DAY]);
        bins[bin] += 1;
    }
    distribution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BlockUid, RequestNum};
    use crate::models::block::{Block, Target, ValueSet};
    use chrono::NaiveDate;

    fn block(
        proposal: &str,
        orphan: bool,
        moving: bool,
        duration_h: f64,
        exposure_h: f64,
        centroid: Option<(f64, f64)>,
        instrument: &str,
    ) -> Block {
        let start = NaiveDate::from_ymd_opt(2016, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        Block {
            block_id: BlockUid::new(1),
            proposal_id: proposal.into(),
            start_time: start,
            end_time: start + chrono::Duration::seconds((duration_h * 3600.0) as i64),
            duration_seconds: duration_h * 3600.0,
            exposure_sum_seconds: exposure_h * 3600.0,
            science_exposure_sum_seconds: exposure_h * 1800.0,
            time_efficiency: 0.5,
            science_efficiency_of_exposure: 0.5,
            science_efficiency_of_duration: 0.25,
            largest_gap_seconds: 0.0,
            target: Target::Single("M31".into()),
            target_anomaly: false,
            mean_ra: centroid.map(|c| c.0),
            mean_dec: centroid.map(|c| c.1),
            is_moving: moving,
            pattern: vec![],
            is_science: true,
            is_orphan: orphan,
            request_ids: ValueSet::Single(RequestNum::new(1)),
            instruments: ValueSet::Single(instrument.into()),
            frame_count: 1,
        }
    }

    #[test]
    fn test_orphan_summary() {
        let table = BlockTable::new(vec![
            block("LCO2016A-005", true, false, 1.0, 0.5, None, "kb29"),
            block("LCO2016A-005", false, false, 3.0, 2.0, None, "kb29"),
            block("LCO2016A-009", false, false, 2.0, 1.0, None, "kb29"),
        ]);
        let summary = orphan_summary(&table);

        let a = &summary["LCO2016A-005"];
        assert_eq!(a.orphaned_count, 1);
        assert_eq!(a.attributed_count, 1);
        assert!((a.orphaned_fraction.unwrap() - 0.25).abs() < 1e-9);

        let b = &summary["LCO2016A-009"];
        assert_eq!(b.orphaned_count, 0);
        assert!((b.orphaned_fraction.unwrap()).abs() < 1e-9);
    }

    #[test]
    fn test_orphan_fraction_undefined_without_duration() {
        let table = BlockTable::new(vec![block(
            "LCO2016A-005",
            false,
            false,
            0.0,
            0.0,
            None,
            "kb29",
        )]);
        let summary = orphan_summary(&table);
        assert_eq!(summary["LCO2016A-005"].orphaned_fraction, None);
    }

    #[test]
    fn test_motion_summary() {
        let table = BlockTable::new(vec![
            block("LCO2016A-005", false, true, 1.0, 1.0, None, "kb29"),
            block("LCO2016A-005", false, false, 1.0, 3.0, None, "kb29"),
        ]);
        let summary = motion_summary(&table);
        let s = &summary["LCO2016A-005"];
        assert_eq!(s.moving_count, 1);
        assert_eq!(s.stationary_count, 1);
        assert!((s.moving_fraction - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_instrument_usage_counts_each_contributor() {
        let mut multi = block("LCO2016A-005", false, false, 1.0, 2.0, None, "kb29");
        multi.instruments = ValueSet::Many(vec!["en05".into(), "kb29".into()]);
        let table = BlockTable::new(vec![
            multi,
            block("LCO2016A-005", false, false, 1.0, 1.0, None, "kb29"),
        ]);
        let usage = instrument_usage(&table);
        let per_proposal = &usage["LCO2016A-005"];
        assert_eq!(per_proposal["kb29"].block_count, 2);
        assert_eq!(per_proposal["en05"].block_count, 1);
        assert!((per_proposal["kb29"].exposure_hours - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_ra_histogram_binning() {
        let table = BlockTable::new(vec![
            block("P", false, false, 1.0, 1.0, Some((0.0, 0.0)), "kb29"),
            block("P", false, false, 1.0, 1.0, Some((3.70, 0.0)), "kb29"),
            block("P", false, false, 1.0, 1.0, Some((359.9, 0.0)), "kb29"),
            block("P", false, false, 1.0, 1.0, None, "kb29"),
        ]);
        let bins = ra_histogram(&table);
        assert_eq!(bins.len(), RA_BINS);
        assert_eq!(bins[0].block_count, 2);
        assert_eq!(bins[RA_BINS - 1].block_count, 1);
        assert_eq!(bins.iter().map(|b| b.block_count).sum::<usize>(), 3);
    }

    #[test]
    fn test_dec_histogram_binning() {
        let table = BlockTable::new(vec![
            block("P", false, false, 1.0, 1.0, Some((0.0, -90.0)), "kb29"),
            block("P", false, false, 1.0, 1.0, Some((0.0, -25.0)), "kb29"),
            block("P", false, false, 1.0, 1.0, Some((0.0, 89.9)), "kb29"),
        ]);
        let bins = dec_histogram(&table);
        assert_eq!(bins.len(), DEC_BINS);
        assert_eq!(bins[0].block_count, 1);
        assert_eq!(bins[6].block_count, 1);
        assert_eq!(bins[DEC_BINS - 1].block_count, 1);
        assert_eq!(bins[6].lower_edge_deg, -30.0);
    }

    #[test]
    fn test_pattern_census_orders_by_frequency() {
        use crate::models::block::{PatternEntry, PatternStep};

        let step = |exp: f64| PatternStep {
            exposure_seconds: exp,
            instrument: "kb29".into(),
            filter: "rp".into(),
            observation_type: "EXPOSE".into(),
        };
        let mut common = block("P", false, false, 1.0, 1.0, None, "kb29");
        common.pattern = vec![PatternEntry { step: step(60.0), repeat: 3 }];
        let mut rare = block("P", false, false, 1.0, 1.0, None, "kb29");
        rare.pattern = vec![PatternEntry { step: step(120.0), repeat: 1 }];

        let table = BlockTable::new(vec![common.clone(), common, rare]);
        let census = pattern_census(&table);
        let counts = &census["P"];
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].block_count, 2);
        assert!(counts[0].pattern.contains("3x(60s"));
        assert_eq!(counts[1].block_count, 1);
    }

    #[test]
    fn test_efficiency_summary() {
        let table = BlockTable::new(vec![
            block("P", false, false, 2.0, 2.0, None, "kb29"),
            block("P", false, false, 2.0, 1.0, None, "kb29"),
        ]);
        let summary = efficiency_summary(&table);
        assert!((summary["P"].exposure_hours - 3.0).abs() < 1e-9);
        assert!((summary["P"].science_exposure_hours - 1.5).abs() < 1e-9);
    }
}
