//! Derived per-block records.
//!
//! A [`Block`] aggregates one scheduler-assigned run of frames sharing a
//! `BLKUID`. Blocks are recomputed fresh from each batch of frames and are
//! never mutated after construction.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::api::{BlockUid, RequestNum};

/// A block's extracted target identifier.
///
/// Usually a single object name; blocks whose frames disagree on object
/// name (beyond the recognised spectroscopic settle case) carry the sorted
/// tuple of all distinct names, flagged as an extraction anomaly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    Single(String),
    Multiple(Vec<String>),
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Single(name) => write!(f, "{name}"),
            Target::Multiple(names) => write!(f, "{}", names.join("+")),
        }
    }
}

/// A set of contributing identifiers: a bare value when homogeneous,
/// otherwise the sorted tuple of distinct values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSet<T> {
    Single(T),
    Many(Vec<T>),
}

impl<T: Ord + Clone> ValueSet<T> {
    /// Collapse an iterator of values into the singular/tuple form.
    ///
    /// Returns `Many(vec![])` for empty input; extraction never produces
    /// that case because every block has at least one frame.
    pub fn from_values<I: IntoIterator<Item = T>>(values: I) -> Self {
        let mut distinct: Vec<T> = values.into_iter().collect();
        distinct.sort();
        distinct.dedup();
        if distinct.len() == 1 {
            ValueSet::Single(distinct.remove(0))
        } else {
            ValueSet::Many(distinct)
        }
    }
}

impl<T> ValueSet<T> {
    pub fn len(&self) -> usize {
        match self {
            ValueSet::Single(_) => 1,
            ValueSet::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        match self {
            ValueSet::Single(v) => v == value,
            ValueSet::Many(values) => values.contains(value),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        match self {
            ValueSet::Single(v) => std::slice::from_ref(v).iter(),
            ValueSet::Many(values) => values.iter(),
        }
    }
}

impl<T: std::fmt::Display> std::fmt::Display for ValueSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSet::Single(v) => write!(f, "{v}"),
            ValueSet::Many(values) => {
                let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", rendered.join("+"))
            }
        }
    }
}

/// One step of a block's structural fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternStep {
    pub exposure_seconds: f64,
    pub instrument: String,
    pub filter: String,
    pub observation_type: String,
}

impl std::fmt::Display for PatternStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}s {} {} {}",
            self.exposure_seconds, self.instrument, self.filter, self.observation_type
        )
    }
}

/// A run-length-encoded entry of a block's pattern: `repeat` consecutive
/// frames sharing the same step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub step: PatternStep,
    pub repeat: usize,
}

/// A reconstructed scheduling block with its derived quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub block_id: BlockUid,
    pub proposal_id: String,
    pub start_time: NaiveDateTime,
    /// Latest frame's start plus that frame's exposure time.
    pub end_time: NaiveDateTime,
    pub duration_seconds: f64,
    /// Sum of all frame exposures, with a small epsilon added so downstream
    /// ratios over this value never divide by zero.
    pub exposure_sum_seconds: f64,
    /// Exposure sum restricted to science observation types.
    pub science_exposure_sum_seconds: f64,
    /// `exposure_sum_seconds / duration_seconds`. May exceed 1 when the
    /// archive reports overlapping exposures; that is expected, not a bug.
    pub time_efficiency: f64,
    pub science_efficiency_of_exposure: f64,
    pub science_efficiency_of_duration: f64,
    /// Largest idle gap between the end of one frame and the start of the
    /// next, floored at zero.
    pub largest_gap_seconds: f64,
    pub target: Target,
    /// True when target extraction fell back to the multi-valued form.
    pub target_anomaly: bool,
    pub mean_ra: Option<f64>,
    pub mean_dec: Option<f64>,
    /// True if the centroid moved more than the configured threshold
    /// between the block's first and last frame.
    pub is_moving: bool,
    /// Condensed chronological fingerprint of the block's structure.
    pub pattern: Vec<PatternEntry>,
    /// True when the block belongs to a science proposal.
    pub is_science: bool,
    /// True when a science-proposal block contains no science-type frames.
    pub is_orphan: bool,
    pub request_ids: ValueSet<RequestNum>,
    pub instruments: ValueSet<String>,
    pub frame_count: usize,
}

impl Block {
    /// Expand the condensed pattern back into the per-frame step sequence.
    pub fn expanded_pattern(&self) -> Vec<PatternStep> {
        self.pattern
            .iter()
            .flat_map(|entry| std::iter::repeat_n(entry.step.clone(), entry.repeat))
            .collect()
    }

    /// Stable textual form of the pattern, usable as a grouping key.
    pub fn pattern_signature(&self) -> String {
        let parts: Vec<String> = self
            .pattern
            .iter()
            .map(|entry| format!("{}x({})", entry.repeat, entry.step))
            .collect();
        parts.join(" | ")
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_seconds / 3600.0
    }

    pub fn exposure_hours(&self) -> f64 {
        self.exposure_sum_seconds / 3600.0
    }

    pub fn science_exposure_hours(&self) -> f64 {
        self.science_exposure_sum_seconds / 3600.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_set_single() {
        let set = ValueSet::from_values(vec![5, 5, 5]);
        assert_eq!(set, ValueSet::Single(5));
        assert_eq!(set.len(), 1);
        assert!(set.contains(&5));
    }

    #[test]
    fn test_value_set_many_sorted_distinct() {
        let set = ValueSet::from_values(vec![3, 1, 3, 2]);
        assert_eq!(set, ValueSet::Many(vec![1, 2, 3]));
        assert_eq!(set.to_string(), "1+2+3");
    }

    #[test]
    fn test_target_display() {
        assert_eq!(Target::Single("M31".into()).to_string(), "M31");
        assert_eq!(
            Target::Multiple(vec!["CAL".into(), "M31".into()]).to_string(),
            "CAL+M31"
        );
    }

    #[test]
    fn test_value_set_serializes_untagged() {
        let single = ValueSet::Single(7);
        assert_eq!(serde_json::to_string(&single).unwrap(), "7");
        let many = ValueSet::Many(vec![1, 2]);
        assert_eq!(serde_json::to_string(&many).unwrap(), "[1,2]");
    }
}
