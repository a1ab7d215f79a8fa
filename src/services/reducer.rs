//! Duplicate-frame reduction.
//!
//! The archive stores every reduction level of an exposure as a separate
//! record, so one observation instant can appear several times. Reduction
//! keeps exactly one representative per distinct `observed_at` value: the
//! first record, in original input order, among those sharing the maximum
//! reduction level at that instant.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use chrono::NaiveDateTime;
use log::debug;

use crate::error::PipelineError;
use crate::models::frame::FrameRecord;

/// Collapse duplicate/reprocessed frames to one representative per
/// observation instant. Output is sorted by `observed_at`.
///
/// The output count must equal the number of distinct observation instants
/// in the input; a mismatch is surfaced as
/// [`PipelineError::ReductionConsistency`], never silently corrected.
pub fn reduce_frames(frames: Vec<FrameRecord>) -> Result<Vec<FrameRecord>, PipelineError> {
    let input_count = frames.len();
    let mut representatives: HashMap<NaiveDateTime, FrameRecord> =
        HashMap::with_capacity(input_count);

    for frame in frames {
        match representatives.entry(frame.observed_at) {
            // Strictly greater only: on equal reduction levels the earlier
            // record wins, which is the deterministic tie-break.
            Entry::Occupied(mut slot) => {
                if frame.reduction_level > slot.get().reduction_level {
                    slot.insert(frame);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(frame);
            }
        }
    }

    let expected = representatives.len();
    let mut reduced: Vec<FrameRecord> = representatives.into_values().collect();
    reduced.sort_by_key(|f| f.observed_at);

    if reduced.len() != expected {
        return Err(PipelineError::ReductionConsistency {
            expected,
            actual: reduced.len(),
        });
    }

    debug!(
        "reduced {} raw frames to {} observation instants",
        input_count, expected
    );
    Ok(reduced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BlockUid, FrameId, RequestNum};
    use chrono::NaiveDate;

    fn frame(id: i64, second: u32, rlevel: i64) -> FrameRecord {
        FrameRecord {
            id: FrameId::new(id),
            observed_at: NaiveDate::from_ymd_opt(2016, 3, 1)
                .unwrap()
                .and_hms_opt(12, 0, second)
                .unwrap(),
            exposure_seconds: 10.0,
            filter: "rp".into(),
            instrument: "kb29".into(),
            object_name: "M31".into(),
            observation_type: "EXPOSE".into(),
            reduction_level: rlevel,
            proposal_id: "LCO2016A-005".into(),
            request_id: RequestNum::new(1),
            block_id: BlockUid::new(1),
            ra: None,
            dec: None,
        }
    }

    #[test]
    fn test_keeps_max_reduction_level() {
        let reduced = reduce_frames(vec![frame(1, 0, 0), frame(2, 0, 91), frame(3, 0, 11)]).unwrap();
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].id.value(), 2);
        assert_eq!(reduced[0].reduction_level, 91);
    }

    #[test]
    fn test_ties_break_on_original_order() {
        let reduced = reduce_frames(vec![frame(4, 0, 91), frame(5, 0, 91)]).unwrap();
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].id.value(), 4);
    }

    #[test]
    fn test_count_equals_distinct_instants() {
        let frames = vec![
            frame(1, 0, 0),
            frame(2, 0, 91),
            frame(3, 5, 0),
            frame(4, 10, 91),
            frame(5, 10, 0),
        ];
        let reduced = reduce_frames(frames).unwrap();
        assert_eq!(reduced.len(), 3);
        // Sorted by time.
        assert!(reduced.windows(2).all(|w| w[0].observed_at < w[1].observed_at));
    }

    #[test]
    fn test_idempotent() {
        let frames = vec![frame(1, 0, 0), frame(2, 0, 91), frame(3, 7, 11)];
        let once = reduce_frames(frames).unwrap();
        let twice = reduce_frames(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_input() {
        assert!(reduce_frames(vec![]).unwrap().is_empty());
    }
}
