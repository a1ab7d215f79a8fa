//! Timestamp parsing and arithmetic for archive observation times.

use chrono::{Duration, NaiveDateTime};

use crate::error::PipelineError;

/// Archive timestamp format with fractional seconds. `%.f` consumes the
/// leading dot and scales the digits as a true fraction of a second.
const DATE_OBS_FORMAT_FRACTIONAL: &str = "%Y-%m-%dT%H:%M:%S%.fZ";
/// Archive timestamp format without fractional seconds.
const DATE_OBS_FORMAT_WHOLE: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Parse an archive `DATE_OBS` value.
///
/// The archive reports timestamps in exactly one of two formats, with or
/// without a fractional-second component. Anything else is a fatal data
/// error: a record with a garbage timestamp cannot be placed on the
/// timeline at all.
pub fn parse_archive_timestamp(value: &str, frame_id: i64) -> Result<NaiveDateTime, PipelineError> {
    NaiveDateTime::parse_from_str(value, DATE_OBS_FORMAT_FRACTIONAL)
        .or_else(|_| NaiveDateTime::parse_from_str(value, DATE_OBS_FORMAT_WHOLE))
        .map_err(|_| PipelineError::Timestamp {
            frame_id,
            value: value.to_string(),
        })
}

/// Signed elapsed time from `start` to `end`, in seconds.
pub fn seconds_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let delta = end - start;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        // Spans beyond ~292k years only arise from corrupt data; millisecond
        // resolution is more than enough there.
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

/// `timestamp` advanced by `seconds` (may be fractional).
pub fn add_seconds(timestamp: NaiveDateTime, seconds: f64) -> NaiveDateTime {
    timestamp + Duration::microseconds((seconds * 1e6).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn test_parse_fractional() {
        let ts = parse_archive_timestamp("2016-03-01T12:30:45.500Z", 1).unwrap();
        assert_eq!(ts.second(), 45);
        assert_eq!(ts.nanosecond(), 500_000_000);
    }

    #[test]
    fn test_parse_whole_seconds() {
        let ts = parse_archive_timestamp("2016-03-01T12:30:45Z", 1).unwrap();
        assert_eq!(ts.second(), 45);
        assert_eq!(ts.nanosecond(), 0);
    }

    #[test]
    fn test_parse_failure_is_fatal() {
        let err = parse_archive_timestamp("2016-03-01 12:30:45", 42).unwrap_err();
        match err {
            PipelineError::Timestamp { frame_id, .. } => assert_eq!(frame_id, 42),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_seconds_between_and_add() {
        let start = NaiveDate::from_ymd_opt(2016, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let end = add_seconds(start, 90.25);
        assert!((seconds_between(start, end) - 90.25).abs() < 1e-9);
        assert!(seconds_between(end, start) < 0.0);
    }
}
