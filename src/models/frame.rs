//! Raw archive frame records and their validated, typed form.
//!
//! [`RawFrame`] mirrors the archive API's native field names (`DATE_OBS`,
//! `EXPTIME`, ...) and tolerates the format quirks the archive actually
//! exhibits: numeric fields encoded as strings, an empty `PROPID`, a missing
//! or malformed `area` footprint. [`FrameRecord`] is the strongly-typed form
//! every downstream stage operates on; it is produced once, at the ingestion
//! boundary, and never looked up dynamically again.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use crate::api::{BlockUid, FrameId, RequestNum};
use crate::config::NO_PROPOSAL;
use crate::error::PipelineError;
use crate::models::time::parse_archive_timestamp;

/// One exposure record as reported by the archive, prior to validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFrame {
    pub id: i64,
    #[serde(rename = "DATE_OBS")]
    pub date_obs: String,
    #[serde(rename = "EXPTIME", deserialize_with = "f64_flexible", default)]
    pub exptime: f64,
    #[serde(rename = "FILTER", default)]
    pub filter: String,
    #[serde(rename = "INSTRUME", default)]
    pub instrume: String,
    #[serde(rename = "OBJECT", default)]
    pub object: String,
    #[serde(rename = "OBSTYPE", default)]
    pub obstype: String,
    #[serde(rename = "RLEVEL", deserialize_with = "i64_flexible", default)]
    pub rlevel: i64,
    #[serde(rename = "PROPID", default)]
    pub propid: Option<String>,
    #[serde(rename = "REQNUM", deserialize_with = "i64_flexible", default)]
    pub reqnum: i64,
    #[serde(rename = "BLKUID", deserialize_with = "i64_flexible", default)]
    pub blkuid: i64,
    /// Footprint polygon, kept as raw JSON: the archive sometimes omits it
    /// or reports degenerate shapes, and a missing centroid is ordinary
    /// optional data rather than an error.
    #[serde(default)]
    pub area: Option<serde_json::Value>,
}

/// One exposure after normalization, the canonical record downstream
/// stages consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub id: FrameId,
    pub observed_at: NaiveDateTime,
    pub exposure_seconds: f64,
    pub filter: String,
    pub instrument: String,
    pub object_name: String,
    pub observation_type: String,
    pub reduction_level: i64,
    pub proposal_id: String,
    pub request_id: RequestNum,
    pub block_id: BlockUid,
    /// Footprint centroid right ascension, degrees in `[0, 360)`.
    pub ra: Option<f64>,
    /// Footprint centroid declination, degrees.
    pub dec: Option<f64>,
}

impl FrameRecord {
    /// Validate and normalize a raw archive record.
    ///
    /// Timestamp parse failure is the only error path; everything else
    /// (missing footprint, empty proposal) is normalized, not rejected.
    pub fn from_raw(raw: &RawFrame) -> Result<Self, PipelineError> {
        let observed_at = parse_archive_timestamp(&raw.date_obs, raw.id)?;
        let (ra, dec) = match raw.area.as_ref().and_then(footprint_centroid) {
            Some((ra, dec)) => (Some(ra), Some(dec)),
            None => (None, None),
        };

        Ok(FrameRecord {
            id: FrameId::new(raw.id),
            observed_at,
            // Exposure times are non-negative by definition; a negative
            // value from the archive is clamped rather than propagated into
            // duration arithmetic.
            exposure_seconds: raw.exptime.max(0.0),
            filter: raw.filter.clone(),
            instrument: raw.instrume.clone(),
            object_name: raw.object.clone(),
            observation_type: raw.obstype.clone(),
            reduction_level: raw.rlevel,
            proposal_id: normalize_proposal_id(raw.propid.as_deref()),
            request_id: RequestNum::new(raw.reqnum),
            block_id: BlockUid::new(raw.blkuid),
            ra,
            dec,
        })
    }
}

/// Empty proposal ids become the `no_proposal` sentinel.
pub fn normalize_proposal_id(propid: Option<&str>) -> String {
    match propid {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => NO_PROPOSAL.to_string(),
    }
}

/// Mean (RA, Dec) of the footprint's corner coordinates, with RA folded
/// into `[0, 360)`. Returns `None` for absent or malformed footprints.
pub fn footprint_centroid(area: &serde_json::Value) -> Option<(f64, f64)> {
    let ring = area.get("coordinates")?.get(0)?.as_array()?;
    if ring.is_empty() {
        return None;
    }

    let mut ra_sum = 0.0;
    let mut dec_sum = 0.0;
    for corner in ring {
        let corner = corner.as_array()?;
        ra_sum += corner.first()?.as_f64()?;
        dec_sum += corner.get(1)?.as_f64()?;
    }

    let mut mean_ra = ra_sum / ring.len() as f64;
    if mean_ra < 0.0 {
        mean_ra += 360.0;
    }
    Some((mean_ra, dec_sum / ring.len() as f64))
}

/// Accept a JSON number, a numeric string (the archive emits both), or null.
fn f64_flexible<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Value {
        Num(f64),
        Str(String),
        Null,
    }
    match Value::deserialize(deserializer)? {
        Value::Num(v) => Ok(v),
        Value::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Value::Null => Ok(0.0),
    }
}

/// Accept a JSON integer, a numeric string, or null.
fn i64_flexible<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Value {
        Num(i64),
        Str(String),
        Null,
    }
    match Value::deserialize(deserializer)? {
        Value::Num(v) => Ok(v),
        Value::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Value::Null => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_frame_json() -> serde_json::Value {
        json!({
            "id": 7001,
            "DATE_OBS": "2016-03-01T12:30:45.500Z",
            "EXPTIME": "120.000",
            "FILTER": "rp",
            "INSTRUME": "kb29",
            "OBJECT": "NGC 1234",
            "OBSTYPE": "EXPOSE",
            "RLEVEL": 91,
            "PROPID": "LCO2016A-005",
            "REQNUM": 400123,
            "BLKUID": 900001,
            "area": {
                "type": "Polygon",
                "coordinates": [[[10.0, -30.0], [10.2, -30.0], [10.2, -30.2], [10.0, -30.2]]]
            }
        })
    }

    #[test]
    fn test_parse_raw_frame() {
        let raw: RawFrame = serde_json::from_value(raw_frame_json()).unwrap();
        let frame = FrameRecord::from_raw(&raw).unwrap();

        assert_eq!(frame.id.value(), 7001);
        assert_eq!(frame.exposure_seconds, 120.0);
        assert_eq!(frame.proposal_id, "LCO2016A-005");
        assert_eq!(frame.block_id.value(), 900001);
        assert!((frame.ra.unwrap() - 10.1).abs() < 1e-9);
        assert!((frame.dec.unwrap() + 30.1).abs() < 1e-9);
    }

    #[test]
    fn test_empty_propid_normalized() {
        let mut value = raw_frame_json();
        value["PROPID"] = json!("");
        let raw: RawFrame = serde_json::from_value(value).unwrap();
        let frame = FrameRecord::from_raw(&raw).unwrap();
        assert_eq!(frame.proposal_id, NO_PROPOSAL);
    }

    #[test]
    fn test_missing_propid_normalized() {
        let mut value = raw_frame_json();
        value.as_object_mut().unwrap().remove("PROPID");
        let raw: RawFrame = serde_json::from_value(value).unwrap();
        let frame = FrameRecord::from_raw(&raw).unwrap();
        assert_eq!(frame.proposal_id, NO_PROPOSAL);
    }

    #[test]
    fn test_missing_area_yields_no_centroid() {
        let mut value = raw_frame_json();
        value.as_object_mut().unwrap().remove("area");
        let raw: RawFrame = serde_json::from_value(value).unwrap();
        let frame = FrameRecord::from_raw(&raw).unwrap();
        assert_eq!(frame.ra, None);
        assert_eq!(frame.dec, None);
    }

    #[test]
    fn test_malformed_area_yields_no_centroid() {
        let malformed = json!({"coordinates": "not-a-ring"});
        assert_eq!(footprint_centroid(&malformed), None);
        assert_eq!(footprint_centroid(&json!({"coordinates": [[]]})), None);
        assert_eq!(footprint_centroid(&json!({})), None);
    }

    #[test]
    fn test_negative_mean_ra_wraps() {
        let area = json!({
            "coordinates": [[[-10.2, 5.0], [-9.8, 5.0], [-10.2, 5.4], [-9.8, 5.4]]]
        });
        let (ra, dec) = footprint_centroid(&area).unwrap();
        assert!((ra - 350.0).abs() < 1e-9);
        assert!((dec - 5.2).abs() < 1e-9);
    }

    #[test]
    fn test_timestamp_without_fraction() {
        let mut value = raw_frame_json();
        value["DATE_OBS"] = json!("2016-03-01T12:30:45Z");
        let raw: RawFrame = serde_json::from_value(value).unwrap();
        assert!(FrameRecord::from_raw(&raw).is_ok());
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let mut value = raw_frame_json();
        value["DATE_OBS"] = json!("01/03/2016 12:30");
        let raw: RawFrame = serde_json::from_value(value).unwrap();
        assert!(FrameRecord::from_raw(&raw).is_err());
    }
}
