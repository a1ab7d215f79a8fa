//! Pipeline configuration.
//!
//! Every stage receives an explicit, immutable [`PipelineConfig`] value
//! instead of reaching for shared module state. The defaults reproduce the
//! behaviour of the LCO archive analysis this pipeline was built for; all
//! values can be overridden from a TOML file.

use serde::{Deserialize, Serialize};

/// Default structural pattern for science proposal identifiers,
/// e.g. `LCO2016A-005`: word characters, four digits, one word character,
/// a hyphen, digits. This is a syntactic convention of the archive's
/// proposal-id scheme.
pub const SCIENCE_PROPOSAL_PATTERN: &str = r"^\w+\d{4}\w-\d+";

/// Sentinel proposal id substituted for frames with an empty `PROPID`.
pub const NO_PROPOSAL: &str = "no_proposal";

/// How to extract a block's target when its frames disagree on object name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPolicy {
    /// Spectroscopic sequences often open with an arc and a lamp flat taken
    /// before the slew completed, so the first two frames may carry a stale
    /// object name. If every frame in the block is one of the spectral
    /// calibration types, trust the object name agreed on from the third
    /// frame onward.
    SettleAware,
    /// No special cases: any object-name multiplicity is an anomaly.
    Strict,
}

/// Immutable configuration for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Observation types counted as science exposures.
    pub science_obstypes: Vec<String>,
    /// Observation types of a spectroscopic sequence, used by the
    /// `SettleAware` target policy.
    pub spectral_obstypes: Vec<String>,
    /// Regex distinguishing science proposal ids from engineering and
    /// calibration ones.
    pub science_proposal_pattern: String,
    /// Angular threshold (degrees) on |ΔRA| or |ΔDec| between a block's
    /// first and last frame above which the target is flagged as moving.
    ///
    /// Historical analysis notes describe this threshold as ~4 arcsec, but
    /// the constant actually applied has always been 0.001 deg (3.6 arcsec).
    /// The constant is authoritative; the notes are wrong.
    pub moving_threshold_deg: f64,
    /// Small positive value added to per-block exposure sums so that
    /// downstream ratios over exposure never divide by zero.
    pub exposure_epsilon_seconds: f64,
    /// When true, frames attributed to non-science proposals are dropped
    /// before block extraction. When false, all frames are kept and
    /// calibration blocks appear alongside science ones.
    pub science_only: bool,
    /// Target extraction policy for blocks with multiple object names.
    pub target_policy: TargetPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            science_obstypes: vec!["EXPOSE".into(), "SPECTRUM".into()],
            spectral_obstypes: vec!["SPECTRUM".into(), "ARC".into(), "LAMPFLAT".into()],
            science_proposal_pattern: SCIENCE_PROPOSAL_PATTERN.to_string(),
            moving_threshold_deg: 0.001,
            exposure_epsilon_seconds: 1e-6,
            science_only: true,
            target_policy: TargetPolicy::SettleAware,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from TOML. Missing keys fall back to defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    /// True if `observation_type` counts as a science exposure.
    pub fn is_science_obstype(&self, observation_type: &str) -> bool {
        self.science_obstypes.iter().any(|t| t == observation_type)
    }

    /// True if `observation_type` belongs to a spectroscopic sequence.
    pub fn is_spectral_obstype(&self, observation_type: &str) -> bool {
        self.spectral_obstypes.iter().any(|t| t == observation_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert!(config.is_science_obstype("EXPOSE"));
        assert!(config.is_science_obstype("SPECTRUM"));
        assert!(!config.is_science_obstype("ARC"));
        assert!(config.is_spectral_obstype("LAMPFLAT"));
        assert_eq!(config.moving_threshold_deg, 0.001);
        assert_eq!(config.target_policy, TargetPolicy::SettleAware);
        assert!(config.science_only);
    }

    #[test]
    fn test_from_toml_overrides() {
        let toml_str = r#"
            science_only = false
            moving_threshold_deg = 0.002
            target_policy = "strict"
        "#;
        let config = PipelineConfig::from_toml_str(toml_str).unwrap();
        assert!(!config.science_only);
        assert_eq!(config.moving_threshold_deg, 0.002);
        assert_eq!(config.target_policy, TargetPolicy::Strict);
        // Unset keys keep their defaults.
        assert_eq!(config.science_obstypes, vec!["EXPOSE", "SPECTRUM"]);
    }

    #[test]
    fn test_from_toml_invalid() {
        assert!(PipelineConfig::from_toml_str("science_only = \"maybe\"").is_err());
    }
}
