//! Science-proposal classification.
//!
//! Proposal ids at the archive follow a structural convention
//! (`LCO2016A-005`: letters, four-digit semester, semester letter, hyphen,
//! serial). Engineering and calibration proposals (`calibrate`, `Photometric
//! standards`, the `no_proposal` sentinel) do not match it. The pattern is a
//! syntactic convention, not a semantic field, so it lives in configuration
//! rather than inlined logic.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::SCIENCE_PROPOSAL_PATTERN;
use crate::error::PipelineError;

static DEFAULT_MATCHER: Lazy<Regex> =
    Lazy::new(|| Regex::new(SCIENCE_PROPOSAL_PATTERN).expect("default pattern must compile"));

/// Predicate distinguishing science proposal ids from calibration and
/// engineering ones.
#[derive(Debug, Clone)]
pub struct ScienceClassifier {
    matcher: Regex,
}

impl ScienceClassifier {
    /// Build a classifier from a configured pattern.
    pub fn new(pattern: &str) -> Result<Self, PipelineError> {
        Ok(ScienceClassifier {
            matcher: Regex::new(pattern)?,
        })
    }

    /// True if `proposal_id` looks like a science proposal. Total: never
    /// fails, non-matching ids simply return false.
    pub fn is_science(&self, proposal_id: &str) -> bool {
        self.matcher.is_match(proposal_id)
    }
}

impl Default for ScienceClassifier {
    fn default() -> Self {
        ScienceClassifier {
            matcher: DEFAULT_MATCHER.clone(),
        }
    }
}

/// Convenience predicate using the default archive pattern.
pub fn is_science_proposal(proposal_id: &str) -> bool {
    DEFAULT_MATCHER.is_match(proposal_id)
}
