//! Result and error types produced by the estimator.

use crate::store::StoreError;
use crate::timestamp::TimestampError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Reliability rating of a crowd index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
    /// The calculation failed; metrics are zeroed.
    Error,
}

impl Confidence {
    /// Rates a pass rate in `0.0..=1.0`: at least 0.8 is High, at least 0.5 is Medium.
    pub fn from_pass_rate(rate: f64) -> Self {
        match rate {
            r if r >= 0.8 => Confidence::High,
            r if r >= 0.5 => Confidence::Medium,
            _ => Confidence::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "Low",
            Confidence::Medium => "Medium",
            Confidence::High => "High",
            Confidence::Error => "Error",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CrowdIndexError {
    #[error(transparent)]
    InvalidTimestamp(#[from] TimestampError),
    #[error("no profile configured for park '{0}'")]
    UnknownPark(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidTimestamp,
    UnknownPark,
    Store,
}

/// Why a result carries [`Confidence::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&CrowdIndexError> for Failure {
    fn from(err: &CrowdIndexError) -> Self {
        let kind = match err {
            CrowdIndexError::InvalidTimestamp(_) => FailureKind::InvalidTimestamp,
            CrowdIndexError::UnknownPark(_) => FailureKind::UnknownPark,
            CrowdIndexError::Store(_) => FailureKind::Store,
        };
        Failure {
            kind,
            message: err.to_string(),
        }
    }
}

/// Crowd index for one park at one evaluation timestamp. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrowdIndexResult {
    pub timestamp: String,
    pub crowd_index: u8,
    /// Weighted average of the latest wait per attraction, minutes.
    pub avg_wait: f64,
    pub max_wait: i64,
    pub attractions_operating: u32,
    pub attractions_total: u32,
    /// Valid samples in the window, before de-duplication.
    pub data_points: u32,
    pub confidence: Confidence,
    /// Weighted average wait over the historical baseline.
    pub baseline_comparison: f64,
    pub historical_baseline: f64,
    /// Operating attractions relative to the expected operating share, 0.0–1.0.
    pub operating_ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

impl CrowdIndexResult {
    /// Zero-valued result with the given confidence.
    pub fn zeroed(timestamp: &str, confidence: Confidence) -> Self {
        Self {
            timestamp: timestamp.to_string(),
            crowd_index: 0,
            avg_wait: 0.0,
            max_wait: 0,
            attractions_operating: 0,
            attractions_total: 0,
            data_points: 0,
            confidence,
            baseline_comparison: 0.0,
            historical_baseline: 0.0,
            operating_ratio: 0.0,
            failure: None,
        }
    }

    /// No usable samples in the window: the park may simply be closed.
    pub fn empty(timestamp: &str) -> Self {
        Self::zeroed(timestamp, Confidence::Low)
    }

    pub fn failed(timestamp: &str, err: &CrowdIndexError) -> Self {
        Self {
            failure: Some(Failure::from(err)),
            ..Self::zeroed(timestamp, Confidence::Error)
        }
    }

    pub fn is_error(&self) -> bool {
        self.confidence == Confidence::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_from_pass_rate() {
        assert_eq!(Confidence::from_pass_rate(1.0), Confidence::High);
        assert_eq!(Confidence::from_pass_rate(0.8), Confidence::High);
        assert_eq!(Confidence::from_pass_rate(0.75), Confidence::Medium);
        assert_eq!(Confidence::from_pass_rate(0.5), Confidence::Medium);
        assert_eq!(Confidence::from_pass_rate(0.25), Confidence::Low);
        assert_eq!(Confidence::from_pass_rate(0.0), Confidence::Low);
    }

    #[test]
    fn test_failed_result_is_zeroed() {
        let err = CrowdIndexError::UnknownPark("Nowhere".to_string());
        let result = CrowdIndexResult::failed("2025-07-02T14:00:00Z", &err);

        assert!(result.is_error());
        assert_eq!(result.crowd_index, 0);
        assert_eq!(result.attractions_operating, 0);
        let failure = result.failure.unwrap();
        assert_eq!(failure.kind, FailureKind::UnknownPark);
        assert!(failure.message.contains("Nowhere"));
    }

    #[test]
    fn test_serializes_without_failure_field_when_ok() {
        let json = serde_json::to_value(CrowdIndexResult::empty("t")).unwrap();
        assert_eq!(json["confidence"], "Low");
        assert!(json.get("failure").is_none());
    }
}
