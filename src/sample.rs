//! Wait-time observations as read from the time-series store.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Upstream operating status of an attraction at sample time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    Operating,
    Down,
    Closed,
    Refurbishment,
    Other(String),
}

impl QueueStatus {
    /// Parses the status string stored by the fetchers. Unknown values are kept verbatim.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "OPERATING" => QueueStatus::Operating,
            "DOWN" => QueueStatus::Down,
            "CLOSED" => QueueStatus::Closed,
            "REFURBISHMENT" => QueueStatus::Refurbishment,
            _ => QueueStatus::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            QueueStatus::Operating => "OPERATING",
            QueueStatus::Down => "DOWN",
            QueueStatus::Closed => "CLOSED",
            QueueStatus::Refurbishment => "REFURBISHMENT",
            QueueStatus::Other(raw) => raw,
        }
    }
}

/// One posted-wait observation for one attraction.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitSample {
    pub attraction_id: String,
    pub attraction_name: String,
    pub park: String,
    pub timestamp: DateTime<Utc>,
    pub status: QueueStatus,
    pub wait_minutes: Option<i64>,
}

impl WaitSample {
    /// A sample only counts when the attraction is operating and the posted
    /// wait lies in `0..=max_wait_minutes`. Anything above is upstream noise.
    pub fn is_valid(&self, max_wait_minutes: i64) -> bool {
        self.status == QueueStatus::Operating
            && matches!(self.wait_minutes, Some(w) if (0..=max_wait_minutes).contains(&w))
    }

    /// Posted wait, or 0 for samples without one. Only meaningful after [`Self::is_valid`].
    pub fn wait(&self) -> i64 {
        self.wait_minutes.unwrap_or(0)
    }
}

/// Catalog entry for an attraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attraction {
    pub id: String,
    pub name: String,
    pub park: String,
}

/// Aggregate of posted waits over some lookback window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WaitStats {
    pub avg_wait: Option<f64>,
    pub data_points: u32,
}
