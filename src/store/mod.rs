//! Read-only access to the wait-time store.
//!
//! [`WaitStore`] is the query surface the estimator consumes.
//! [`SqliteStore`] implements it over the live SQLite database written by the
//! fetchers and ETL jobs.

#[cfg(test)]
pub(crate) mod fixtures;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::sample::{Attraction, WaitSample, WaitStats};
use crate::timestamp::TimeWindow;
use chrono::Weekday;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DB_PATH: &str = "data/live.db";
pub const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("query failed: {0}")]
    Query(#[from] rusqlite::Error),
}

/// Where the live store lives and how long to wait on a locked database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub path: PathBuf,
    pub busy_timeout: Duration,
}

impl DataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_secs(DEFAULT_BUSY_TIMEOUT_SECS),
        }
    }

    /// Reads `CROWD_DB_PATH` and `CROWD_DB_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> Self {
        let path = std::env::var("CROWD_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
        let timeout = std::env::var("CROWD_DB_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_BUSY_TIMEOUT_SECS);
        Self {
            path: path.into(),
            busy_timeout: Duration::from_secs(timeout),
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

/// Queries the estimator needs from the time-series store.
///
/// Every window is inclusive of `start`. `samples_in_window` is also
/// inclusive of `end`; the lookback aggregates exclude it.
pub trait WaitStore {
    /// Most recent sample timestamp across all attractions, as stored.
    fn latest_timestamp(&self) -> Result<Option<String>, StoreError>;

    /// Operating samples for `park` in the window with a posted wait in `0..=max_wait`.
    fn samples_in_window(
        &self,
        park: &str,
        window: &TimeWindow,
        max_wait: i64,
    ) -> Result<Vec<WaitSample>, StoreError>;

    /// Number of attractions configured for `park`.
    fn attraction_count(&self, park: &str) -> Result<u32, StoreError>;

    /// Attraction catalog for `park`.
    fn attractions(&self, park: &str) -> Result<Vec<Attraction>, StoreError>;

    /// Average and count of positive operating waits for attractions of
    /// `park` whose name contains `name_pattern`.
    fn wait_stats_matching(
        &self,
        park: &str,
        name_pattern: &str,
        window: &TimeWindow,
    ) -> Result<WaitStats, StoreError>;

    /// Average positive wait per attraction id of `park` over the window.
    fn average_wait_by_attraction(
        &self,
        park: &str,
        window: &TimeWindow,
    ) -> Result<HashMap<String, f64>, StoreError>;

    /// Average operating wait in `(0, max_wait]` for `park` restricted to
    /// UTC hours in `hours` on `weekday`.
    fn average_wait_for_slot(
        &self,
        park: &str,
        hours: RangeInclusive<i64>,
        weekday: Weekday,
        window: &TimeWindow,
        max_wait: i64,
    ) -> Result<Option<f64>, StoreError>;
}
