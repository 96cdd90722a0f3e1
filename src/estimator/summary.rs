use crate::estimator::calculator::CrowdIndexEngine;
use crate::estimator::types::{Confidence, CrowdIndexResult};
use crate::profile::EngineConfig;
use crate::store::{DataSource, SqliteStore, StoreError, WaitStore};
use crate::timestamp::{TimestampError, parse_timestamp};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, info, warn};

/// Crowd indexes for several parks at the store's latest sample timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrowdSummary {
    pub timestamp: String,
    pub parks: BTreeMap<String, CrowdIndexResult>,
}

impl CrowdSummary {
    pub fn get(&self, park: &str) -> Option<&CrowdIndexResult> {
        self.parks.get(park)
    }

    pub fn high_confidence_count(&self) -> usize {
        self.parks
            .values()
            .filter(|r| r.confidence == Confidence::High)
            .count()
    }
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("crowd data unavailable: {0}")]
    Unavailable(#[from] StoreError),
    #[error("no wait samples recorded yet")]
    NoData,
    #[error("latest sample timestamp is unusable: {0}")]
    InvalidLatestTimestamp(#[from] TimestampError),
}

/// Summarizes `parks` against an already open store.
pub fn summarize<S: WaitStore>(
    store: &S,
    config: &EngineConfig,
    parks: &[String],
) -> Result<CrowdSummary, SummaryError> {
    let latest = store.latest_timestamp()?.ok_or(SummaryError::NoData)?;
    parse_timestamp(&latest)?;

    let engine = CrowdIndexEngine::new(store, config)?;
    let parks = parks
        .iter()
        .map(|park| (park.clone(), engine.calculate(park, &latest)))
        .collect();

    Ok(CrowdSummary {
        timestamp: latest,
        parks,
    })
}

#[tracing::instrument(skip(config), fields(db = %source.path.display()))]
pub fn crowd_index_summary(
    source: &DataSource,
    config: &EngineConfig,
    parks: &[String],
) -> Result<CrowdSummary, SummaryError> {
    let store = SqliteStore::open(source)?;
    summarize(&store, config, parks)
}

/// Dashboard entry point: `None` means the caller must show a "data
/// unavailable" state rather than a score.
pub fn get_crowd_index_summary(
    source: &DataSource,
    config: &EngineConfig,
    parks: &[String],
) -> Option<CrowdSummary> {
    match crowd_index_summary(source, config, parks) {
        Ok(summary) => {
            info!(
                timestamp = %summary.timestamp,
                parks = summary.parks.len(),
                high_confidence = summary.high_confidence_count(),
                "Crowd index summary ready"
            );
            Some(summary)
        }
        Err(SummaryError::NoData) => {
            warn!("No wait samples in store, no summary available");
            None
        }
        Err(e) => {
            error!(error = %e, "Crowd index summary unavailable");
            None
        }
    }
}
