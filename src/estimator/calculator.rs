use crate::estimator::baseline::estimate_baseline;
use crate::estimator::popularity::{key_attraction_weights, popularity_factor};
use crate::estimator::types::{Confidence, CrowdIndexError, CrowdIndexResult};
use crate::estimator::utility::{pass_rate, round_to, weighted_mean};
use crate::profile::{AttractionTier, EngineConfig, EngineParams, KeyAttractionIndex, ParkProfile};
use crate::sample::WaitSample;
use crate::store::{StoreError, WaitStore};
use crate::timestamp::{TimeWindow, parse_timestamp};
use chrono::{Datelike, Timelike};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Inputs of the final scoring step, once samples have been weighted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInputs {
    pub weighted_avg_wait: f64,
    pub historical_baseline: f64,
    /// Product of the hour-of-day and day-of-week factors.
    pub temporal_factor: f64,
    pub park_weight: f64,
    pub capacity_factor: f64,
    pub attractions_operating: u32,
    pub attractions_total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub crowd_index: u8,
    pub baseline_ratio: f64,
    pub operating_ratio: f64,
}

/// Turns a weighted average wait into a bounded crowd index.
///
/// The wait is compared to the historical baseline (floored at
/// `min_baseline_wait`), scaled to a percentage, divided by the temporal
/// factor so that busy hours and days need more than their usual waits to
/// score high, then normalized by park weight over capacity. Finally the
/// operating ratio scales the score between `operating_floor_weight` and 1.
pub fn crowd_score(inputs: &ScoreInputs, params: &EngineParams) -> Score {
    let baseline_ratio =
        inputs.weighted_avg_wait / inputs.historical_baseline.max(params.min_baseline_wait);
    let raw_score = baseline_ratio * 100.0;
    let adjusted = raw_score / inputs.temporal_factor;
    let park_adjusted = adjusted * inputs.park_weight / inputs.capacity_factor;

    let expected_operating =
        (f64::from(inputs.attractions_total) * params.expected_operating_fraction).max(1.0);
    let operating_ratio = (f64::from(inputs.attractions_operating) / expected_operating).min(1.0);
    let floor = params.operating_floor_weight;
    let final_score = park_adjusted * (floor + (1.0 - floor) * operating_ratio);

    Score {
        crowd_index: final_score.round().clamp(0.0, 100.0) as u8,
        baseline_ratio,
        operating_ratio,
    }
}

/// Keeps the most recent sample of each attraction, ordered by attraction id.
pub fn latest_per_attraction(samples: &[WaitSample]) -> Vec<&WaitSample> {
    let mut latest: HashMap<&str, &WaitSample> = HashMap::new();
    for sample in samples {
        latest
            .entry(sample.attraction_id.as_str())
            .and_modify(|current| {
                let newer = sample.timestamp > current.timestamp
                    || (sample.timestamp == current.timestamp && sample.wait() > current.wait());
                if newer {
                    *current = sample;
                }
            })
            .or_insert(sample);
    }

    let mut rows: Vec<&WaitSample> = latest.into_values().collect();
    rows.sort_by(|a, b| a.attraction_id.cmp(&b.attraction_id));
    rows
}

/// Computes crowd indexes against one store with one configuration.
///
/// Key attractions are resolved against the store's catalog when the engine
/// is built, so a long-lived engine will not notice attractions added later.
pub struct CrowdIndexEngine<'a, S: WaitStore> {
    store: &'a S,
    config: &'a EngineConfig,
    key_index: KeyAttractionIndex,
}

impl<'a, S: WaitStore> CrowdIndexEngine<'a, S> {
    pub fn new(store: &'a S, config: &'a EngineConfig) -> Result<Self, StoreError> {
        let mut key_index = KeyAttractionIndex::default();
        for profile in config.parks.iter() {
            let catalog = store.attractions(&profile.name)?;
            key_index.extend(profile, &catalog);
        }
        debug!(key_attractions = key_index.key_count(), "Resolved key attractions");

        Ok(Self {
            store,
            config,
            key_index,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    /// Crowd index for `park` around `timestamp`. Never fails: errors come
    /// back as a zeroed result with [`Confidence::Error`] and a `failure`.
    #[tracing::instrument(skip(self))]
    pub fn calculate(&self, park: &str, timestamp: &str) -> CrowdIndexResult {
        match self.try_calculate(park, timestamp) {
            Ok(result) => {
                info!(
                    crowd_index = result.crowd_index,
                    confidence = %result.confidence,
                    data_points = result.data_points,
                    "Crowd index calculated"
                );
                result
            }
            Err(e) => {
                warn!(error = %e, "Crowd index calculation failed");
                CrowdIndexResult::failed(timestamp, &e)
            }
        }
    }

    /// Like [`Self::calculate`] but surfaces the failure reason.
    pub fn try_calculate(
        &self,
        park: &str,
        timestamp: &str,
    ) -> Result<CrowdIndexResult, CrowdIndexError> {
        let at = parse_timestamp(timestamp)?;
        let profile = self
            .config
            .parks
            .get(park)
            .ok_or_else(|| CrowdIndexError::UnknownPark(park.to_string()))?;
        let params = &self.config.params;

        let window = TimeWindow::around(at, params.window_minutes)?;
        let mut samples =
            self.store
                .samples_in_window(park, &window, params.max_valid_wait_minutes)?;
        samples.retain(|s| s.is_valid(params.max_valid_wait_minutes));

        if samples.is_empty() {
            debug!(park, "No valid samples in window");
            return Ok(CrowdIndexResult::empty(timestamp));
        }

        let data_points = samples.len() as u32;
        let latest = latest_per_attraction(&samples);
        let attractions_operating = latest.len() as u32;

        let historical_baseline =
            estimate_baseline(self.store, profile, at.hour(), at.weekday(), at, params);

        // Popularity history stops where the evaluation window starts.
        let lookback = TimeWindow::trailing(at, params.popularity_lookback_days, window.start)?;
        let key_weights = key_attraction_weights(self.store, profile, &lookback, params);
        let recent_averages = match self.store.average_wait_by_attraction(park, &lookback) {
            Ok(averages) => averages,
            Err(e) => {
                warn!(park, error = %e, "Recent average query failed, skipping popularity factors");
                HashMap::new()
            }
        };

        let pairs: Vec<(f64, f64)> = latest
            .iter()
            .map(|sample| {
                let recent = recent_averages.get(&sample.attraction_id).copied();
                let weight = self.contribution_weight(sample, profile, &key_weights, recent);
                (sample.wait() as f64, weight)
            })
            .collect();

        let Some(weighted_avg_wait) = weighted_mean(&pairs) else {
            return Ok(CrowdIndexResult {
                attractions_operating,
                data_points,
                ..CrowdIndexResult::empty(timestamp)
            });
        };
        let max_wait = latest.iter().map(|s| s.wait()).max().unwrap_or(0);
        let attractions_total = self.store.attraction_count(park)?;

        let score = crowd_score(
            &ScoreInputs {
                weighted_avg_wait,
                historical_baseline,
                temporal_factor: self.config.temporal.factor(at.hour(), at.weekday()),
                park_weight: profile.weight_factor,
                capacity_factor: profile.capacity_factor,
                attractions_operating,
                attractions_total,
            },
            params,
        );

        let confidence = Confidence::from_pass_rate(pass_rate(&[
            attractions_operating >= 5,
            data_points >= 10,
            score.operating_ratio >= 0.4,
            weighted_avg_wait > 0.0,
        ]));

        Ok(CrowdIndexResult {
            timestamp: timestamp.to_string(),
            crowd_index: score.crowd_index,
            avg_wait: round_to(weighted_avg_wait, 1),
            max_wait,
            attractions_operating,
            attractions_total,
            data_points,
            confidence,
            baseline_comparison: round_to(score.baseline_ratio, 2),
            historical_baseline: round_to(historical_baseline, 1),
            operating_ratio: score.operating_ratio,
            failure: None,
        })
    }

    fn contribution_weight(
        &self,
        sample: &WaitSample,
        profile: &ParkProfile,
        key_weights: &HashMap<String, f64>,
        recent_avg: Option<f64>,
    ) -> f64 {
        let params = &self.config.params;
        let base = match self.key_index.tier(&sample.attraction_id) {
            AttractionTier::Ordinary => 1.0,
            AttractionTier::Key { patterns } => {
                let popularity = patterns
                    .iter()
                    .map(|p| key_weights.get(p).copied().unwrap_or(1.0))
                    .reduce(f64::max)
                    .unwrap_or(1.0);
                popularity * params.key_attraction_multiplier
            }
        };

        match popularity_factor(recent_avg, profile, params) {
            Some(factor) => base * factor,
            None => base,
        }
    }
}
