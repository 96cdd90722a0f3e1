use crate::profile::{EngineParams, ParkProfile};
use crate::store::WaitStore;
use crate::timestamp::TimeWindow;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Popularity weight for each of `profile`'s key-attraction patterns.
///
/// A pattern with fewer than `min_popularity_samples` positive operating
/// waits in `lookback` keeps weight 1.0. Otherwise the weight is its average
/// wait over `popularity_reference_wait`, capped at `popularity_cap`.
///
/// A failing store query leaves every pattern at 1.0.
pub fn key_attraction_weights<S: WaitStore>(
    store: &S,
    profile: &ParkProfile,
    lookback: &TimeWindow,
    params: &EngineParams,
) -> HashMap<String, f64> {
    let mut weights = HashMap::with_capacity(profile.key_attractions.len());

    for pattern in &profile.key_attractions {
        let stats = match store.wait_stats_matching(&profile.name, pattern, lookback) {
            Ok(stats) => stats,
            Err(e) => {
                warn!(park = %profile.name, error = %e, "Key attraction weight query failed, using defaults");
                return profile
                    .key_attractions
                    .iter()
                    .map(|key| (key.clone(), 1.0))
                    .collect();
            }
        };

        let weight = match stats.avg_wait {
            Some(avg) if stats.data_points >= params.min_popularity_samples => {
                (avg / params.popularity_reference_wait).min(params.popularity_cap)
            }
            _ => 1.0,
        };
        debug!(
            park = %profile.name,
            pattern = %pattern,
            data_points = stats.data_points,
            weight,
            "Key attraction weight"
        );
        weights.insert(pattern.clone(), weight);
    }

    weights
}

/// Multiplier from an attraction's recent average wait relative to the
/// park's baseline, capped at `popularity_cap`. `None` when there is no
/// positive recent average.
pub fn popularity_factor(recent_avg: Option<f64>, profile: &ParkProfile, params: &EngineParams) -> Option<f64> {
    recent_avg
        .filter(|avg| *avg > 0.0)
        .map(|avg| (avg / profile.baseline_wait_minutes).min(params.popularity_cap))
}
