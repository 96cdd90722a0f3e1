use crate::profile::{EngineParams, ParkProfile};
use crate::store::WaitStore;
use crate::timestamp::{TimeWindow, days_before};
use chrono::{DateTime, Utc, Weekday};
use tracing::{debug, warn};

/// Expected wait for `profile`'s park at `hour` (UTC) on `weekday`.
///
/// Averages operating waits from the same weekday within one hour either side
/// of `hour`, over the `baseline_lookback_days` before `reference` but
/// excluding the most recent `baseline_exclusion_days`, so the data being
/// evaluated never feeds its own baseline.
///
/// Falls back to the park's configured `baseline_wait_minutes` when there is
/// no history, the lookback leaves the supported date range, or the store
/// query fails.
pub fn estimate_baseline<S: WaitStore>(
    store: &S,
    profile: &ParkProfile,
    hour: u32,
    weekday: Weekday,
    reference: DateTime<Utc>,
    params: &EngineParams,
) -> f64 {
    let hour = i64::from(hour);
    let window = match days_before(reference, params.baseline_exclusion_days)
        .and_then(|until| TimeWindow::trailing(reference, params.baseline_lookback_days, until))
    {
        Ok(window) => window,
        Err(e) => {
            warn!(park = %profile.name, error = %e, "Baseline lookback out of range, using configured baseline");
            return profile.baseline_wait_minutes;
        }
    };

    match store.average_wait_for_slot(
        &profile.name,
        (hour - 1)..=(hour + 1),
        weekday,
        &window,
        params.max_valid_wait_minutes,
    ) {
        Ok(Some(avg)) if avg > 0.0 => {
            debug!(park = %profile.name, hour, ?weekday, baseline = avg, "Historical baseline");
            avg
        }
        Ok(_) => {
            debug!(
                park = %profile.name,
                hour,
                ?weekday,
                "No history for slot, using configured baseline"
            );
            profile.baseline_wait_minutes
        }
        Err(e) => {
            warn!(park = %profile.name, error = %e, "Historical baseline query failed, using configured baseline");
            profile.baseline_wait_minutes
        }
    }
}
