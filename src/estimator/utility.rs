/// Computes the weighted mean of `(value, weight)` pairs.
/// Returns `None` when the weights sum to zero.
pub fn weighted_mean(pairs: &[(f64, f64)]) -> Option<f64> {
    let total_weight: f64 = pairs.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return None;
    }
    let weighted_total: f64 = pairs.iter().map(|(v, w)| v * w).sum();
    Some(weighted_total / total_weight)
}

/// Rounds to `decimals` places, for display fields.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Fraction of `checks` that hold. Returns 0.0 for empty input.
pub fn pass_rate(checks: &[bool]) -> f64 {
    if checks.is_empty() {
        return 0.0;
    }
    checks.iter().filter(|c| **c).count() as f64 / checks.len() as f64
}
