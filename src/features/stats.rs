//! Small statistics helpers shared by the indicator engine and the detectors

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divide by n, not n - 1)
pub fn std_pop(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Z-score of `value` against a baseline window.
///
/// Returns 0 when the baseline has no spread or is empty.
pub fn zscore(value: f64, baseline: &[f64]) -> f64 {
    let std = std_pop(baseline);
    if std == 0.0 {
        return 0.0;
    }
    (value - mean(baseline)) / std
}

/// Round half away from zero to `decimals` places
pub fn round_dp(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
