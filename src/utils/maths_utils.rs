use argminmax::ArgMinMax;
use statrs::statistics::Statistics;

pub fn get_max(vec: &[f64]) -> f64 {
    let max_index: usize = vec.argmax();
    vec[max_index]
}

pub fn get_min(vec: &[f64]) -> f64 {
    let min_index: usize = vec.argmin();
    vec[min_index]
}

/// Returns `None` for an empty slice (argminmax panics on empty input).
pub fn get_min_max(vec: &[f64]) -> Option<(f64, f64)> {
    if vec.is_empty() {
        return None;
    }
    Some((get_min(vec), get_max(vec)))
}

/// Arithmetic mean, 0.0 for an empty slice.
pub fn mean(vec: &[f64]) -> f64 {
    if vec.is_empty() {
        return 0.0;
    }
    vec.iter().mean()
}

/// Percentage change from `old` to `new`. A zero base yields 0.0.
pub fn percent_change(old: f64, new: f64) -> f64 {
    if old == 0.0 {
        return 0.0;
    }
    ((new - old) / old) * 100.0
}

/// Rounds to a fixed number of decimals. Scores and ratios are stored rounded so
/// persisted records compare equal to their in-memory counterpart.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// `value` adjusted by `pct` percent (e.g. `alter_by_pct(100.0, -1.0) == 99.0`).
pub fn alter_by_pct(value: f64, pct: f64) -> f64 {
    value * (1.0 + pct / 100.0)
}
