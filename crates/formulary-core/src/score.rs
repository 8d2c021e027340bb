//! Helpers keeping every score in `[0.0, 1.0]`.

/// Clamps a score into `[0.0, 1.0]`; `NaN` becomes `0.0`.
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Arithmetic mean of the given scores, `0.0` for an empty input.
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}
