//! Confidence bounds for categorical predictions

use crate::input::FeatureValue;

/// z value of the 95% interval
pub const WS_Z: f64 = 1.96;

/// Lower bound of the Wilson score interval for `prediction` in `distribution`
///
/// Returns 0 when the distribution is empty or does not contain the category.
pub fn ws_confidence(prediction: &FeatureValue, distribution: &[(FeatureValue, u64)]) -> f64 {
    let total: u64 = distribution.iter().map(|(_, c)| c).sum();
    let hits = distribution
        .iter()
        .find(|(v, _)| v == prediction)
        .map(|(_, c)| *c)
        .unwrap_or(0);

    if total == 0 || hits == 0 {
        return 0.0;
    }

    wilson_lower_bound(hits as f64 / total as f64, total as f64, WS_Z)
}

fn wilson_lower_bound(p: f64, n: f64, z: f64) -> f64 {
    let z2 = z * z;
    let factor = z2 / n;
    let spread = ((p * (1.0 - p) + factor / 4.0) / n).sqrt();
    (p + factor / 2.0 - z * spread) / (1.0 + factor)
}
