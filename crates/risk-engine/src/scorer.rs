//! Signal aggregation. A naive sum would let many weak, correlated signals
//! trivially pass 1.0; instead the k-th strongest signal is discounted
//! geometrically and the weighted average is then nudged upward by a
//! capped corroboration multiplier.

use common_models::FraudSignal;

/// Geometric base of the rank discount: the k-th strongest signal counts
/// for `1 / 1.5^k`. Hand-picked prior, not a tunable.
pub const DIMINISHING_RETURNS_BASE: f64 = 1.5;
/// Multiplier step per signal.
pub const CORROBORATION_STEP: f64 = 0.05;
/// Multiplier ceiling. Hand-picked prior, not a tunable.
pub const CORROBORATION_CAP: f64 = 1.3;

pub fn compute_risk_score(signals: &[FraudSignal]) -> f64 {
    if signals.is_empty() {
        return 0.0;
    }

    let mut weights: Vec<f64> = signals.iter().map(|signal| signal.weight).collect();
    weights.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let mut weighted_sum = 0.0;
    let mut discount_sum = 0.0;
    for (rank, weight) in weights.iter().enumerate() {
        let discount = 1.0 / DIMINISHING_RETURNS_BASE.powi(rank as i32);
        weighted_sum += weight * discount;
        discount_sum += discount;
    }
    let base_score = weighted_sum / discount_sum;

    let multiplier = (1.0 + CORROBORATION_STEP * signals.len() as f64).min(CORROBORATION_CAP);
    (base_score * multiplier).min(1.0)
}
