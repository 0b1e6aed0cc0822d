//! Decision policy: a total, deterministic mapping from (risk score,
//! signal set) to an action. A detected referral ring blocks outright,
//! before any score threshold is consulted.

use common_models::{Decision, FraudSignal, SignalType};

pub const BLOCK_THRESHOLD: f64 = 0.85;
pub const VERIFICATION_THRESHOLD: f64 = 0.6;
pub const REVIEW_THRESHOLD: f64 = 0.45;
pub const MONITOR_THRESHOLD: f64 = 0.3;
/// A single signal heavier than this forces human review regardless of
/// the decision branch taken.
pub const REVIEW_WEIGHT_TRIGGER: f64 = 0.8;

pub fn decide(risk_score: f64, signals: &[FraudSignal]) -> Decision {
    if signals
        .iter()
        .any(|signal| signal.signal_type == SignalType::ReferralRing)
    {
        return Decision::Block;
    }
    if risk_score >= BLOCK_THRESHOLD {
        Decision::Block
    } else if risk_score >= VERIFICATION_THRESHOLD {
        Decision::RequireVerification
    } else if risk_score >= REVIEW_THRESHOLD {
        Decision::ManualReview
    } else if risk_score >= MONITOR_THRESHOLD {
        Decision::AllowWithMonitoring
    } else {
        Decision::Allow
    }
}

pub fn review_required(signals: &[FraudSignal]) -> bool {
    signals.iter().any(|signal| {
        signal.signal_type == SignalType::ReferralRing || signal.weight > REVIEW_WEIGHT_TRIGGER
    })
}
