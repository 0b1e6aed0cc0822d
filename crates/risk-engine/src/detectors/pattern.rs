use chrono::Duration;
use common_models::{FraudSignal, SignalType};

use crate::detectors::DetectorContext;
use crate::error::Result;
use crate::graph::{detect_ring, MAX_RING_DEPTH};
use crate::repository::EvidenceRepository;

const BATCH_WINDOW_HOURS: i64 = 2;
const BATCH_TRIGGER: u64 = 5;

pub async fn detect(
    ctx: &DetectorContext<'_>,
    repo: &dyn EvidenceRepository,
) -> Result<Vec<FraudSignal>> {
    // Graph patterns only exist when a referrer was proposed.
    let Some(referrer_id) = ctx.request.referrer_id.as_deref() else {
        return Ok(Vec::new());
    };

    let mut signals = Vec::new();

    if detect_ring(repo, &ctx.request.user_id, referrer_id, MAX_RING_DEPTH).await? {
        signals.push(
            FraudSignal::new(
                SignalType::ReferralRing,
                SignalType::ReferralRing.base_weight(),
                format!(
                    "referral chain from {referrer_id} loops back to {}",
                    ctx.request.user_id
                ),
            )
            .with_metadata("referrer_id", referrer_id.to_string()),
        );
    }

    let windowed = repo
        .recent_referrals_by_referrer(referrer_id, Duration::hours(BATCH_WINDOW_HOURS))
        .await?;
    if windowed >= BATCH_TRIGGER {
        signals.push(
            FraudSignal::new(
                SignalType::BatchSignups,
                SignalType::BatchSignups.base_weight(),
                format!(
                    "referrer {referrer_id} accumulated {windowed} referrals in \
                     {BATCH_WINDOW_HOURS}h"
                ),
            )
            .with_metadata("referrer_id", referrer_id.to_string())
            .with_metadata("windowed_referrals", windowed.to_string()),
        );
    }

    Ok(signals)
}
