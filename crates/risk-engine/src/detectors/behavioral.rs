use chrono::{Duration, FixedOffset, Timelike};
use common_models::{FraudSignal, SignalType};

use crate::detectors::DetectorContext;
use crate::error::Result;
use crate::repository::EvidenceRepository;

/// Additional weight per referral beyond the trigger count, capped at 1.0.
const REFERRAL_WEIGHT_STEP: f64 = 0.1;
const RAPID_REFERRAL_WINDOW_MINUTES: i64 = 30;
const RAPID_REFERRAL_TRIGGER: u64 = 3;
/// Local hours considered unusual for an organic signup, inclusive.
const QUIET_HOURS: (u32, u32) = (2, 5);

pub async fn detect(
    ctx: &DetectorContext<'_>,
    repo: &dyn EvidenceRepository,
) -> Result<Vec<FraudSignal>> {
    let mut signals = Vec::new();

    if let Some(referrer_id) = ctx.request.referrer_id.as_deref() {
        let recent = repo
            .recent_referrals_by_referrer(
                referrer_id,
                Duration::minutes(RAPID_REFERRAL_WINDOW_MINUTES),
            )
            .await?;
        if recent >= RAPID_REFERRAL_TRIGGER {
            let base = SignalType::RapidReferrals.base_weight();
            let weight =
                (base + REFERRAL_WEIGHT_STEP * (recent - RAPID_REFERRAL_TRIGGER) as f64).min(1.0);
            signals.push(
                FraudSignal::new(
                    SignalType::RapidReferrals,
                    weight,
                    format!(
                        "referrer {referrer_id} made {recent} referrals in \
                         {RAPID_REFERRAL_WINDOW_MINUTES} minutes"
                    ),
                )
                .with_metadata("referrer_id", referrer_id.to_string())
                .with_metadata("recent_referrals", recent.to_string()),
            );
        }
    }

    // Local hour requires the platform-reported UTC offset; without it the
    // signal is not applicable.
    if let Some(offset_minutes) = ctx.request.device.utc_offset_minutes {
        if let Some(offset) = FixedOffset::east_opt(offset_minutes * 60) {
            let local_hour = ctx.now.with_timezone(&offset).hour();
            if (QUIET_HOURS.0..=QUIET_HOURS.1).contains(&local_hour) {
                signals.push(
                    FraudSignal::new(
                        SignalType::UnusualSignupTime,
                        SignalType::UnusualSignupTime.base_weight(),
                        format!("signup at local hour {local_hour}"),
                    )
                    .with_metadata("local_hour", local_hour.to_string()),
                );
            }
        }
    }

    Ok(signals)
}
