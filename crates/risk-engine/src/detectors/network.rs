use chrono::Duration;
use common_models::{FraudSignal, SignalType};

use crate::detectors::DetectorContext;
use crate::error::Result;
use crate::reference::ReferenceData;
use crate::repository::EvidenceRepository;

/// Additional weight per prior signup beyond the first, capped at 1.0.
const SIGNUP_WEIGHT_STEP: f64 = 0.1;
const IP_WINDOW_HOURS: i64 = 24;

pub async fn detect(
    ctx: &DetectorContext<'_>,
    repo: &dyn EvidenceRepository,
    reference: &ReferenceData,
) -> Result<Vec<FraudSignal>> {
    // No IP reported means the network signals are simply not applicable.
    let Some(ip) = ctx.request.ip_address.as_deref() else {
        return Ok(Vec::new());
    };

    let mut signals = Vec::new();

    let prior = repo
        .recent_signups_by_ip(ip, Duration::hours(IP_WINDOW_HOURS))
        .await?;
    if prior >= 1 {
        let base = SignalType::DuplicateIp.base_weight();
        let weight = (base + SIGNUP_WEIGHT_STEP * (prior - 1) as f64).min(1.0);
        signals.push(
            FraudSignal::new(
                SignalType::DuplicateIp,
                weight,
                format!("{prior} prior signup(s) from {ip} in the last {IP_WINDOW_HOURS}h"),
            )
            .with_metadata("prior_signups", prior.to_string()),
        );
    }

    if reference.is_datacenter_ip(ip) {
        signals.push(
            FraudSignal::new(
                SignalType::DatacenterIp,
                SignalType::DatacenterIp.base_weight(),
                format!("{ip} falls in a known hosting/VPN range"),
            )
            .with_metadata("ip", ip.to_string()),
        );
    }

    Ok(signals)
}
