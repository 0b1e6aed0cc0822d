use chrono::Duration;
use common_models::{FraudSignal, SignalType};

use crate::detectors::DetectorContext;
use crate::error::Result;
use crate::repository::EvidenceRepository;

/// Additional weight per duplicate match beyond the first, capped at 1.0.
const MATCH_WEIGHT_STEP: f64 = 0.05;
/// Vendor ids younger than this are treated as churned installs.
const FRESH_VENDOR_WINDOW_MINUTES: i64 = 60;

pub async fn detect(
    ctx: &DetectorContext<'_>,
    repo: &dyn EvidenceRepository,
) -> Result<Vec<FraudSignal>> {
    let mut signals = Vec::new();

    let matches = repo.find_device_matches(&ctx.fingerprint.hash).await?;
    let others: Vec<_> = matches
        .iter()
        .filter(|m| m.user_id != ctx.request.user_id)
        .collect();
    if !others.is_empty() {
        let base = SignalType::DuplicateDevice.base_weight();
        let weight = (base + MATCH_WEIGHT_STEP * (others.len() - 1) as f64).min(1.0);
        let matched_users = others
            .iter()
            .map(|m| m.user_id.clone())
            .collect::<Vec<_>>()
            .join(",");
        signals.push(
            FraudSignal::new(
                SignalType::DuplicateDevice,
                weight,
                format!(
                    "device fingerprint already registered to {} other account(s)",
                    others.len()
                ),
            )
            .with_metadata("match_count", others.len().to_string())
            .with_metadata("matched_users", matched_users),
        );
    }

    if ctx.request.device.is_jailbroken {
        signals.push(FraudSignal::new(
            SignalType::JailbrokenDevice,
            SignalType::JailbrokenDevice.base_weight(),
            "device reports jailbreak/root indicators",
        ));
    }

    if ctx.request.device.is_simulator {
        signals.push(FraudSignal::new(
            SignalType::SimulatorUsage,
            SignalType::SimulatorUsage.base_weight(),
            "signup originates from an emulated environment",
        ));
    }

    if let Some(first_seen) = repo.vendor_first_seen(&ctx.request.device.vendor_id).await? {
        let age = ctx.now - first_seen;
        if age < Duration::minutes(FRESH_VENDOR_WINDOW_MINUTES) {
            signals.push(
                FraudSignal::new(
                    SignalType::SuspiciousDeviceAge,
                    SignalType::SuspiciousDeviceAge.base_weight(),
                    format!(
                        "vendor id first seen {} minute(s) before signup",
                        age.num_minutes()
                    ),
                )
                .with_metadata("vendor_id", ctx.request.device.vendor_id.clone()),
            );
        }
    }

    Ok(signals)
}
