use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Sentinel used in place of an absent carrier so the fingerprint hash
/// composition is stable regardless of which optional fields were supplied.
pub const UNKNOWN_CARRIER: &str = "unknown";

/// Raw device attribute bag as supplied by the host platform. The engine
/// never probes the device itself; every field here arrives pre-computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceAttributes {
    pub device_model: String,
    pub os_version: String,
    pub screen_resolution: String,
    pub timezone: String,
    pub locale: String,
    pub carrier: Option<String>,
    pub is_simulator: bool,
    pub is_jailbroken: bool,
    pub advertising_id: Option<String>,
    pub vendor_id: String,
    /// Minutes east of UTC at signup time, when the platform reports it.
    /// Used for local-hour checks only; never part of the hash.
    pub utc_offset_minutes: Option<i32>,
}

/// Canonical device fingerprint. `hash` covers a fixed, ordered field list
/// so the same physical device in the same OS/locale state always produces
/// the same value; `created_at` is deliberately excluded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceFingerprint {
    pub device_model: String,
    pub os_version: String,
    pub screen_resolution: String,
    pub timezone: String,
    pub locale: String,
    pub carrier: Option<String>,
    pub is_simulator: bool,
    pub is_jailbroken: bool,
    pub advertising_id: Option<String>,
    pub vendor_id: String,
    pub hash: String,
    pub created_at: DateTime<Utc>,
}

impl DeviceFingerprint {
    pub fn from_attributes(attrs: &DeviceAttributes) -> Self {
        Self {
            device_model: attrs.device_model.clone(),
            os_version: attrs.os_version.clone(),
            screen_resolution: attrs.screen_resolution.clone(),
            timezone: attrs.timezone.clone(),
            locale: attrs.locale.clone(),
            carrier: attrs.carrier.clone(),
            is_simulator: attrs.is_simulator,
            is_jailbroken: attrs.is_jailbroken,
            advertising_id: attrs.advertising_id.clone(),
            vendor_id: attrs.vendor_id.clone(),
            hash: compute_fingerprint_hash(attrs),
            created_at: Utc::now(),
        }
    }
}

pub fn compute_fingerprint_hash(attrs: &DeviceAttributes) -> String {
    let composite = [
        attrs.device_model.as_str(),
        attrs.os_version.as_str(),
        attrs.screen_resolution.as_str(),
        attrs.timezone.as_str(),
        attrs.locale.as_str(),
        attrs.carrier.as_deref().unwrap_or(UNKNOWN_CARRIER),
        attrs.vendor_id.as_str(),
    ]
    .join("|");
    let mut hasher = Sha256::new();
    hasher.update(composite.as_bytes());
    hex::encode(hasher.finalize())
}

/// Detector categories, in the stable order signals are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    Device,
    Network,
    Account,
    Behavioral,
    Pattern,
}

impl SignalCategory {
    pub const ALL: [SignalCategory; 5] = [
        SignalCategory::Device,
        SignalCategory::Network,
        SignalCategory::Account,
        SignalCategory::Behavioral,
        SignalCategory::Pattern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalCategory::Device => "device",
            SignalCategory::Network => "network",
            SignalCategory::Account => "account",
            SignalCategory::Behavioral => "behavioral",
            SignalCategory::Pattern => "pattern",
        }
    }
}

/// Closed signal taxonomy. Base weights are hand-specified priors, not
/// runtime tunables. Several types are recognized without an active
/// detector; nothing fires them until the upstream data exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    DuplicateDevice,
    JailbrokenDevice,
    SimulatorUsage,
    SuspiciousDeviceAge,
    DuplicateIp,
    DatacenterIp,
    VpnProxyIp,
    DisposableEmail,
    SimilarUsernames,
    RapidReferrals,
    UnusualSignupTime,
    ReferralRing,
    BatchSignups,
    SameWifiNetwork,
    ShortSession,
    IncompleteProfile,
}

impl SignalType {
    pub fn base_weight(&self) -> f64 {
        match self {
            SignalType::DuplicateDevice => 0.9,
            SignalType::JailbrokenDevice => 0.4,
            SignalType::SimulatorUsage => 0.8,
            SignalType::SuspiciousDeviceAge => 0.3,
            SignalType::DuplicateIp => 0.7,
            SignalType::DatacenterIp => 0.8,
            SignalType::VpnProxyIp => 0.6,
            SignalType::DisposableEmail => 0.8,
            SignalType::SimilarUsernames => 0.5,
            SignalType::RapidReferrals => 0.6,
            SignalType::UnusualSignupTime => 0.2,
            SignalType::ReferralRing => 0.95,
            SignalType::BatchSignups => 0.7,
            SignalType::SameWifiNetwork => 0.5,
            SignalType::ShortSession => 0.3,
            SignalType::IncompleteProfile => 0.2,
        }
    }

    pub fn category(&self) -> SignalCategory {
        match self {
            SignalType::DuplicateDevice
            | SignalType::JailbrokenDevice
            | SignalType::SimulatorUsage
            | SignalType::SuspiciousDeviceAge => SignalCategory::Device,
            SignalType::DuplicateIp
            | SignalType::DatacenterIp
            | SignalType::VpnProxyIp
            | SignalType::SameWifiNetwork => SignalCategory::Network,
            SignalType::DisposableEmail
            | SignalType::SimilarUsernames
            | SignalType::IncompleteProfile => SignalCategory::Account,
            SignalType::RapidReferrals
            | SignalType::UnusualSignupTime
            | SignalType::ShortSession => SignalCategory::Behavioral,
            SignalType::ReferralRing | SignalType::BatchSignups => SignalCategory::Pattern,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::DuplicateDevice => "duplicate_device",
            SignalType::JailbrokenDevice => "jailbroken_device",
            SignalType::SimulatorUsage => "simulator_usage",
            SignalType::SuspiciousDeviceAge => "suspicious_device_age",
            SignalType::DuplicateIp => "duplicate_ip",
            SignalType::DatacenterIp => "datacenter_ip",
            SignalType::VpnProxyIp => "vpn_proxy_ip",
            SignalType::DisposableEmail => "disposable_email",
            SignalType::SimilarUsernames => "similar_usernames",
            SignalType::RapidReferrals => "rapid_referrals",
            SignalType::UnusualSignupTime => "unusual_signup_time",
            SignalType::ReferralRing => "referral_ring",
            SignalType::BatchSignups => "batch_signups",
            SignalType::SameWifiNetwork => "same_wifi_network",
            SignalType::ShortSession => "short_session",
            SignalType::IncompleteProfile => "incomplete_profile",
        }
    }
}

/// A single piece of fraud evidence. `weight` is the effective weight after
/// any count-based scaling, always within [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudSignal {
    pub signal_type: SignalType,
    pub weight: f64,
    pub rationale: String,
    pub detected_at: DateTime<Utc>,
    pub metadata: HashMap<String, String>,
}

impl FraudSignal {
    pub fn new(signal_type: SignalType, weight: f64, rationale: impl Into<String>) -> Self {
        Self {
            signal_type,
            weight,
            rationale: rationale.into(),
            detected_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Blocked,
}

impl RiskLevel {
    /// Partitions [0, 1] with no gaps or overlaps.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.85 {
            RiskLevel::Blocked
        } else if score >= 0.6 {
            RiskLevel::High
        } else if score >= 0.3 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    AllowWithMonitoring,
    RequireVerification,
    ManualReview,
    Block,
}

/// Candidate signup submitted for assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub user_id: String,
    pub referrer_id: Option<String>,
    pub referral_code: Option<String>,
    pub email: String,
    pub ip_address: Option<String>,
    pub device: DeviceAttributes,
}

/// Outcome of one signup evaluation. Created exactly once per evaluation
/// and immutable afterwards; `risk_level` always equals
/// `RiskLevel::from_score(risk_score)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudAssessment {
    pub id: Uuid,
    pub user_id: String,
    pub referral_code: Option<String>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub signals: Vec<FraudSignal>,
    pub fingerprint: DeviceFingerprint,
    pub ip_address: Option<String>,
    pub assessed_at: DateTime<Utc>,
    pub decision: Decision,
    pub review_required: bool,
    /// True when at least one detector category degraded to zero signals
    /// because of an infrastructure failure; such assessments are
    /// candidates for later re-scoring.
    pub partial: bool,
}
