//! Read/write port over historical evidence. Implementations are injected
//! so scoring and policy logic run against an in-memory fake in tests and
//! against a durable store in production. All reads are point-in-time
//! snapshots; a duplicate created microseconds earlier may not be visible
//! yet, which is an accepted false-negative source.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common_models::{DeviceFingerprint, FraudAssessment};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Upper bound on duplicate-device matches returned per lookup.
pub const DEVICE_MATCH_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceMatch {
    pub user_id: String,
    pub first_seen_at: DateTime<Utc>,
}

#[async_trait]
pub trait EvidenceRepository: Send + Sync {
    /// Accounts already associated with this fingerprint hash, capped at
    /// [`DEVICE_MATCH_LIMIT`].
    async fn find_device_matches(&self, hash: &str) -> Result<Vec<DeviceMatch>>;

    /// Earliest time this vendor/install id was observed, if ever.
    async fn vendor_first_seen(&self, vendor_id: &str) -> Result<Option<DateTime<Utc>>>;

    /// Prior signups from this IP within the window.
    async fn recent_signups_by_ip(&self, ip: &str, within: Duration) -> Result<u64>;

    /// Referrals credited to this referrer within the window.
    async fn recent_referrals_by_referrer(&self, referrer_id: &str, within: Duration)
        -> Result<u64>;

    /// Existing accounts whose normalized email equals the given one.
    async fn similar_email_accounts(&self, normalized_email: &str) -> Result<u64>;

    /// Who referred this user, for the graph walk.
    async fn find_referrer_of(&self, user_id: &str) -> Result<Option<String>>;

    async fn persist_assessment(&self, assessment: &FraudAssessment) -> Result<()>;

    async fn persist_fingerprint(
        &self,
        fingerprint: &DeviceFingerprint,
        user_id: &str,
    ) -> Result<()>;
}
