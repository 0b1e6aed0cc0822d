//! In-memory evidence repository. Backs the gateway and the batch CLI in
//! single-process deployments and doubles as the test fake; a durable
//! store implements the same port in production.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common_models::{DeviceFingerprint, FraudAssessment};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::email::normalize_email;
use crate::error::Result;
use crate::repository::{DeviceMatch, EvidenceRepository, DEVICE_MATCH_LIMIT};

#[derive(Default)]
struct MemoryState {
    device_owners: HashMap<String, Vec<DeviceMatch>>,
    vendor_first_seen: HashMap<String, DateTime<Utc>>,
    ip_signups: HashMap<String, Vec<DateTime<Utc>>>,
    referral_times: HashMap<String, Vec<DateTime<Utc>>>,
    email_accounts: HashMap<String, HashSet<String>>,
    referrer_of: HashMap<String, String>,
    assessments: HashMap<Uuid, FraudAssessment>,
}

#[derive(Default)]
pub struct MemoryEvidenceRepository {
    state: RwLock<MemoryState>,
}

impl MemoryEvidenceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_signup_ip(&self, ip: &str, at: DateTime<Utc>) {
        let mut state = self.state.write().await;
        state.ip_signups.entry(ip.to_string()).or_default().push(at);
    }

    /// Registers an account under its normalized email.
    pub async fn record_account_email(&self, email: &str, user_id: &str) {
        let normalized = normalize_email(email);
        let mut state = self.state.write().await;
        state
            .email_accounts
            .entry(normalized)
            .or_default()
            .insert(user_id.to_string());
    }

    /// Records that `referrer_id` referred `referred_id` at `at`.
    pub async fn record_referral_edge(
        &self,
        referrer_id: &str,
        referred_id: &str,
        at: DateTime<Utc>,
    ) {
        let mut state = self.state.write().await;
        state
            .referrer_of
            .insert(referred_id.to_string(), referrer_id.to_string());
        state
            .referral_times
            .entry(referrer_id.to_string())
            .or_default()
            .push(at);
    }

    pub async fn get_assessment(&self, id: Uuid) -> Option<FraudAssessment> {
        self.state.read().await.assessments.get(&id).cloned()
    }

    pub async fn assessment_count(&self) -> usize {
        self.state.read().await.assessments.len()
    }
}

#[async_trait]
impl EvidenceRepository for MemoryEvidenceRepository {
    async fn find_device_matches(&self, hash: &str) -> Result<Vec<DeviceMatch>> {
        let state = self.state.read().await;
        let matches = state
            .device_owners
            .get(hash)
            .map(|owners| owners.iter().take(DEVICE_MATCH_LIMIT).cloned().collect())
            .unwrap_or_default();
        Ok(matches)
    }

    async fn vendor_first_seen(&self, vendor_id: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.state.read().await.vendor_first_seen.get(vendor_id).copied())
    }

    async fn recent_signups_by_ip(&self, ip: &str, within: Duration) -> Result<u64> {
        let cutoff = Utc::now() - within;
        let state = self.state.read().await;
        let count = state
            .ip_signups
            .get(ip)
            .map(|times| times.iter().filter(|at| **at >= cutoff).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn recent_referrals_by_referrer(
        &self,
        referrer_id: &str,
        within: Duration,
    ) -> Result<u64> {
        let cutoff = Utc::now() - within;
        let state = self.state.read().await;
        let count = state
            .referral_times
            .get(referrer_id)
            .map(|times| times.iter().filter(|at| **at >= cutoff).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn similar_email_accounts(&self, normalized_email: &str) -> Result<u64> {
        let state = self.state.read().await;
        let count = state
            .email_accounts
            .get(normalized_email)
            .map(|users| users.len())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn find_referrer_of(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self.state.read().await.referrer_of.get(user_id).cloned())
    }

    async fn persist_assessment(&self, assessment: &FraudAssessment) -> Result<()> {
        let mut state = self.state.write().await;
        state.assessments.insert(assessment.id, assessment.clone());
        Ok(())
    }

    async fn persist_fingerprint(
        &self,
        fingerprint: &DeviceFingerprint,
        user_id: &str,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let owners = state
            .device_owners
            .entry(fingerprint.hash.clone())
            .or_default();
        if !owners.iter().any(|owner| owner.user_id == user_id) {
            owners.push(DeviceMatch {
                user_id: user_id.to_string(),
                first_seen_at: fingerprint.created_at,
            });
        }
        state
            .vendor_first_seen
            .entry(fingerprint.vendor_id.clone())
            .or_insert(fingerprint.created_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_models::{DeviceAttributes, DeviceFingerprint};

    fn fingerprint(vendor_id: &str) -> DeviceFingerprint {
        DeviceFingerprint::from_attributes(&DeviceAttributes {
            device_model: "Pixel 8".to_string(),
            os_version: "14".to_string(),
            screen_resolution: "1080x2400".to_string(),
            timezone: "Europe/Berlin".to_string(),
            locale: "de-DE".to_string(),
            carrier: Some("Telekom".to_string()),
            is_simulator: false,
            is_jailbroken: false,
            advertising_id: None,
            vendor_id: vendor_id.to_string(),
            utc_offset_minutes: Some(120),
        })
    }

    #[tokio::test]
    async fn device_matches_accumulate_and_are_bounded() {
        let repo = MemoryEvidenceRepository::new();
        let print = fingerprint("vendor-1");

        for n in 0..8 {
            repo.persist_fingerprint(&print, &format!("user-{n}"))
                .await
                .unwrap();
        }

        let matches = repo.find_device_matches(&print.hash).await.unwrap();
        assert_eq!(matches.len(), DEVICE_MATCH_LIMIT);
    }

    #[tokio::test]
    async fn persisting_same_user_twice_records_one_match() {
        let repo = MemoryEvidenceRepository::new();
        let print = fingerprint("vendor-2");

        repo.persist_fingerprint(&print, "user-a").await.unwrap();
        repo.persist_fingerprint(&print, "user-a").await.unwrap();

        let matches = repo.find_device_matches(&print.hash).await.unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn ip_window_excludes_old_signups() {
        let repo = MemoryEvidenceRepository::new();
        let now = Utc::now();
        repo.record_signup_ip("198.51.100.7", now - Duration::hours(30)).await;
        repo.record_signup_ip("198.51.100.7", now - Duration::hours(2)).await;
        repo.record_signup_ip("198.51.100.7", now - Duration::minutes(5)).await;

        let count = repo
            .recent_signups_by_ip("198.51.100.7", Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn email_accounts_collapse_aliases() {
        let repo = MemoryEvidenceRepository::new();
        repo.record_account_email("j.ohn+a@gmail.com", "user-1").await;
        repo.record_account_email("john@gmail.com", "user-2").await;

        let count = repo.similar_email_accounts("john@gmail.com").await.unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn vendor_first_seen_keeps_earliest_record() {
        let repo = MemoryEvidenceRepository::new();
        let first = fingerprint("vendor-3");
        repo.persist_fingerprint(&first, "user-a").await.unwrap();

        let again = fingerprint("vendor-3");
        repo.persist_fingerprint(&again, "user-b").await.unwrap();

        let seen = repo.vendor_first_seen("vendor-3").await.unwrap().unwrap();
        assert_eq!(seen, first.created_at);
    }
}
