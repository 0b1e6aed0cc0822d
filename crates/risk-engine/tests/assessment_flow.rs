//! End-to-end assessment scenarios against the in-memory repository,
//! including degraded-infrastructure behavior.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common_models::{Decision, DeviceAttributes, DeviceFingerprint, FraudAssessment, SignalType, SignupRequest};
use risk_engine::engine::CONSERVATIVE_FALLBACK_SCORE;
use risk_engine::{
    DeviceMatch, EngineError, EvidenceRepository, MemoryEvidenceRepository, ReferenceData,
    RiskEngine,
};

fn attributes(vendor_id: &str) -> DeviceAttributes {
    DeviceAttributes {
        device_model: "iPhone14,2".to_string(),
        os_version: "17.4.1".to_string(),
        screen_resolution: "1170x2532".to_string(),
        timezone: "America/New_York".to_string(),
        locale: "en-US".to_string(),
        carrier: Some("Verizon".to_string()),
        is_simulator: false,
        is_jailbroken: false,
        advertising_id: None,
        vendor_id: vendor_id.to_string(),
        utc_offset_minutes: None,
    }
}

fn signup(user_id: &str, email: &str, vendor_id: &str) -> SignupRequest {
    SignupRequest {
        user_id: user_id.to_string(),
        referrer_id: None,
        referral_code: None,
        email: email.to_string(),
        ip_address: Some("203.0.113.25".to_string()),
        device: attributes(vendor_id),
    }
}

/// Wraps the in-memory repository and injects failures per method name.
struct FailingRepository {
    inner: MemoryEvidenceRepository,
    failing_reads: HashSet<&'static str>,
    failing_writes: bool,
}

impl FailingRepository {
    fn new(failing_reads: &[&'static str], failing_writes: bool) -> Self {
        Self {
            inner: MemoryEvidenceRepository::new(),
            failing_reads: failing_reads.iter().copied().collect(),
            failing_writes,
        }
    }

    fn read_guard(&self, method: &'static str) -> Result<(), EngineError> {
        if self.failing_reads.contains(method) {
            Err(EngineError::Repository(format!("{method} unavailable")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EvidenceRepository for FailingRepository {
    async fn find_device_matches(&self, hash: &str) -> Result<Vec<DeviceMatch>, EngineError> {
        self.read_guard("find_device_matches")?;
        self.inner.find_device_matches(hash).await
    }

    async fn vendor_first_seen(
        &self,
        vendor_id: &str,
    ) -> Result<Option<DateTime<Utc>>, EngineError> {
        self.read_guard("vendor_first_seen")?;
        self.inner.vendor_first_seen(vendor_id).await
    }

    async fn recent_signups_by_ip(&self, ip: &str, within: Duration) -> Result<u64, EngineError> {
        self.read_guard("recent_signups_by_ip")?;
        self.inner.recent_signups_by_ip(ip, within).await
    }

    async fn recent_referrals_by_referrer(
        &self,
        referrer_id: &str,
        within: Duration,
    ) -> Result<u64, EngineError> {
        self.read_guard("recent_referrals_by_referrer")?;
        self.inner.recent_referrals_by_referrer(referrer_id, within).await
    }

    async fn similar_email_accounts(&self, normalized_email: &str) -> Result<u64, EngineError> {
        self.read_guard("similar_email_accounts")?;
        self.inner.similar_email_accounts(normalized_email).await
    }

    async fn find_referrer_of(&self, user_id: &str) -> Result<Option<String>, EngineError> {
        self.read_guard("find_referrer_of")?;
        self.inner.find_referrer_of(user_id).await
    }

    async fn persist_assessment(&self, assessment: &FraudAssessment) -> Result<(), EngineError> {
        if self.failing_writes {
            return Err(EngineError::Repository("assessment write failed".into()));
        }
        self.inner.persist_assessment(assessment).await
    }

    async fn persist_fingerprint(
        &self,
        fingerprint: &DeviceFingerprint,
        user_id: &str,
    ) -> Result<(), EngineError> {
        if self.failing_writes {
            return Err(EngineError::Repository("fingerprint write failed".into()));
        }
        self.inner.persist_fingerprint(fingerprint, user_id).await
    }
}

#[tokio::test]
async fn clean_signup_is_allowed_with_zero_score() {
    let repo = Arc::new(MemoryEvidenceRepository::new());
    let engine = RiskEngine::new(repo.clone(), ReferenceData::default());

    let assessment = engine
        .assess_signup(signup("new-user", "fresh@fastmail.com", "vendor-clean"))
        .await;

    assert!(assessment.signals.is_empty());
    assert_eq!(assessment.risk_score, 0.0);
    assert_eq!(assessment.decision, Decision::Allow);
    assert!(!assessment.review_required);
    assert!(!assessment.partial);
}

#[tokio::test]
async fn flagged_signup_escalates_with_expected_signals() {
    let repo = Arc::new(MemoryEvidenceRepository::new());
    let now = Utc::now();

    // Existing account owns the same physical device, registered a month
    // ago so the vendor id is not fresh.
    let mut existing_print = DeviceFingerprint::from_attributes(&attributes("vendor-shared"));
    existing_print.created_at = now - Duration::days(30);
    repo.persist_fingerprint(&existing_print, "existing-user").await.unwrap();
    repo.record_account_email("john@gmail.com", "existing-user").await;

    // Referrer pushed six signups through in the last two hours, but none
    // inside the rapid 30-minute window.
    for n in 0..6i64 {
        repo.record_referral_edge("busy-referrer", &format!("ref-{n}"), now - Duration::minutes(40 + n * 10))
            .await;
    }

    let engine = RiskEngine::new(repo.clone(), ReferenceData::default());
    let mut request = signup("candidate", "john+test@gmail.com", "vendor-shared");
    request.referrer_id = Some("busy-referrer".to_string());
    request.referral_code = Some("FRIEND50".to_string());

    let assessment = engine.assess_signup(request).await;

    let types: Vec<SignalType> = assessment.signals.iter().map(|s| s.signal_type).collect();
    assert_eq!(
        types,
        vec![
            SignalType::DuplicateDevice,
            SignalType::SimilarUsernames,
            SignalType::BatchSignups,
        ]
    );
    assert!(assessment.risk_score >= 0.6 && assessment.risk_score <= 1.0);
    assert!(matches!(
        assessment.decision,
        Decision::RequireVerification | Decision::ManualReview | Decision::Block
    ));
    assert!(assessment.review_required);
    assert!(!assessment.partial);
}

#[tokio::test]
async fn referral_ring_blocks_unconditionally() {
    let repo = Arc::new(MemoryEvidenceRepository::new());
    let now = Utc::now();
    repo.record_referral_edge("candidate", "b", now).await;
    repo.record_referral_edge("b", "c", now).await;

    let engine = RiskEngine::new(repo.clone(), ReferenceData::default());
    let mut request = signup("candidate", "ring@fastmail.com", "vendor-ring");
    request.referrer_id = Some("c".to_string());

    let assessment = engine.assess_signup(request).await;

    assert!(assessment
        .signals
        .iter()
        .any(|s| s.signal_type == SignalType::ReferralRing));
    assert_eq!(assessment.decision, Decision::Block);
    assert!(assessment.review_required);
}

#[tokio::test]
async fn signals_keep_stable_category_order() {
    let repo = Arc::new(MemoryEvidenceRepository::new());
    let now = Utc::now();
    repo.record_signup_ip("203.0.113.25", now - Duration::hours(1)).await;
    repo.record_account_email("taken@fastmail.com", "existing-user").await;

    let engine = RiskEngine::new(repo.clone(), ReferenceData::default());
    let mut request = signup("candidate", "taken@fastmail.com", "vendor-order");
    request.device.is_jailbroken = true;

    let assessment = engine.assess_signup(request).await;

    let categories: Vec<_> = assessment
        .signals
        .iter()
        .map(|s| s.signal_type.category())
        .collect();
    let mut sorted = categories.clone();
    sorted.sort_by_key(|category| {
        common_models::SignalCategory::ALL
            .iter()
            .position(|c| c == category)
            .unwrap()
    });
    assert_eq!(categories, sorted);
}

#[tokio::test]
async fn degraded_category_is_flagged_but_assessment_proceeds() {
    let repo = Arc::new(FailingRepository::new(&["find_device_matches"], false));
    let engine = RiskEngine::new(repo, ReferenceData::default());

    let assessment = engine
        .assess_signup(signup("new-user", "fresh@fastmail.com", "vendor-x"))
        .await;

    assert!(assessment.partial);
    assert!(assessment.signals.is_empty());
    assert_eq!(assessment.decision, Decision::Allow);
}

#[tokio::test]
async fn total_read_outage_falls_back_to_manual_review() {
    let repo = Arc::new(FailingRepository::new(
        &[
            "find_device_matches",
            "vendor_first_seen",
            "recent_signups_by_ip",
            "recent_referrals_by_referrer",
            "similar_email_accounts",
            "find_referrer_of",
        ],
        false,
    ));
    let engine = RiskEngine::new(repo, ReferenceData::default());

    let mut request = signup("new-user", "fresh@fastmail.com", "vendor-x");
    request.referrer_id = Some("someone".to_string());

    let assessment = engine.assess_signup(request).await;

    assert!(assessment.partial);
    assert_eq!(assessment.risk_score, CONSERVATIVE_FALLBACK_SCORE);
    assert_eq!(assessment.decision, Decision::ManualReview);
    assert!(assessment.review_required);
}

#[tokio::test]
async fn persistence_failure_does_not_change_the_decision() {
    let repo = Arc::new(FailingRepository::new(&[], true));
    let engine = RiskEngine::new(repo, ReferenceData::default());

    let assessment = engine
        .assess_signup(signup("new-user", "fresh@fastmail.com", "vendor-x"))
        .await;

    assert_eq!(assessment.decision, Decision::Allow);
    assert!(!assessment.partial);
}

#[tokio::test]
async fn assessments_and_fingerprints_are_persisted() {
    let repo = Arc::new(MemoryEvidenceRepository::new());
    let engine = RiskEngine::new(repo.clone(), ReferenceData::default());

    let first = engine
        .assess_signup(signup("user-1", "one@fastmail.com", "vendor-shared-2"))
        .await;
    assert!(repo.get_assessment(first.id).await.is_some());

    // Second signup from the same physical device trips the duplicate
    // check against the record the first assessment persisted.
    let second = engine
        .assess_signup(signup("user-2", "two@fastmail.com", "vendor-shared-2"))
        .await;
    assert!(second
        .signals
        .iter()
        .any(|s| s.signal_type == SignalType::DuplicateDevice));
    assert!(second.review_required);
}
