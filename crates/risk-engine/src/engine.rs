//! Assessment assembler: fans the five detector categories out as
//! concurrent tasks over the shared repository snapshot, fans their
//! signals back in, and turns them into a persisted decision.

use std::sync::Arc;

use chrono::Utc;
use common_models::{
    Decision, DeviceFingerprint, FraudAssessment, FraudSignal, RiskLevel, SignalCategory,
    SignupRequest,
};
use futures::future::{join_all, FutureExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::detectors::{self, DetectorContext};
use crate::policy::{decide, review_required};
use crate::reference::ReferenceData;
use crate::repository::EvidenceRepository;
use crate::scorer::compute_risk_score;

/// Score reported when every detector category failed and there is no
/// evidence either way; lands squarely in the manual-review band.
pub const CONSERVATIVE_FALLBACK_SCORE: f64 = 0.5;

pub struct RiskEngine {
    repository: Arc<dyn EvidenceRepository>,
    reference: ReferenceData,
}

impl RiskEngine {
    pub fn new(repository: Arc<dyn EvidenceRepository>, reference: ReferenceData) -> Self {
        Self {
            repository,
            reference,
        }
    }

    /// Evaluates one candidate signup. Never fails: a failed detector
    /// degrades its category to zero signals, persistence failures are
    /// logged, and the computed decision is always returned.
    pub async fn assess_signup(&self, request: SignupRequest) -> FraudAssessment {
        let now = Utc::now();
        let fingerprint = DeviceFingerprint::from_attributes(&request.device);
        let ctx = DetectorContext {
            request: &request,
            fingerprint: &fingerprint,
            now,
        };
        let repo = self.repository.as_ref();

        let outcomes = join_all([
            detectors::device::detect(&ctx, repo).boxed(),
            detectors::network::detect(&ctx, repo, &self.reference).boxed(),
            detectors::account::detect(&ctx, repo, &self.reference).boxed(),
            detectors::behavioral::detect(&ctx, repo).boxed(),
            detectors::pattern::detect(&ctx, repo).boxed(),
        ])
        .await;

        // Signals are concatenated in the fixed category order, so the
        // audit ordering never depends on which task finished first.
        let mut signals: Vec<FraudSignal> = Vec::new();
        let mut degraded = 0usize;
        for (category, outcome) in SignalCategory::ALL.into_iter().zip(outcomes) {
            match outcome {
                Ok(batch) => signals.extend(batch),
                Err(err) => {
                    degraded += 1;
                    warn!(
                        user_id = %request.user_id,
                        category = category.as_str(),
                        "detector category degraded: {err}"
                    );
                }
            }
        }
        let partial = degraded > 0;

        let (risk_score, decision, review) = if degraded == SignalCategory::ALL.len() {
            warn!(
                user_id = %request.user_id,
                "all detector categories failed, falling back to manual review"
            );
            (CONSERVATIVE_FALLBACK_SCORE, Decision::ManualReview, true)
        } else {
            let score = compute_risk_score(&signals);
            (score, decide(score, &signals), review_required(&signals))
        };

        let assessment = FraudAssessment {
            id: Uuid::new_v4(),
            user_id: request.user_id.clone(),
            referral_code: request.referral_code.clone(),
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
            signals,
            fingerprint: fingerprint.clone(),
            ip_address: request.ip_address.clone(),
            assessed_at: now,
            decision,
            review_required: review,
            partial,
        };

        self.persist(&assessment, &fingerprint).await;

        info!(
            assessment_id = %assessment.id,
            user_id = %assessment.user_id,
            score = assessment.risk_score,
            decision = ?assessment.decision,
            signals = assessment.signals.len(),
            partial = assessment.partial,
            "signup assessed"
        );

        assessment
    }

    /// Best-effort writes, after all reads: a failure here is surfaced as
    /// operational noise, never a reason to change or withhold the
    /// already-computed decision.
    async fn persist(&self, assessment: &FraudAssessment, fingerprint: &DeviceFingerprint) {
        if let Err(err) = self
            .repository
            .persist_fingerprint(fingerprint, &assessment.user_id)
            .await
        {
            error!(
                user_id = %assessment.user_id,
                "failed to persist device fingerprint: {err}"
            );
        }
        if let Err(err) = self.repository.persist_assessment(assessment).await {
            error!(
                assessment_id = %assessment.id,
                "failed to persist assessment: {err}"
            );
        }
    }
}
