use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use anyhow::Context;
use common_models::{Decision, SignupRequest};
use risk_engine::{MemoryEvidenceRepository, ReferenceData, RiskEngine};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct AssessReport {
    total_assessed: usize,
    skipped_invalid: usize,
    decisions: HashMap<&'static str, usize>,
    review_required: usize,
    partial: usize,
    mean_risk_score: f64,
    flagged_assessment_ids: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let input_path = env::var("ASSESS_INPUT").unwrap_or_else(|_| "signups.ndjson".to_string());
    let max_records: usize = env::var("ASSESS_MAX_RECORDS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(100_000);

    let repository = Arc::new(MemoryEvidenceRepository::new());
    let engine = RiskEngine::new(repository.clone(), ReferenceData::default());

    let raw = tokio::fs::read_to_string(&input_path)
        .await
        .with_context(|| format!("failed to read {input_path}"))?;
    info!("assess-cli scanning {input_path}, up to {max_records} records");

    let mut total_assessed = 0usize;
    let mut skipped_invalid = 0usize;
    let mut decisions: HashMap<&'static str, usize> = HashMap::new();
    let mut review_required = 0usize;
    let mut partial = 0usize;
    let mut score_sum = 0.0f64;
    let mut flagged = Vec::new();

    for line in raw.lines() {
        if total_assessed >= max_records {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let request: SignupRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(err) => {
                warn!("skipping invalid signup record: {err}");
                skipped_invalid += 1;
                continue;
            }
        };

        let assessment = engine.assess_signup(request.clone()).await;

        // The batch mirrors what the app would do with each verdict, so
        // later records in the same file see the accumulated evidence.
        let now = assessment.assessed_at;
        if let Some(ip) = request.ip_address.as_deref() {
            repository.record_signup_ip(ip, now).await;
        }
        repository
            .record_account_email(&request.email, &request.user_id)
            .await;
        if assessment.decision != Decision::Block {
            if let Some(referrer_id) = request.referrer_id.as_deref() {
                repository
                    .record_referral_edge(referrer_id, &request.user_id, now)
                    .await;
            }
        }

        total_assessed += 1;
        score_sum += assessment.risk_score;
        *decisions.entry(decision_key(assessment.decision)).or_insert(0) += 1;
        if assessment.review_required {
            review_required += 1;
            flagged.push(assessment.id.to_string());
        }
        if assessment.partial {
            partial += 1;
        }
    }

    let mean_risk_score = if total_assessed > 0 {
        score_sum / total_assessed as f64
    } else {
        0.0
    };
    let blocked = decisions.get(decision_key(Decision::Block)).copied().unwrap_or(0);

    let report = AssessReport {
        total_assessed,
        skipped_invalid,
        decisions,
        review_required,
        partial,
        mean_risk_score,
        flagged_assessment_ids: flagged.into_iter().take(100).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if total_assessed > 0 && blocked as f64 / total_assessed as f64 > 0.5 {
        warn!("more than half of the batch was blocked, check the input source");
    }
    Ok(())
}

fn decision_key(decision: Decision) -> &'static str {
    match decision {
        Decision::Allow => "allow",
        Decision::AllowWithMonitoring => "allow_with_monitoring",
        Decision::RequireVerification => "require_verification",
        Decision::ManualReview => "manual_review",
        Decision::Block => "block",
    }
}
