use common_models::{FraudSignal, SignalType};

use crate::detectors::DetectorContext;
use crate::email::{email_domain, normalize_email};
use crate::error::Result;
use crate::reference::ReferenceData;
use crate::repository::EvidenceRepository;

pub async fn detect(
    ctx: &DetectorContext<'_>,
    repo: &dyn EvidenceRepository,
    reference: &ReferenceData,
) -> Result<Vec<FraudSignal>> {
    let mut signals = Vec::new();

    if let Some(domain) = email_domain(&ctx.request.email) {
        if reference.is_disposable_domain(&domain) {
            signals.push(
                FraudSignal::new(
                    SignalType::DisposableEmail,
                    SignalType::DisposableEmail.base_weight(),
                    format!("email domain {domain} is a disposable provider"),
                )
                .with_metadata("domain", domain),
            );
        }
    }

    let normalized = normalize_email(&ctx.request.email);
    let existing = repo.similar_email_accounts(&normalized).await?;
    if existing >= 1 {
        signals.push(
            FraudSignal::new(
                SignalType::SimilarUsernames,
                SignalType::SimilarUsernames.base_weight(),
                format!("{existing} existing account(s) share the normalized email"),
            )
            .with_metadata("existing_accounts", existing.to_string())
            .with_metadata("normalized_email", normalized),
        );
    }

    Ok(signals)
}
