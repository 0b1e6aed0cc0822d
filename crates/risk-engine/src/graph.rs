//! Referral ring detection over the referral edge relation.

use std::collections::HashSet;

use crate::error::Result;
use crate::repository::EvidenceRepository;

/// Maximum hops walked backward through the referrer chain.
pub const MAX_RING_DEPTH: usize = 3;

/// Walks backward from the proposed referrer via `find_referrer_of`,
/// looking for the candidate within `max_depth` hops. A self-referral
/// (candidate proposed as their own referrer) detects on the first hop.
/// The visited set stops the walk on malformed or duplicated edges, so
/// cost stays at one repository call per hop.
pub async fn detect_ring(
    repo: &dyn EvidenceRepository,
    candidate_id: &str,
    referrer_id: &str,
    max_depth: usize,
) -> Result<bool> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut current = referrer_id.to_string();

    for _ in 0..max_depth {
        if current == candidate_id {
            return Ok(true);
        }
        if !visited.insert(current.clone()) {
            // Chain loops without touching the candidate.
            return Ok(false);
        }
        match repo.find_referrer_of(&current).await? {
            Some(next) => current = next,
            None => return Ok(false),
        }
    }

    Ok(false)
}
