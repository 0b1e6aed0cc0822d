//! Email canonicalization for duplicate-account matching.

/// Domains that treat dots in the local part as insignificant.
const DOT_INSENSITIVE_DOMAINS: [&str; 2] = ["gmail.com", "googlemail.com"];

/// Normalize an address so aliases of the same mailbox collide:
/// lowercased, `+tag` stripped from the local part, and dots removed for
/// domains whose delivery rules ignore them.
pub fn normalize_email(email: &str) -> String {
    let lowered = email.trim().to_lowercase();
    let Some((local, domain)) = lowered.split_once('@') else {
        return lowered;
    };
    let local = match local.split_once('+') {
        Some((base, _)) => base,
        None => local,
    };
    let local = if DOT_INSENSITIVE_DOMAINS.contains(&domain) {
        local.replace('.', "")
    } else {
        local.to_string()
    };
    format!("{local}@{domain}")
}

pub fn email_domain(email: &str) -> Option<String> {
    let lowered = email.trim().to_lowercase();
    lowered
        .rsplit_once('@')
        .map(|(_, domain)| domain.to_string())
        .filter(|domain| !domain.is_empty())
}
