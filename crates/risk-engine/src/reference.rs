//! Externally-supplied reference data sets. The built-in defaults cover a
//! sample of well-known providers; production deployments load the full,
//! periodically-refreshed sets and extend these at startup.

use std::collections::HashSet;

pub struct ReferenceData {
    disposable_domains: HashSet<String>,
    datacenter_prefixes: Vec<String>,
}

impl ReferenceData {
    pub fn new() -> Self {
        let disposable_domains = [
            "mailinator.com",
            "guerrillamail.com",
            "10minutemail.com",
            "tempmail.com",
            "temp-mail.org",
            "throwawaymail.com",
            "yopmail.com",
            "sharklasers.com",
            "getnada.com",
            "trashmail.com",
            "maildrop.cc",
            "dispostable.com",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        let datacenter_prefixes = [
            // Amazon AWS
            "52.", "54.", "3.",
            // Microsoft Azure
            "13.64.", "20.",
            // Google Cloud
            "35.184.", "34.",
            // DigitalOcean
            "167.71.", "159.65.", "46.101.",
            // OVH
            "51.38.", "51.68.",
            // NordVPN
            "5.253.206.",
            // Tor exit nodes
            "185.220.101.", "51.15.43.",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        Self {
            disposable_domains,
            datacenter_prefixes,
        }
    }

    pub fn with_disposable_domain(mut self, domain: impl Into<String>) -> Self {
        self.disposable_domains.insert(domain.into().to_lowercase());
        self
    }

    pub fn with_datacenter_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.datacenter_prefixes.push(prefix.into());
        self
    }

    pub fn is_disposable_domain(&self, domain: &str) -> bool {
        self.disposable_domains.contains(&domain.to_lowercase())
    }

    pub fn is_datacenter_ip(&self, ip: &str) -> bool {
        self.datacenter_prefixes
            .iter()
            .any(|prefix| ip.starts_with(prefix.as_str()))
    }
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self::new()
    }
}
