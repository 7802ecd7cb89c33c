use crate::models::{RosterEntry, SiteRule};

pub const UNKNOWN_SITE: &str = "Unknown";

/// Assigns site labels to roster entries
#[derive(Debug, Clone, Default)]
pub struct SiteResolver {
    rules: Vec<SiteRule>,
}

impl SiteResolver {
    pub fn new(rules: Vec<SiteRule>) -> Self {
        Self { rules }
    }

    /// Explicit roster site first, then IP prefix rules, then hostname prefix rules
    pub fn resolve(&self, entry: &RosterEntry) -> String {
        if let Some(site) = entry.site.as_deref().filter(|s| !s.trim().is_empty()) {
            return site.trim().to_string();
        }
        if let Some(rule) = self
            .rules
            .iter()
            .find(|r| r.ip_prefixes.iter().any(|p| entry.ip.starts_with(p.as_str())))
        {
            return rule.name.clone();
        }
        let host = entry.hostname.to_uppercase();
        self.rules
            .iter()
            .find(|r| {
                r.hostname_prefixes
                    .iter()
                    .any(|p| host.starts_with(&p.to_uppercase()))
            })
            .map(|r| r.name.clone())
            .unwrap_or_else(|| UNKNOWN_SITE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(hostname: &str, ip: &str, site: Option<&str>) -> RosterEntry {
        RosterEntry {
            hostname: hostname.to_string(),
            ip: ip.to_string(),
            credential: "default".to_string(),
            device_type: None,
            chunked: false,
            site: site.map(|s| s.to_string()),
        }
    }

    fn resolver() -> SiteResolver {
        SiteResolver::new(vec![
            SiteRule {
                name: "HQ".to_string(),
                ip_prefixes: vec!["10.0.".to_string()],
                hostname_prefixes: vec!["hq-".to_string()],
            },
            SiteRule {
                name: "Datacenter".to_string(),
                ip_prefixes: vec!["10.101.".to_string()],
                hostname_prefixes: vec!["DC-".to_string()],
            },
        ])
    }

    #[test]
    fn test_explicit_site_wins() {
        assert_eq!(resolver().resolve(&entry("HQ-SW1", "10.0.0.1", Some("Lab"))), "Lab");
    }

    #[test]
    fn test_ip_before_hostname() {
        assert_eq!(resolver().resolve(&entry("HQ-SW1", "10.101.5.1", None)), "Datacenter");
    }

    #[test]
    fn test_hostname_prefix_case_insensitive() {
        assert_eq!(resolver().resolve(&entry("dc-core-01", "192.168.1.1", None)), "Datacenter");
    }

    #[test]
    fn test_unknown_site() {
        assert_eq!(resolver().resolve(&entry("branch-01", "172.16.0.1", Some(" "))), UNKNOWN_SITE);
    }
}
