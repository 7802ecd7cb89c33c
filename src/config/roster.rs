use std::collections::HashSet;
use std::path::Path;

use crate::models::Roster;
use crate::utils::{is_valid_hostname, is_valid_ipv4};

/// Reasons a roster cannot be used. Any of these aborts the cycle.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to read roster {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid roster JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("roster has no devices")]
    Empty,
    #[error("device {hostname} references unknown credential {credential}")]
    UnknownCredential { hostname: String, credential: String },
    #[error("invalid hostname: {0:?}")]
    InvalidHostname(String),
    #[error("device {hostname} has invalid IPv4 address {ip:?}")]
    InvalidIp { hostname: String, ip: String },
    #[error("duplicate hostname in roster: {0}")]
    DuplicateHostname(String),
}

/// Read and validate the roster file
pub async fn load_roster(path: impl AsRef<Path>) -> Result<Roster, RosterError> {
    let path = path.as_ref();
    let data = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| RosterError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let roster = parse_roster(&data)?;
    tracing::info!(
        "Loaded roster with {} devices, {} credentials, {} site rules",
        roster.devices.len(),
        roster.credentials.len(),
        roster.sites.len()
    );
    Ok(roster)
}

pub fn parse_roster(data: &str) -> Result<Roster, RosterError> {
    let roster: Roster = serde_json::from_str(data)?;
    validate(&roster)?;
    Ok(roster)
}

fn validate(roster: &Roster) -> Result<(), RosterError> {
    if roster.devices.is_empty() {
        return Err(RosterError::Empty);
    }
    let mut seen = HashSet::new();
    for entry in &roster.devices {
        if !is_valid_hostname(&entry.hostname) {
            return Err(RosterError::InvalidHostname(entry.hostname.clone()));
        }
        if !is_valid_ipv4(&entry.ip) {
            return Err(RosterError::InvalidIp {
                hostname: entry.hostname.clone(),
                ip: entry.ip.clone(),
            });
        }
        if !roster.credentials.contains_key(&entry.credential) {
            return Err(RosterError::UnknownCredential {
                hostname: entry.hostname.clone(),
                credential: entry.credential.clone(),
            });
        }
        if !seen.insert(entry.hostname.to_lowercase()) {
            return Err(RosterError::DuplicateHostname(entry.hostname.clone()));
        }
    }
    Ok(())
}
