use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical collection method values
pub mod collection_method {
    pub const FULL: &str = "full";
    pub const CHUNKED: &str = "chunked";
}

/// How a device's entity table is walked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionMethod {
    Full,
    Chunked,
}

impl CollectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionMethod::Full => collection_method::FULL,
            CollectionMethod::Chunked => collection_method::CHUNKED,
        }
    }
}

/// SNMP credential descriptor referenced by roster entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Credential {
    #[serde(rename = "v2c")]
    Community { community: String },
    #[serde(rename = "v3")]
    Usm {
        user: String,
        #[serde(default = "default_auth_protocol")]
        auth_protocol: String,
        auth_password: String,
        #[serde(default = "default_priv_protocol")]
        priv_protocol: String,
        priv_password: String,
    },
}

fn default_auth_protocol() -> String {
    "SHA".to_string()
}

fn default_priv_protocol() -> String {
    "AES".to_string()
}

impl Credential {
    /// Short label for logs; never includes secrets
    pub fn label(&self) -> String {
        match self {
            Credential::Community { .. } => "v2c".to_string(),
            Credential::Usm { user, .. } => format!("v3:{}", user),
        }
    }
}

/// One device to collect from, as listed in the roster file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub hostname: String,
    pub ip: String,
    pub credential: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    /// Walk column-by-column instead of the full table
    #[serde(default)]
    pub chunked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
}

impl RosterEntry {
    pub fn method(&self) -> CollectionMethod {
        if self.chunked {
            CollectionMethod::Chunked
        } else {
            CollectionMethod::Full
        }
    }
}

/// Site label assignment rule; IP prefixes are tried before hostname prefixes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteRule {
    pub name: String,
    #[serde(default)]
    pub ip_prefixes: Vec<String>,
    #[serde(default)]
    pub hostname_prefixes: Vec<String>,
}

/// Roster document: devices, named credentials and site rules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    pub devices: Vec<RosterEntry>,
    #[serde(default)]
    pub credentials: HashMap<String, Credential>,
    #[serde(default)]
    pub sites: Vec<SiteRule>,
}

/// Device record for one collection cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub hostname: String,
    pub ip_address: String,
    pub vendor: String,
    pub model: String,
    pub software_version: String,
    pub serial_number: String,
    pub site: String,
    pub method: CollectionMethod,
    pub system_description: String,
    /// Roster hint such as "nexus5k"; empty when not given
    #[serde(default)]
    pub device_type: String,
}

impl Device {
    pub fn from_roster(entry: &RosterEntry, site: &str) -> Self {
        Self {
            hostname: entry.hostname.clone(),
            ip_address: entry.ip.clone(),
            vendor: String::new(),
            model: String::new(),
            software_version: String::new(),
            serial_number: String::new(),
            site: site.to_string(),
            method: entry.method(),
            system_description: String::new(),
            device_type: entry.device_type.clone().unwrap_or_default(),
        }
    }
}
