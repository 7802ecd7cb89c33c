mod roster;

pub use roster::load_roster;

use std::env;
use std::time::Duration;

use crate::snmp::{CollectorSettings, NetSnmpTransport};

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub db_max_connections: u32,
    pub roster_path: String,
    pub eol_catalog_path: Option<String>,
    pub export_csv_path: Option<String>,
    pub collect_workers: usize,
    pub probe_timeout_secs: u64,
    pub table_timeout_secs: u64,
    pub chunk_timeout_secs: u64,
    pub chunk_retries: u32,
    pub request_timeout_secs: u64,
    pub snmp_retries: u32,
    pub snmpget_bin: String,
    pub snmpwalk_bin: String,
    pub snmpbulkwalk_bin: String,
    pub retention_days: i64,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self {
            db_path: get_env("DB_PATH", "/data/inventory.db"),
            db_max_connections: get_env("DB_MAX_CONNECTIONS", "5")
                .parse()
                .unwrap_or(5),
            roster_path: get_env("ROSTER_PATH", "/config/roster.json"),
            eol_catalog_path: get_optional_env("EOL_CATALOG_PATH"),
            export_csv_path: get_optional_env("EXPORT_CSV_PATH"),
            collect_workers: get_env("COLLECT_WORKERS", "12").parse().unwrap_or(12).max(1),
            probe_timeout_secs: get_env("SNMP_PROBE_TIMEOUT_SECS", "15").parse().unwrap_or(15),
            table_timeout_secs: get_env("SNMP_TABLE_TIMEOUT_SECS", "30").parse().unwrap_or(30),
            chunk_timeout_secs: get_env("SNMP_CHUNK_TIMEOUT_SECS", "60").parse().unwrap_or(60),
            chunk_retries: get_env("SNMP_CHUNK_RETRIES", "2").parse().unwrap_or(2),
            request_timeout_secs: get_env("SNMP_REQUEST_TIMEOUT_SECS", "5").parse().unwrap_or(5),
            snmp_retries: get_env("SNMP_RETRIES", "1").parse().unwrap_or(1),
            snmpget_bin: get_env("SNMPGET_BIN", "snmpget"),
            snmpwalk_bin: get_env("SNMPWALK_BIN", "snmpwalk"),
            snmpbulkwalk_bin: get_env("SNMPBULKWALK_BIN", "snmpbulkwalk"),
            retention_days: get_env("INVENTORY_RETENTION_DAYS", "30").parse().unwrap_or(30),
        }
    }

    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings {
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            table_timeout: Duration::from_secs(self.table_timeout_secs),
            chunk_timeout: Duration::from_secs(self.chunk_timeout_secs),
            chunk_retries: self.chunk_retries,
        }
    }

    pub fn transport(&self) -> NetSnmpTransport {
        NetSnmpTransport {
            snmpget_bin: self.snmpget_bin.clone(),
            snmpwalk_bin: self.snmpwalk_bin.clone(),
            snmpbulkwalk_bin: self.snmpbulkwalk_bin.clone(),
            request_timeout_secs: self.request_timeout_secs,
            retries: self.snmp_retries,
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Unset and blank both mean "disabled"
fn get_optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
