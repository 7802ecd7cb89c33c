//! SNMP collection: net-snmp subprocess transport, output parsing and the
//! per-device entity walk.

pub mod client;
pub mod collector;
pub mod oids;
pub mod value;
pub mod walk;

pub use client::{NetSnmpTransport, SnmpTarget, SnmpTransport};
pub use collector::{Collector, CollectorSettings, RawCollection};
pub use oids::EntityColumn;
pub use value::SnmpValue;

/// Failure of a probe or a single table walk
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnmpError {
    #[error("{host} did not answer the sysDescr probe: {reason}")]
    Unreachable { host: String, reason: String },
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("object not supported by agent")]
    Unsupported,
    #[error("snmp command failed: {0}")]
    Command(String),
    #[error("failed to run {bin}: {reason}")]
    Spawn { bin: String, reason: String },
    #[error("credential '{0}' is not defined in the roster")]
    MissingCredential(String),
}

impl SnmpError {
    /// Worth another attempt on the same column
    pub fn is_retryable(&self) -> bool {
        matches!(self, SnmpError::Timeout { .. } | SnmpError::Command(_))
    }
}
