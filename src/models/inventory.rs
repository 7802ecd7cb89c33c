use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::{Device, PhysicalComponent};

/// Canonical per-device collection status values
pub mod collection_status {
    pub const SUCCESS: &str = "success";
    pub const PARTIAL: &str = "partial";
    pub const FAILED: &str = "failed";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    Success,
    Partial,
    Failed,
}

impl CollectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::Success => collection_status::SUCCESS,
            CollectionStatus::Partial => collection_status::PARTIAL,
            CollectionStatus::Failed => collection_status::FAILED,
        }
    }
}

/// Virtual contexts folded into one physical chassis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VdcInfo {
    pub contexts: Vec<String>,
    pub context_types: Vec<String>,
}

/// A device and its component tree, ready for dedup and normalization.
/// After VDC consolidation one of these stands for the whole chassis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInventory {
    pub device: Device,
    pub components: BTreeMap<u32, PhysicalComponent>,
    pub status: CollectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vdc: Option<VdcInfo>,
    /// Published as "Parent Switch" even after shared FEX units move to its peer
    #[serde(default)]
    pub parent_switch: bool,
}

impl DeviceInventory {
    pub fn new(
        device: Device,
        components: BTreeMap<u32, PhysicalComponent>,
        status: CollectionStatus,
    ) -> Self {
        Self {
            device,
            components,
            status,
            vdc: None,
            parent_switch: false,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.device.hostname
    }

    /// Index of the component reporting `serial`, if any
    pub fn find_serial(&self, serial: &str) -> Option<u32> {
        self.components
            .values()
            .find(|c| !c.serial.is_empty() && c.serial == serial)
            .map(|c| c.index)
    }
}

/// Display position of a published row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    Master,
    Slave,
    Standalone,
    ParentSwitch,
    Fex(Option<u32>),
    Module,
    Sfp,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Master => write!(f, "Master"),
            Position::Slave => write!(f, "Slave"),
            Position::Standalone => write!(f, "Standalone"),
            Position::ParentSwitch => write!(f, "Parent Switch"),
            Position::Fex(Some(n)) => write!(f, "FEX-{}", n),
            Position::Fex(None) => write!(f, "FEX"),
            Position::Module => write!(f, "Module"),
            Position::Sfp => write!(f, "SFP"),
        }
    }
}

pub const COMPONENT_RELATIONSHIP: &str = "Component";

/// Device rows carry hostname and management IP; component rows carry neither
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RowKind {
    Device { hostname: String, ip_address: String },
    Component,
}

/// One line of the flattened inventory table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebRow {
    pub kind: RowKind,
    pub site: String,
    pub parent_hostname: String,
    pub position: Position,
    pub model: String,
    pub serial_number: String,
    pub port_location: String,
    pub vendor: String,
    pub notes: String,
    pub row_order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub announcement_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_of_sale: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_of_support: Option<NaiveDate>,
    #[serde(default)]
    pub eol_confidence: String,
}

impl WebRow {
    pub fn hostname(&self) -> &str {
        match &self.kind {
            RowKind::Device { hostname, .. } => hostname,
            RowKind::Component => "",
        }
    }

    pub fn ip_address(&self) -> &str {
        match &self.kind {
            RowKind::Device { ip_address, .. } => ip_address,
            RowKind::Component => "",
        }
    }

    pub fn is_device(&self) -> bool {
        matches!(self.kind, RowKind::Device { .. })
    }

    /// Device rows repeat their position; component rows are "Component"
    pub fn relationship(&self) -> String {
        match self.kind {
            RowKind::Device { .. } => self.position.to_string(),
            RowKind::Component => COMPONENT_RELATIONSHIP.to_string(),
        }
    }

    /// Check the row's structural invariants
    pub fn validate(&self) -> Result<(), String> {
        if self.parent_hostname.is_empty() {
            return Err("parent hostname is empty".to_string());
        }
        if let RowKind::Device { hostname, .. } = &self.kind {
            if hostname != &self.parent_hostname {
                return Err(format!(
                    "device row hostname {} differs from parent {}",
                    hostname, self.parent_hostname
                ));
            }
        }
        Ok(())
    }
}

/// Counts reported at the end of a collection cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub devices_total: usize,
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    pub rows_published: usize,
    pub rows_pruned: u64,
}

impl CycleSummary {
    pub fn record(&mut self, status: CollectionStatus) {
        self.devices_total += 1;
        match status {
            CollectionStatus::Success => self.succeeded += 1,
            CollectionStatus::Partial => self.partial += 1,
            CollectionStatus::Failed => self.failed += 1,
        }
    }
}

/// Persisted record of one collection cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionRun {
    pub id: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub summary: CycleSummary,
}

/// Persisted outcome of one device within a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCollection {
    pub run_id: String,
    pub hostname: String,
    pub ip_address: String,
    pub status: String,
    pub method: String,
    pub component_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: RowKind, parent: &str, position: Position) -> WebRow {
        WebRow {
            kind,
            site: "HQ".to_string(),
            parent_hostname: parent.to_string(),
            position,
            model: String::new(),
            serial_number: String::new(),
            port_location: String::new(),
            vendor: String::new(),
            notes: String::new(),
            row_order: 1,
            announcement_date: None,
            end_of_sale: None,
            end_of_support: None,
            eol_confidence: String::new(),
        }
    }

    #[test]
    fn test_position_display() {
        assert_eq!(Position::ParentSwitch.to_string(), "Parent Switch");
        assert_eq!(Position::Fex(Some(105)).to_string(), "FEX-105");
        assert_eq!(Position::Fex(None).to_string(), "FEX");
        assert_eq!(Position::Sfp.to_string(), "SFP");
    }

    #[test]
    fn test_relationship() {
        let device = row(
            RowKind::Device {
                hostname: "sw1".to_string(),
                ip_address: "10.0.0.1".to_string(),
            },
            "sw1",
            Position::Standalone,
        );
        assert_eq!(device.relationship(), "Standalone");
        assert_eq!(device.hostname(), "sw1");

        let component = row(RowKind::Component, "sw1", Position::Module);
        assert_eq!(component.relationship(), "Component");
        assert_eq!(component.hostname(), "");
        assert_eq!(component.ip_address(), "");
    }

    #[test]
    fn test_validate() {
        assert!(row(RowKind::Component, "", Position::Module).validate().is_err());
        let mismatched = row(
            RowKind::Device {
                hostname: "sw1".to_string(),
                ip_address: String::new(),
            },
            "sw2",
            Position::Master,
        );
        assert!(mismatched.validate().is_err());
        assert!(row(RowKind::Component, "sw1", Position::Sfp).validate().is_ok());
    }

    #[test]
    fn test_summary_record() {
        let mut summary = CycleSummary::default();
        summary.record(CollectionStatus::Success);
        summary.record(CollectionStatus::Partial);
        summary.record(CollectionStatus::Failed);
        summary.record(CollectionStatus::Success);
        assert_eq!(summary.devices_total, 4);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.partial, 1);
        assert_eq!(summary.failed, 1);
    }
}
