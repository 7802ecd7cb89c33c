//! Turns raw entity walks into the published inventory table.

pub mod dedup;
pub mod eol;
pub mod enhancer;
pub mod entity;
pub mod site;
pub mod vdc;
pub mod web_format;

pub use dedup::PairRules;
pub use eol::EolCatalog;
pub use enhancer::ModelEnhancer;
pub use site::SiteResolver;
pub use vdc::VdcMatcher;

use crate::models::{CollectionStatus, Device, DeviceInventory, EntityClass, WebRow};
use crate::snmp::RawCollection;

/// Build and enhance one device's component tree and fill in the device
/// facts the walk revealed.
pub fn assemble(
    mut device: Device,
    raw: &RawCollection,
    enhancer: &ModelEnhancer,
) -> DeviceInventory {
    let mut components = entity::build_components(raw);
    let stats = enhancer.enhance(&mut components);
    if stats.fex_models + stats.transceiver_models > 0 {
        tracing::debug!(
            "{}: inferred {} FEX and {} transceiver models",
            device.hostname,
            stats.fex_models,
            stats.transceiver_models
        );
    }

    let platform = enhancer.platform(&raw.system_description);
    device.system_description = raw.system_description.clone();
    device.software_version = platform.software_version;

    let chassis = components
        .values()
        .find(|c| c.class == EntityClass::Chassis && c.is_root() && !c.is_fabric_extender())
        .or_else(|| {
            components
                .values()
                .find(|c| c.class == EntityClass::Chassis && !c.is_fabric_extender())
        });
    if let Some(chassis) = chassis {
        device.model = chassis.model.clone();
        device.serial_number = chassis.serial.clone();
        if platform.vendor.is_empty() {
            device.vendor = chassis.manufacturer.clone();
        }
    }
    if !platform.vendor.is_empty() {
        device.vendor = platform.vendor;
    }
    if device.model.is_empty() {
        if let Some(hint) = platform.model_hint {
            device.model = hint;
        }
    }

    let all_failed = !raw.tables.is_empty()
        && raw
            .tables
            .values()
            .all(|walk| walk.error.is_some() && walk.rows.is_empty());
    let status = if all_failed {
        CollectionStatus::Failed
    } else if raw.is_partial() {
        CollectionStatus::Partial
    } else {
        CollectionStatus::Success
    };

    DeviceInventory::new(device, components, status)
}

/// Rules applied to the full set of collected devices
#[derive(Default)]
pub struct Reconciler {
    pub pair_rules: PairRules,
    pub vdc: VdcMatcher,
}

impl Reconciler {
    /// Pair dedup, VDC consolidation, residual dedup, then flattening.
    /// Input order does not matter; devices are processed by hostname.
    pub fn publish(&self, mut inventories: Vec<DeviceInventory>) -> Vec<WebRow> {
        inventories.sort_by(|a, b| a.hostname().cmp(b.hostname()));
        for inv in inventories.iter_mut() {
            inv.parent_switch = self.pair_rules.is_pair_capable(inv)
                || inv.components.values().any(|c| c.is_fabric_extender());
        }

        let paired = dedup::dedup_pairs(&mut inventories, &self.pair_rules);
        let mut inventories = vdc::consolidate_vdcs(inventories, &self.vdc);
        let residual = dedup::resolve_residual_duplicates(&mut inventories);
        if paired + residual > 0 {
            tracing::info!(
                "Deduplicated {} pair-shared and {} other duplicate components",
                paired,
                residual
            );
        }

        web_format::normalize(&inventories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CollectionMethod, RosterEntry};
    use crate::snmp::walk::WalkRow;
    use crate::snmp::client::TableWalk;
    use crate::snmp::{EntityColumn, SnmpError, SnmpValue};
    use std::collections::BTreeMap;

    fn walk(rows: Vec<(u32, SnmpValue)>, error: Option<SnmpError>) -> TableWalk {
        TableWalk {
            rows: rows.into_iter().map(|(index, value)| WalkRow { index, value }).collect(),
            error,
        }
    }

    fn t(s: &str) -> SnmpValue {
        SnmpValue::Text(s.to_string())
    }

    fn device(hostname: &str) -> Device {
        let entry = RosterEntry {
            hostname: hostname.to_string(),
            ip: "10.0.0.1".to_string(),
            credential: "default".to_string(),
            device_type: None,
            chunked: false,
            site: None,
        };
        Device::from_roster(&entry, "HQ")
    }

    fn nexus_pair_member(hostname: &str, chassis_serial: &str, fex_index: u32) -> RawCollection {
        let mut tables = BTreeMap::new();
        tables.insert(
            EntityColumn::Descr,
            walk(
                vec![
                    (1, t("Nexus 56128P Chassis")),
                    (fex_index, t("Fabric Extender Module 48x1GE 4x10GE")),
                    (300, t("Temperature Sensor")),
                ],
                None,
            ),
        );
        tables.insert(
            EntityColumn::Class,
            walk(
                vec![
                    (1, SnmpValue::Integer(3)),
                    (fex_index, SnmpValue::Integer(3)),
                    (300, SnmpValue::Integer(8)),
                ],
                None,
            ),
        );
        tables.insert(
            EntityColumn::Name,
            walk(vec![(fex_index, t("Fex-105 Nexus2248 Chassis"))], None),
        );
        tables.insert(
            EntityColumn::SerialNum,
            walk(vec![(1, t(chassis_serial)), (fex_index, t("FOX1234")), (300, t("TS1"))], None),
        );
        tables.insert(
            EntityColumn::ModelName,
            walk(vec![(1, t("N5K-C56128P")), (fex_index, t("N2K-C2200"))], None),
        );
        RawCollection {
            system_description: format!(
                "Cisco NX-OS(tm) n6000, Software (n6000-uk9), Version 7.1(4)N1(1) {}",
                hostname
            ),
            method: CollectionMethod::Chunked,
            tables,
        }
    }

    fn pair_member(
        enhancer: &ModelEnhancer,
        hostname: &str,
        chassis_serial: &str,
        fex_index: u32,
    ) -> DeviceInventory {
        let raw = nexus_pair_member(hostname, chassis_serial, fex_index);
        assemble(device(hostname), &raw, enhancer)
    }

    #[test]
    fn test_assemble_sets_device_facts() {
        let enhancer = ModelEnhancer::default();
        let inv = pair_member(&enhancer, "HQ-56128P-01", "FOC01", 149);

        assert_eq!(inv.status, CollectionStatus::Success);
        assert_eq!(inv.device.model, "N5K-C56128P");
        assert_eq!(inv.device.serial_number, "FOC01");
        assert_eq!(inv.device.vendor, "Cisco");
        assert_eq!(inv.device.software_version, "7.1(4)N1(1)");
        assert_eq!(inv.components.len(), 2);
        assert_eq!(inv.components[&149].model, "N2K-C2248TP-1GE");
    }

    #[test]
    fn test_assemble_model_hint_fallback() {
        let enhancer = ModelEnhancer::default();
        let mut tables = BTreeMap::new();
        tables.insert(EntityColumn::Descr, walk(vec![], None));
        let raw = RawCollection {
            system_description: "Cisco NX-OS(tm) n5000, Software (n5000-uk9)".to_string(),
            method: CollectionMethod::Full,
            tables,
        };
        let inv = assemble(device("sw"), &raw, &enhancer);
        assert_eq!(inv.device.model, "N5K-C5548UP");
        assert_eq!(inv.status, CollectionStatus::Success);
    }

    #[test]
    fn test_partial_device_publishes_without_optics() {
        let enhancer = ModelEnhancer::default();
        let mut tables = BTreeMap::new();
        tables.insert(
            EntityColumn::Descr,
            walk(
                vec![
                    (1, t("Catalyst Chassis")),
                    (2, t("Uplink Module")),
                    (500, t("1000BaseSX SFP")),
                ],
                None,
            ),
        );
        tables.insert(
            EntityColumn::Class,
            walk(
                vec![
                    (1, SnmpValue::Integer(3)),
                    (2, SnmpValue::Integer(9)),
                    (500, SnmpValue::Integer(10)),
                ],
                None,
            ),
        );
        tables.insert(
            EntityColumn::SerialNum,
            walk(vec![(1, t("FOC1")), (2, t("FOC2"))], Some(SnmpError::Timeout { secs: 30 })),
        );
        tables.insert(
            EntityColumn::ModelName,
            walk(
                vec![(1, t("WS-C3850-48P")), (2, t("C3850-NM-4-1G"))],
                Some(SnmpError::Timeout { secs: 30 }),
            ),
        );
        let raw = RawCollection {
            system_description: "Cisco IOS Software".to_string(),
            method: CollectionMethod::Full,
            tables,
        };

        let inv = assemble(device("BR-3850"), &raw, &enhancer);
        assert_eq!(inv.status, CollectionStatus::Partial);

        let rows = Reconciler::default().publish(vec![inv]);
        let positions: Vec<String> = rows.iter().map(|r| r.position.to_string()).collect();
        assert_eq!(positions, vec!["Standalone", "Module"]);
        assert!(rows.iter().all(|r| r.position.to_string() != "SFP"));
    }

    #[test]
    fn test_all_tables_failed_is_failed() {
        let enhancer = ModelEnhancer::default();
        let mut tables = BTreeMap::new();
        tables.insert(EntityColumn::Descr, TableWalk::failed(SnmpError::Timeout { secs: 30 }));
        tables.insert(EntityColumn::SerialNum, TableWalk::failed(SnmpError::Timeout { secs: 30 }));
        let raw = RawCollection {
            system_description: "Cisco IOS Software".to_string(),
            method: CollectionMethod::Full,
            tables,
        };
        assert_eq!(assemble(device("sw"), &raw, &enhancer).status, CollectionStatus::Failed);
    }

    #[test]
    fn test_publish_pair_scenario() {
        let enhancer = ModelEnhancer::default();
        let second = pair_member(&enhancer, "HQ-56128P-02", "FOC02", 151);
        let first = pair_member(&enhancer, "HQ-56128P-01", "FOC01", 149);

        // worker completion order must not matter
        let rows = Reconciler::default().publish(vec![second, first]);

        let fex_rows: Vec<&WebRow> = rows.iter().filter(|r| r.serial_number == "FOX1234").collect();
        assert_eq!(fex_rows.len(), 1);
        assert_eq!(fex_rows[0].parent_hostname, "HQ-56128P-01");
        assert_eq!(fex_rows[0].notes, "Shared with: HQ-56128P-02");
        assert_eq!(fex_rows[0].model, "N2K-C2248TP-1GE");

        let hosts: Vec<&str> = rows
            .iter()
            .filter(|r| r.is_device())
            .map(|r| r.hostname())
            .collect();
        assert_eq!(hosts, vec!["HQ-56128P-01", "HQ-56128P-02"]);
        let positions: Vec<String> = rows
            .iter()
            .filter(|r| r.is_device())
            .map(|r| r.position.to_string())
            .collect();
        assert_eq!(positions, vec!["Parent Switch", "Parent Switch"]);
        let second = rows.iter().position(|r| r.hostname() == "HQ-56128P-02").unwrap();
        assert_eq!(second, rows.len() - 1);
    }

    #[test]
    fn test_parent_switch_marked_before_dedup() {
        use crate::inventory::dedup::tests::{inventory, part};

        // not a pair platform, so the position must come from its own FEX units
        let fex = part(120, EntityClass::Chassis, "Fabric Extender Module", "N2K-C2232PP", "FOX9");
        let rows = Reconciler::default().publish(vec![
            inventory("BR-3850", "WS-C3850-48P", vec![]),
            inventory("DC-9K-01", "N9K-C93180YC", vec![fex]),
            inventory("DC-N5K-02", "N5K-C5548UP", vec![]),
        ]);
        let positions: Vec<(&str, String)> = rows
            .iter()
            .filter(|r| r.is_device())
            .map(|r| (r.hostname(), r.position.to_string()))
            .collect();
        assert_eq!(
            positions,
            vec![
                ("BR-3850", "Standalone".to_string()),
                ("DC-9K-01", "Parent Switch".to_string()),
                ("DC-N5K-02", "Parent Switch".to_string()),
            ]
        );
    }

    #[test]
    fn test_publish_is_idempotent() {
        let enhancer = ModelEnhancer::default();
        let build = || {
            vec![
                pair_member(&enhancer, "HQ-56128P-01", "FOC01", 149),
                pair_member(&enhancer, "HQ-56128P-02", "FOC02", 151),
            ]
        };
        let reconciler = Reconciler::default();
        assert_eq!(reconciler.publish(build()), reconciler.publish(build()));
    }
}
