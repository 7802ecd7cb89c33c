use std::collections::BTreeMap;

use crate::models::{EntityClass, PhysicalComponent};
use crate::snmp::{EntityColumn, RawCollection, SnmpValue};

/// Environmental entities that never belong in a hardware inventory
const DESCRIPTION_DENYLIST: &[&str] = &["temperature", "voltage", "sensor", "thermal", "humidity"];

const OPTICS_KEYWORDS: &[&str] = &[
    "transceiver",
    "sfp",
    "qsfp",
    "gbic",
    "xfp",
    "1000basesx",
    "1000baselx",
    "1000base-sx",
    "1000base-lx",
    "10gbase",
];

const OPTICS_MODEL_PREFIXES: &[&str] = &["GLC-", "SFP-", "QSFP-", "XFP-", "CFP-", "CVR-"];

/// Join the per-column walks of one device into components keyed by
/// entity index, then drop everything that carries no inventory value.
pub fn build_components(raw: &RawCollection) -> BTreeMap<u32, PhysicalComponent> {
    let mut components: BTreeMap<u32, PhysicalComponent> = BTreeMap::new();

    for (col, walk) in &raw.tables {
        for row in walk.rows.iter().filter(|r| !r.value.is_empty()) {
            let component = components
                .entry(row.index)
                .or_insert_with(|| PhysicalComponent::new(row.index));
            apply_column(component, *col, &row.value);
        }
    }

    let total = components.len();
    components.retain(|_, c| {
        classify_transceiver(c);
        let keep = keep_component(c);
        if !keep {
            tracing::trace!("Dropping {} entity {} ({})", c.class.as_str(), c.index, c.description);
        }
        keep
    });
    if total > components.len() {
        tracing::debug!("Discarded {} of {} entities", total - components.len(), total);
    }
    components
}

fn apply_column(component: &mut PhysicalComponent, col: EntityColumn, value: &SnmpValue) {
    match col {
        EntityColumn::Descr => component.description = value.as_text(),
        EntityColumn::ContainedIn => {
            component.contained_in = value
                .as_integer()
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(0)
        }
        EntityColumn::Class => {
            component.class = value.as_integer().map(EntityClass::from_code).unwrap_or_default()
        }
        EntityColumn::ParentRelPos => component.parent_rel_pos = value.as_integer().unwrap_or(-1),
        EntityColumn::Name => component.name = value.as_text(),
        EntityColumn::HardwareRev => component.hardware_rev = value.as_text(),
        EntityColumn::FirmwareRev => component.firmware_rev = value.as_text(),
        EntityColumn::SoftwareRev => component.software_rev = value.as_text(),
        EntityColumn::SerialNum => component.serial = value.as_text(),
        EntityColumn::MfgName => component.manufacturer = value.as_text(),
        EntityColumn::ModelName => component.model = value.as_text(),
    }
}

/// Pluggable optics report as module, port or other depending on platform
fn classify_transceiver(component: &mut PhysicalComponent) {
    if !matches!(
        component.class,
        EntityClass::Module | EntityClass::Port | EntityClass::Other | EntityClass::Unknown
    ) {
        return;
    }
    let descr = component.description.to_lowercase();
    let model = component.model.to_uppercase();
    if OPTICS_KEYWORDS.iter().any(|k| descr.contains(k))
        || OPTICS_MODEL_PREFIXES.iter().any(|p| model.starts_with(p))
    {
        component.class = EntityClass::Transceiver;
    }
}

fn keep_component(component: &PhysicalComponent) -> bool {
    if component.class == EntityClass::Sensor {
        return false;
    }
    let descr = component.description.to_lowercase();
    if DESCRIPTION_DENYLIST.iter().any(|d| descr.contains(d)) {
        return false;
    }
    component.is_reportable()
}
