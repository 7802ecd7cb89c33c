use std::collections::HashSet;

use crate::models::{DeviceInventory, EntityClass, PhysicalComponent, Position, RowKind, WebRow};

/// Project consolidated inventories into the flat display table.
///
/// Devices are ordered by site then hostname (case-insensitive). Each device
/// row is followed by its slaves, FEX units by number, modules, then
/// transceivers. A serial is published at most once per call.
pub fn normalize(inventories: &[DeviceInventory]) -> Vec<WebRow> {
    let mut ordered: Vec<&DeviceInventory> = inventories.iter().collect();
    ordered.sort_by(|a, b| {
        let ka = (a.device.site.to_lowercase(), a.device.hostname.to_lowercase());
        let kb = (b.device.site.to_lowercase(), b.device.hostname.to_lowercase());
        ka.cmp(&kb)
    });

    let mut seen: HashSet<String> = HashSet::new();
    let mut rows = Vec::new();
    for inv in ordered {
        device_rows(inv, &mut seen, &mut rows);
    }

    rows.retain(|row| match row.validate() {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Dropping invalid row for {}: {}", row.parent_hostname, e);
            false
        }
    });
    for (i, row) in rows.iter_mut().enumerate() {
        row.row_order = i as i64 + 1;
    }
    rows
}

fn device_rows(inv: &DeviceInventory, seen: &mut HashSet<String>, rows: &mut Vec<WebRow>) {
    let hostname = inv.device.hostname.as_str();

    let mut chassis: Vec<&PhysicalComponent> = inv
        .components
        .values()
        .filter(|c| c.class == EntityClass::Chassis && !c.is_fabric_extender())
        .collect();
    chassis.sort_by_key(|c| c.index);

    let mut fex: Vec<&PhysicalComponent> = inv
        .components
        .values()
        .filter(|c| c.is_fabric_extender())
        .collect();
    fex.sort_by_key(|c| (c.fex_number().unwrap_or(999), c.index));

    let mut modules: Vec<&PhysicalComponent> = inv
        .components
        .values()
        .filter(|c| {
            c.class != EntityClass::Chassis && !c.is_fabric_extender() && !c.is_transceiver()
        })
        .collect();
    modules.sort_by_key(|c| c.index);

    let mut sfps: Vec<&PhysicalComponent> = inv
        .components
        .values()
        .filter(|c| c.is_transceiver())
        .collect();
    sfps.sort_by_key(|c| c.index);

    let position = if inv.parent_switch || !fex.is_empty() {
        Position::ParentSwitch
    } else if chassis.len() > 1 {
        Position::Master
    } else {
        Position::Standalone
    };

    let primary = chassis.first().copied();
    let model = primary
        .map(|c| c.model.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| inv.device.model.clone());
    let mut serial = primary
        .map(|c| c.serial.clone())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| inv.device.serial_number.clone());
    if !serial.is_empty() && !seen.insert(serial.clone()) {
        tracing::warn!(
            "{}: chassis serial {} already published, emitting device row without it",
            hostname,
            serial
        );
        serial.clear();
    }

    let mut notes = Vec::new();
    if let Some(vdc) = &inv.vdc {
        notes.push(format!("Consolidated from: {}", vdc.contexts.join(", ")));
    }
    if let Some(c) = primary {
        notes.extend(shared_note(c));
    }

    rows.push(WebRow {
        kind: RowKind::Device {
            hostname: hostname.to_string(),
            ip_address: inv.device.ip_address.clone(),
        },
        site: inv.device.site.clone(),
        parent_hostname: hostname.to_string(),
        position,
        model,
        serial_number: serial,
        port_location: String::new(),
        vendor: inv.device.vendor.clone(),
        notes: notes.join("; "),
        row_order: 0,
        announcement_date: None,
        end_of_sale: None,
        end_of_support: None,
        eol_confidence: String::new(),
    });

    let slaves = chassis.iter().skip(1).map(|c| (*c, Position::Slave));
    let fex_rows = fex.iter().map(|c| (*c, Position::Fex(c.fex_number())));
    let module_rows = modules.iter().map(|c| (*c, Position::Module));
    let sfp_rows = sfps.iter().map(|c| (*c, Position::Sfp));

    for (component, position) in slaves.chain(fex_rows).chain(module_rows).chain(sfp_rows) {
        if let Some(row) = component_row(inv, component, position, seen) {
            rows.push(row);
        }
    }
}

fn component_row(
    inv: &DeviceInventory,
    component: &PhysicalComponent,
    position: Position,
    seen: &mut HashSet<String>,
) -> Option<WebRow> {
    if component.serial.is_empty() {
        return None;
    }
    if !seen.insert(component.serial.clone()) {
        tracing::debug!(
            "{}: serial {} already published, skipping",
            inv.device.hostname,
            component.serial
        );
        return None;
    }

    let port_location = match position {
        Position::Fex(_) if !component.description.is_empty() => component.description.clone(),
        _ => component.name.clone(),
    };

    let mut notes = Vec::new();
    if position == Position::Sfp && !component.description.is_empty() {
        notes.push(component.description.clone());
    }
    notes.extend(shared_note(component));

    let vendor = component
        .vendor
        .clone()
        .filter(|v| !v.is_empty())
        .or_else(|| Some(component.manufacturer.clone()).filter(|m| !m.is_empty()))
        .unwrap_or_else(|| inv.device.vendor.clone());

    Some(WebRow {
        kind: RowKind::Component,
        site: inv.device.site.clone(),
        parent_hostname: inv.device.hostname.clone(),
        position,
        model: component.model.clone(),
        serial_number: component.serial.clone(),
        port_location,
        vendor,
        notes: notes.join("; "),
        row_order: 0,
        announcement_date: None,
        end_of_sale: None,
        end_of_support: None,
        eol_confidence: String::new(),
    })
}

fn shared_note(component: &PhysicalComponent) -> Option<String> {
    if component.shared_with.is_empty() {
        None
    } else {
        Some(format!("Shared with: {}", component.shared_with.join(", ")))
    }
}
