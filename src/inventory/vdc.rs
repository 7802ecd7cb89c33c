use regex_lite::Regex;
use std::collections::HashMap;

use crate::models::{DeviceInventory, VdcInfo};

const VDC_PATTERN: &str = r"(?i)^(.*?-7\d{3}-\d{2})-(ADMIN|CORE|EDGE|PCI)(?:\..*)?$";

/// Splits virtual-context hostnames like `DC-7010-01-CORE` into base and context type
pub struct VdcMatcher {
    re: Option<Regex>,
}

impl VdcMatcher {
    pub fn new() -> Self {
        let re = match Regex::new(VDC_PATTERN) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!("VDC hostname pattern failed to compile: {}", e);
                None
            }
        };
        Self { re }
    }

    /// (base hostname, context type) for a virtual-context hostname
    pub fn split(&self, hostname: &str) -> Option<(String, String)> {
        let caps = self.re.as_ref()?.captures(hostname)?;
        let base = caps.get(1)?.as_str().to_string();
        let context = caps.get(2)?.as_str().to_uppercase();
        Some((base, context))
    }
}

impl Default for VdcMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold every virtual context of one chassis into a single inventory named
/// after the base hostname. The first context seen supplies the component
/// tree; the others only contribute their names to the notes.
pub fn consolidate_vdcs(
    inventories: Vec<DeviceInventory>,
    matcher: &VdcMatcher,
) -> Vec<DeviceInventory> {
    let mut out: Vec<DeviceInventory> = Vec::with_capacity(inventories.len());
    let mut by_base: HashMap<String, usize> = HashMap::new();

    for mut inv in inventories {
        let Some((base, context)) = matcher.split(inv.hostname()) else {
            out.push(inv);
            continue;
        };
        let key = base.to_uppercase();
        let original = inv.hostname().to_string();

        match by_base.get(&key) {
            Some(&slot) => {
                if let Some(info) = out[slot].vdc.as_mut() {
                    info.contexts.push(original.clone());
                    if !info.context_types.contains(&context) {
                        info.context_types.push(context);
                    }
                }
                tracing::debug!("Consolidated {} into {}", original, out[slot].hostname());
            }
            None => {
                inv.device.hostname = base;
                inv.vdc = Some(VdcInfo {
                    contexts: vec![original],
                    context_types: vec![context],
                });
                by_base.insert(key, out.len());
                out.push(inv);
            }
        }
    }

    for inv in &out {
        if let Some(info) = &inv.vdc {
            tracing::info!(
                "VDC {}: {} contexts ({})",
                inv.hostname(),
                info.contexts.len(),
                info.context_types.join(", ")
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::dedup::tests::{inventory, part};
    use crate::models::EntityClass;

    #[test]
    fn test_split() {
        let m = VdcMatcher::new();
        assert_eq!(
            m.split("DC-7010-01-CORE"),
            Some(("DC-7010-01".to_string(), "CORE".to_string()))
        );
        assert_eq!(
            m.split("dc-7018-02-admin.corp.example.com"),
            Some(("dc-7018-02".to_string(), "ADMIN".to_string()))
        );
        assert_eq!(m.split("DC-7010-01"), None);
        assert_eq!(m.split("DC-5548-01-CORE"), None);
        assert_eq!(m.split("DC-7010-01-LAB"), None);
    }

    #[test]
    fn test_consolidate_first_seen_tree_wins() {
        let inventories = vec![
            inventory(
                "DC-7010-01-ADMIN",
                "N7K-C7010",
                vec![part(1, EntityClass::Chassis, "Nexus7000 C7010", "N7K-C7010", "JAF1")],
            ),
            inventory(
                "DC-7010-01-CORE",
                "N7K-C7010",
                vec![part(1, EntityClass::Chassis, "", "N7K-C7010", "JAF1")],
            ),
            inventory("DC-CORE-SW", "WS-C3850", vec![]),
            inventory("DC-7010-01-EDGE", "N7K-C7010", vec![]),
        ];
        let out = consolidate_vdcs(inventories, &VdcMatcher::new());

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].hostname(), "DC-7010-01");
        assert_eq!(out[0].components[&1].description, "Nexus7000 C7010");
        let info = out[0].vdc.as_ref().unwrap();
        assert_eq!(info.contexts, vec!["DC-7010-01-ADMIN", "DC-7010-01-CORE", "DC-7010-01-EDGE"]);
        assert_eq!(info.context_types, vec!["ADMIN", "CORE", "EDGE"]);
        assert_eq!(out[1].hostname(), "DC-CORE-SW");
        assert!(out[1].vdc.is_none());
    }
}
