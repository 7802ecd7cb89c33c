use std::collections::{BTreeMap, HashMap};

use crate::models::DeviceInventory;

/// Which devices form redundant pairs that report each other's hardware
#[derive(Debug, Clone)]
pub struct PairRules {
    /// Matched case-insensitively against model, sysDescr, hostname and the
    /// roster's device type hint
    pub platform_markers: Vec<String>,
}

impl Default for PairRules {
    fn default() -> Self {
        Self {
            platform_markers: ["N5K", "N56", "N6K", "n5000", "n6000", "56128P", "5548", "5596"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl PairRules {
    pub fn is_pair_capable(&self, inventory: &DeviceInventory) -> bool {
        let device = &inventory.device;
        let haystack = format!(
            "{} {} {} {}",
            device.model, device.system_description, device.hostname, device.device_type
        )
        .to_lowercase();
        self.platform_markers
            .iter()
            .any(|m| haystack.contains(&m.to_lowercase()))
    }
}

/// Split `HQ-56128P-01` into (`HQ-56128P`, 1)
pub fn pair_key(hostname: &str) -> Option<(&str, u32)> {
    let (prefix, suffix) = hostname.rsplit_once('-')?;
    if prefix.is_empty() || suffix.len() != 2 || !suffix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((prefix, suffix.parse().ok()?))
}

/// Remove components that both members of a redundant pair report. The
/// lowest-suffix member keeps the component and lists the others in
/// `shared_with`. Returns the number of components removed.
pub fn dedup_pairs(inventories: &mut [DeviceInventory], rules: &PairRules) -> usize {
    let mut groups: BTreeMap<String, Vec<(u32, usize)>> = BTreeMap::new();
    for (i, inv) in inventories.iter().enumerate() {
        if let Some((prefix, n)) = pair_key(inv.hostname()) {
            if rules.is_pair_capable(inv) {
                groups.entry(prefix.to_uppercase()).or_default().push((n, i));
            }
        }
    }

    let mut removed = 0;
    for (prefix, mut members) in groups {
        if members.len() < 2 {
            continue;
        }
        members.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| inventories[a.1].hostname().cmp(inventories[b.1].hostname()))
        });
        let canonical = members[0].1;
        let canonical_host = inventories[canonical].hostname().to_string();
        let mut reporters: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for &(_, other) in &members[1..] {
            let shared: Vec<(u32, u32, String)> = inventories[other]
                .components
                .values()
                .filter(|c| !c.serial.is_empty())
                .filter_map(|c| {
                    inventories[canonical]
                        .find_serial(&c.serial)
                        .map(|idx| (c.index, idx, c.serial.clone()))
                })
                .collect();
            if shared.is_empty() {
                continue;
            }

            let other_host = inventories[other].hostname().to_string();
            for (other_idx, canon_idx, serial) in &shared {
                inventories[other].components.remove(other_idx);
                if let Some(c) = inventories[canonical].components.get_mut(canon_idx) {
                    c.add_shared_with(&other_host);
                }
                reporters
                    .entry(serial.clone())
                    .or_insert_with(|| vec![canonical_host.clone()])
                    .push(other_host.clone());
            }
            removed += shared.len();
            tracing::info!(
                "Pair {}: {} shared components kept on {}, removed from {}",
                prefix,
                shared.len(),
                canonical_host,
                other_host
            );
        }

        for (serial, hosts) in reporters.iter().filter(|(_, hosts)| hosts.len() > 2) {
            tracing::warn!(
                "Serial {} reported by {} devices in group {} ({}); keeping it on {}",
                serial,
                hosts.len(),
                prefix,
                hosts.join(", "),
                canonical_host
            );
        }
    }
    removed
}

/// Final sweep so every serial is owned by exactly one device. Devices are
/// visited in order and the first reporter wins. Returns the number of
/// components removed.
pub fn resolve_residual_duplicates(inventories: &mut [DeviceInventory]) -> usize {
    let mut owners: HashMap<String, (usize, u32)> = HashMap::new();
    let mut reporters: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut removed = 0;

    for i in 0..inventories.len() {
        let mut dupes = Vec::new();
        for c in inventories[i].components.values() {
            if c.serial.is_empty() {
                continue;
            }
            match owners.get(&c.serial) {
                Some((owner, _)) if *owner != i => dupes.push((c.index, c.serial.clone())),
                Some(_) => {}
                None => {
                    owners.insert(c.serial.clone(), (i, c.index));
                }
            }
        }

        let host = inventories[i].hostname().to_string();
        for (index, serial) in dupes {
            let Some(&(owner, owner_index)) = owners.get(&serial) else {
                continue;
            };
            inventories[i].components.remove(&index);
            if let Some(c) = inventories[owner].components.get_mut(&owner_index) {
                c.add_shared_with(&host);
            }
            let owner_host = inventories[owner].hostname().to_string();
            reporters.entry(serial).or_insert_with(|| vec![owner_host]).push(host.clone());
            removed += 1;
        }
    }

    for (serial, hosts) in &reporters {
        if hosts.len() > 2 {
            tracing::warn!(
                "Serial {} reported by {} devices ({}); keeping it on {}",
                serial,
                hosts.len(),
                hosts.join(", "),
                hosts[0]
            );
        } else {
            tracing::debug!("Serial {} also reported by {}", serial, hosts[1..].join(", "));
        }
    }
    removed
}
