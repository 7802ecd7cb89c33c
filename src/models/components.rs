use serde::{Deserialize, Serialize};

/// ENTITY-MIB PhysicalClass, plus the transceiver class assigned after decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityClass {
    #[default]
    Other,
    Unknown,
    Chassis,
    Backplane,
    Container,
    PowerSupply,
    Fan,
    Sensor,
    Module,
    Port,
    Stack,
    Cpu,
    Transceiver,
}

impl EntityClass {
    pub fn from_code(code: i64) -> Self {
        match code {
            2 => EntityClass::Unknown,
            3 => EntityClass::Chassis,
            4 => EntityClass::Backplane,
            5 => EntityClass::Container,
            6 => EntityClass::PowerSupply,
            7 => EntityClass::Fan,
            8 => EntityClass::Sensor,
            9 => EntityClass::Module,
            10 => EntityClass::Port,
            11 => EntityClass::Stack,
            12 => EntityClass::Cpu,
            _ => EntityClass::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityClass::Other => "other",
            EntityClass::Unknown => "unknown",
            EntityClass::Chassis => "chassis",
            EntityClass::Backplane => "backplane",
            EntityClass::Container => "container",
            EntityClass::PowerSupply => "power-supply",
            EntityClass::Fan => "fan",
            EntityClass::Sensor => "sensor",
            EntityClass::Module => "module",
            EntityClass::Port => "port",
            EntityClass::Stack => "stack",
            EntityClass::Cpu => "cpu",
            EntityClass::Transceiver => "transceiver",
        }
    }
}

const FEX_MARKERS: &[&str] = &["fabric extender", "nexus2", "nexus 2"];

/// One row of a device's entPhysicalTable after decoding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalComponent {
    pub index: u32,
    pub class: EntityClass,
    pub description: String,
    pub name: String,
    pub model: String,
    pub serial: String,
    pub manufacturer: String,
    pub hardware_rev: String,
    pub firmware_rev: String,
    pub software_rev: String,
    /// 0 means the component is a root
    pub contained_in: u32,
    pub parent_rel_pos: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_with: Vec<String>,
}

impl PhysicalComponent {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    pub fn is_root(&self) -> bool {
        self.contained_in == 0
    }

    /// Components with neither model nor serial carry no inventory value
    pub fn is_reportable(&self) -> bool {
        !self.model.trim().is_empty() || !self.serial.trim().is_empty()
    }

    pub fn is_transceiver(&self) -> bool {
        self.class == EntityClass::Transceiver
    }

    pub fn is_fabric_extender(&self) -> bool {
        if !matches!(self.class, EntityClass::Chassis | EntityClass::Module) {
            return false;
        }
        let descr = self.description.to_lowercase();
        let model = self.model.to_lowercase();
        FEX_MARKERS.iter().any(|m| descr.contains(m))
            || model.starts_with("n2k-")
            || model.contains("nexus2")
    }

    /// FEX number from names like "Fex-105" or "FEX 105 chassis"
    pub fn fex_number(&self) -> Option<u32> {
        [&self.name, &self.description]
            .iter()
            .find_map(|text| parse_fex_number(text))
    }

    pub fn add_shared_with(&mut self, hostname: &str) {
        if !self.shared_with.iter().any(|h| h == hostname) {
            self.shared_with.push(hostname.to_string());
        }
    }
}

fn parse_fex_number(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    let start = lower.find("fex")? + 3;
    let digits: String = lower[start..]
        .trim_start_matches(|c: char| c == '-' || c == ' ' || c == '_')
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
