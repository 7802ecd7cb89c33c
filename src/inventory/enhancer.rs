use regex_lite::Regex;
use std::collections::BTreeMap;

use crate::models::PhysicalComponent;

/// Speed/medium keyword pair that implies a transceiver part number
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub speed: String,
    pub medium: String,
    pub model: String,
}

impl KeywordRule {
    fn new(speed: &str, medium: &str, model: &str) -> Self {
        Self {
            speed: speed.to_string(),
            medium: medium.to_string(),
            model: model.to_string(),
        }
    }
}

/// Lookup tables driving model inference. Order matters in every list:
/// the first match wins.
#[derive(Debug, Clone)]
pub struct EnhancerRules {
    pub canonical_fex_models: Vec<String>,
    /// (regex over "description model", canonical model)
    pub fex_patterns: Vec<(String, String)>,
    /// (description substring, canonical model)
    pub transceiver_descriptions: Vec<(String, String)>,
    pub transceiver_keywords: Vec<KeywordRule>,
    /// Model strings that mean "the device did not say"
    pub generic_models: Vec<String>,
    /// (serial prefix, vendor)
    pub vendor_prefixes: Vec<(String, String)>,
    /// (system description substring, chassis model) for devices whose
    /// entity table carries no usable chassis model
    pub platform_hints: Vec<(String, String)>,
    pub known_vendors: Vec<String>,
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
}

impl Default for EnhancerRules {
    fn default() -> Self {
        Self {
            canonical_fex_models: [
                "N2K-C2248TP-E-1GE",
                "N2K-C2248TP-1GE",
                "N2K-C2232PP-10GE",
                "N2K-C2232TM-10GE",
                "N2K-C2224TP-1GE",
                "N2K-C2148T-1GE",
                "N2K-B22DELL-P",
                "N2K-B22HP-P",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            fex_patterns: pairs(&[
                (r"48x1GE.*4x10GE.*N2K-C2248TP", "N2K-C2248TP-1GE"),
                (r"32x10GE.*8x10GE.*N2K-C2232PP", "N2K-C2232PP-10GE"),
                (r"16x10GE.*8x10GE.*N2K-B22", "N2K-B22DELL-P"),
                (r"48x1GE.*4x10GE.*N2K-C2148T", "N2K-C2148T-1GE"),
                (r"Nexus\s?2232PP.*10GE", "N2K-C2232PP-10GE"),
                (r"Nexus\s?2248TP.*1GE", "N2K-C2248TP-1GE"),
                (r"Nexus\s?2232TM.*10GE", "N2K-C2232TM-10GE"),
                (r"B22.*DELL", "N2K-B22DELL-P"),
                (r"48x1GE.*4x10GE", "N2K-C2248TP-1GE"),
                (r"32x10GE.*8x10GE", "N2K-C2232PP-10GE"),
                (r"16x10GE.*8x10GE", "N2K-B22DELL-P"),
            ]),
            transceiver_descriptions: pairs(&[
                ("1000BaseSX SFP", "GLC-SX-MMD"),
                ("1000BaseLX SFP", "GLC-LX-SMD"),
                ("10/100/1000BaseTX SFP", "GLC-T"),
                ("1000BaseT SFP", "GLC-T"),
                ("SFP-10Gbase-SR", "SFP-10G-SR"),
                ("SFP-10Gbase-LR", "SFP-10G-LR"),
                ("SFP+ 10GBASE-SR", "SFP-10G-SR"),
                ("SFP+ 10GBASE-LR", "SFP-10G-LR"),
            ]),
            transceiver_keywords: vec![
                KeywordRule::new(r"10g|10000", r"\bsr\b|base-?sr|850", "SFP-10G-SR"),
                KeywordRule::new(r"10g|10000", r"\blr\b|base-?lr|1310", "SFP-10G-LR"),
                KeywordRule::new(r"\b1000(base|\b)|\b1g\b", r"\bsx\b|base-?sx|850", "GLC-SX-MMD"),
                KeywordRule::new(r"\b1000(base|\b)|\b1g\b", r"\blx\b|base-?lx|1310", "GLC-LX-SMD"),
                KeywordRule::new(r"\b1000(base|\b)|\b1g\b", r"base-?tx?\b|\btx\b", "GLC-T"),
            ],
            generic_models: ["", "UNSPECIFIED", "N/A", "NA", "UNKNOWN", "SFP", "\"\""]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            vendor_prefixes: pairs(&[
                ("AGM", "Avago"),
                ("AGS", "Avago"),
                ("AVD", "Avago"),
                ("AVP", "Avago"),
                ("AVM", "Avago"),
                ("FNS", "Finisar"),
                ("OPM", "OptoSpan"),
                ("ACP", "Accedian"),
                ("ECL", "Eoptolink"),
                ("SPC", "SourcePhotonics"),
                ("MTC", "MikroTik"),
                ("JFQ", "JDSU/Viavi"),
            ]),
            platform_hints: pairs(&[("n6000", "N5K-C56128P"), ("n5000", "N5K-C5548UP")]),
            known_vendors: [
                "Cisco",
                "Arista",
                "Juniper",
                "Dell",
                "Aruba",
                "Meraki",
                "Hewlett-Packard",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// What the enhancer changed for one device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnhanceStats {
    pub fex_models: usize,
    pub transceiver_models: usize,
    pub vendors: usize,
}

/// Facts parsed out of a device's sysDescr
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformInfo {
    pub vendor: String,
    pub software_version: String,
    pub model_hint: Option<String>,
}

struct CompiledKeyword {
    speed: Regex,
    medium: Regex,
    model: String,
}

/// Infers canonical part numbers for fabric extenders and transceivers
pub struct ModelEnhancer {
    rules: EnhancerRules,
    fex_patterns: Vec<(Regex, String)>,
    keywords: Vec<CompiledKeyword>,
    catalyst: Option<Regex>,
    version: Option<Regex>,
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(&format!("(?i){}", pattern)) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!("Ignoring invalid model pattern '{}': {}", pattern, e);
            None
        }
    }
}

impl ModelEnhancer {
    pub fn new(rules: EnhancerRules) -> Self {
        let fex_patterns = rules
            .fex_patterns
            .iter()
            .filter_map(|(p, model)| compile(p).map(|re| (re, model.clone())))
            .collect();
        let keywords = rules
            .transceiver_keywords
            .iter()
            .filter_map(|k| {
                Some(CompiledKeyword {
                    speed: compile(&k.speed)?,
                    medium: compile(&k.medium)?,
                    model: k.model.clone(),
                })
            })
            .collect();
        let mut rules = rules;
        rules.canonical_fex_models.sort_by_key(|m| std::cmp::Reverse(m.len()));

        Self {
            rules,
            fex_patterns,
            keywords,
            catalyst: compile(r"\bWS-C[A-Z0-9-]+"),
            version: compile(r"version\s+([^\s,]+)"),
        }
    }

    /// Canonical model for a component, or None to keep what it reported
    pub fn infer_model(&self, component: &PhysicalComponent) -> Option<String> {
        if component.is_fabric_extender() {
            return self.infer_fex(component);
        }
        if component.is_transceiver() && self.is_generic(&component.model) {
            return self.infer_transceiver(&component.description);
        }
        None
    }

    fn infer_fex(&self, component: &PhysicalComponent) -> Option<String> {
        let model_upper = component.model.to_uppercase();
        if let Some(canonical) = self
            .rules
            .canonical_fex_models
            .iter()
            .find(|m| model_upper.contains(m.as_str()))
        {
            return Some(canonical.clone());
        }

        let haystack = format!("{} {}", component.description, component.model);
        self.fex_patterns
            .iter()
            .find(|(re, _)| re.is_match(&haystack))
            .map(|(_, model)| model.clone())
    }

    fn infer_transceiver(&self, description: &str) -> Option<String> {
        let lower = description.to_lowercase();
        if let Some((_, model)) = self
            .rules
            .transceiver_descriptions
            .iter()
            .find(|(needle, _)| lower.contains(&needle.to_lowercase()))
        {
            return Some(model.clone());
        }
        self.keywords
            .iter()
            .find(|k| k.speed.is_match(description) && k.medium.is_match(description))
            .map(|k| k.model.clone())
    }

    pub fn is_generic(&self, model: &str) -> bool {
        let upper = model.trim().to_uppercase();
        self.rules.generic_models.iter().any(|g| *g == upper)
    }

    /// Optics vendor from the serial number prefix
    pub fn vendor_for_serial(&self, serial: &str) -> Option<String> {
        let upper = serial.trim().to_uppercase();
        self.rules
            .vendor_prefixes
            .iter()
            .find(|(prefix, _)| upper.starts_with(prefix.as_str()))
            .map(|(_, vendor)| vendor.clone())
    }

    /// Rewrite models and optics vendors in place
    pub fn enhance(&self, components: &mut BTreeMap<u32, PhysicalComponent>) -> EnhanceStats {
        let mut stats = EnhanceStats::default();
        for component in components.values_mut() {
            if let Some(model) = self.infer_model(component) {
                if model != component.model {
                    tracing::debug!(
                        "Entity {}: model '{}' -> '{}' ({})",
                        component.index,
                        component.model,
                        model,
                        component.description
                    );
                    if component.is_fabric_extender() {
                        stats.fex_models += 1;
                    } else {
                        stats.transceiver_models += 1;
                    }
                    component.model = model;
                }
            }
            if component.is_transceiver() && component.vendor.is_none() {
                if let Some(vendor) = self.vendor_for_serial(&component.serial) {
                    component.vendor = Some(vendor);
                    stats.vendors += 1;
                }
            }
        }
        stats
    }

    /// Vendor, software version and a chassis model hint from sysDescr
    pub fn platform(&self, system_description: &str) -> PlatformInfo {
        let lower = system_description.to_lowercase();
        let vendor = self
            .rules
            .known_vendors
            .iter()
            .find(|v| lower.contains(&v.to_lowercase()))
            .cloned()
            .unwrap_or_default();
        let software_version = self
            .version
            .as_ref()
            .and_then(|re| re.captures(system_description))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let model_hint = self
            .rules
            .platform_hints
            .iter()
            .find(|(needle, _)| lower.contains(&needle.to_lowercase()))
            .map(|(_, model)| model.clone())
            .or_else(|| {
                self.catalyst
                    .as_ref()
                    .and_then(|re| re.find(system_description))
                    .map(|m| m.as_str().to_uppercase())
            });

        PlatformInfo {
            vendor,
            software_version,
            model_hint,
        }
    }
}

impl Default for ModelEnhancer {
    fn default() -> Self {
        Self::new(EnhancerRules::default())
    }
}
