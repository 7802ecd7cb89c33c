use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical EOL match confidence values
pub mod eol_confidence {
    pub const EXACT: &str = "exact";
    pub const PATTERN: &str = "pattern";
}

/// Lifecycle dates for a model; any of them may be unknown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EolDates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announcement_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_of_sale: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_of_support: Option<NaiveDate>,
}

impl EolDates {
    pub fn is_empty(&self) -> bool {
        self.announcement_date.is_none()
            && self.end_of_sale.is_none()
            && self.end_of_support.is_none()
    }

    /// Fill only the fields still unknown here from `fallback`
    pub fn or(self, fallback: EolDates) -> EolDates {
        EolDates {
            announcement_date: self.announcement_date.or(fallback.announcement_date),
            end_of_sale: self.end_of_sale.or(fallback.end_of_sale),
            end_of_support: self.end_of_support.or(fallback.end_of_support),
        }
    }
}

/// EOLRecord keyed by an exact model or a family pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EolRecord {
    pub key: String,
    #[serde(flatten)]
    pub dates: EolDates,
    #[serde(default)]
    pub source: String,
}

/// EOL catalog import file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EolCatalogFile {
    #[serde(default)]
    pub models: Vec<EolRecord>,
    #[serde(default)]
    pub patterns: Vec<EolRecord>,
}
