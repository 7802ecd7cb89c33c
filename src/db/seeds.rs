use chrono::NaiveDate;

use crate::models::{EolDates, EolRecord};

pub(super) struct DefaultEolPattern {
    pattern: &'static str,
    announcement_date: Option<&'static str>,
    end_of_sale: Option<&'static str>,
    end_of_support: Option<&'static str>,
}

/// Family-level lifecycle dates shipped with the collector. Exact per-model
/// dates come from the catalog import file.
fn default_eol_patterns() -> Vec<DefaultEolPattern> {
    vec![DefaultEolPattern {
        pattern: "MS220",
        announcement_date: None,
        end_of_sale: Some("2017-07-29"),
        end_of_support: Some("2024-07-29"),
    }]
}

fn parse_date(s: Option<&str>) -> Option<NaiveDate> {
    s.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

pub(super) fn seed_eol_pattern_params() -> Vec<EolRecord> {
    default_eol_patterns()
        .into_iter()
        .map(|p| EolRecord {
            key: p.pattern.to_string(),
            dates: EolDates {
                announcement_date: parse_date(p.announcement_date),
                end_of_sale: parse_date(p.end_of_sale),
                end_of_support: parse_date(p.end_of_support),
            },
            source: "seed".to_string(),
        })
        .collect()
}
