use regex_lite::Regex;
use std::collections::HashMap;

use crate::models::{eol_confidence, EolDates, EolRecord, WebRow};

/// In-memory EOL catalog: exact model keys plus family patterns
#[derive(Debug, Clone, Default)]
pub struct EolCatalog {
    exact: HashMap<String, EolDates>,
    patterns: Vec<(Regex, EolDates)>,
}

impl EolCatalog {
    pub fn new(models: Vec<EolRecord>, patterns: Vec<EolRecord>) -> Self {
        let exact = models
            .into_iter()
            .map(|r| (r.key.trim().to_uppercase(), r.dates))
            .collect();
        let mut keys: Vec<(String, EolDates)> = patterns
            .into_iter()
            .map(|r| (r.key.trim().to_uppercase(), r.dates))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        // most specific family first
        keys.sort_by(|a, b| {
            literal_len(&b.0)
                .cmp(&literal_len(&a.0))
                .then_with(|| a.0.cmp(&b.0))
        });
        let patterns = keys
            .into_iter()
            .filter_map(|(key, dates)| match compile_pattern(&key) {
                Ok(re) => Some((re, dates)),
                Err(e) => {
                    tracing::warn!("Ignoring EOL pattern {}: {}", key, e);
                    None
                }
            })
            .collect();
        Self { exact, patterns }
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dates for a model and the confidence label. Exact dates win field by
    /// field; the pattern only fills fields the exact record leaves empty.
    pub fn lookup(&self, model: &str) -> (EolDates, &'static str) {
        let key = model.trim().to_uppercase();
        if key.is_empty() {
            return (EolDates::default(), "");
        }
        let exact = self.exact.get(&key).copied();
        let pattern = self
            .patterns
            .iter()
            .find(|(re, _)| re.is_match(&key))
            .map(|(_, d)| *d);

        match (exact, pattern) {
            (Some(e), Some(p)) => (e.or(p), eol_confidence::EXACT),
            (Some(e), None) => (e, eol_confidence::EXACT),
            (None, Some(p)) => (p, eol_confidence::PATTERN),
            (None, None) => (EolDates::default(), ""),
        }
    }

    /// Fill EOL columns on every row. Returns how many rows got dates.
    pub fn apply(&self, rows: &mut [WebRow]) -> usize {
        let mut matched = 0;
        for row in rows.iter_mut() {
            let (dates, confidence) = self.lookup(&row.model);
            if dates.is_empty() {
                continue;
            }
            row.announcement_date = dates.announcement_date;
            row.end_of_sale = dates.end_of_sale;
            row.end_of_support = dates.end_of_support;
            row.eol_confidence = confidence.to_string();
            matched += 1;
        }
        matched
    }
}

fn literal_len(pattern: &str) -> usize {
    pattern.chars().filter(|c| *c != '*').count()
}

/// Family keys are prefixes (`MS220`) or whole-model `*` globs (`N2K-C22*-1GE`)
fn compile_pattern(key: &str) -> Result<Regex, regex_lite::Error> {
    if !key.contains('*') {
        return Regex::new(&format!("^{}", regex_lite::escape(key)));
    }
    let body: Vec<String> = key.split('*').map(regex_lite::escape).collect();
    Regex::new(&format!("^{}$", body.join(".*")))
}
