use super::value::{decode, SnmpValue};

/// One decoded row of a table walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkRow {
    pub index: u32,
    pub value: SnmpValue,
}

/// Incremental parser for `snmpwalk -On` output.
///
/// Lines look like `.1.3.6.1.2.1.47.1.1.1.1.2.22 = STRING: "Nexus Chassis"`.
/// Quoted strings with embedded newlines arrive over several lines and are
/// joined; any other line that is not a varbind is counted and skipped.
pub struct WalkParser {
    base: String,
    pending: Option<(u32, String)>,
    skipped: usize,
    unsupported: bool,
}

impl WalkParser {
    pub fn new(base_oid: &str) -> Self {
        Self {
            base: base_oid.trim_start_matches('.').to_string(),
            pending: None,
            skipped: 0,
            unsupported: false,
        }
    }

    /// Feed one output line; returns the previous row once it is complete
    pub fn feed(&mut self, line: &str) -> Option<WalkRow> {
        if let Some((oid, raw)) = split_varbind(line) {
            let done = self.flush();
            if is_no_such(raw) {
                self.unsupported = true;
            } else if let Some(index) = self.index_of(oid) {
                self.pending = Some((index, raw.to_string()));
            } else {
                self.skip(line);
            }
            return done;
        }

        match &mut self.pending {
            Some((_, raw)) if is_open_quote(raw) => {
                raw.push('\n');
                raw.push_str(line);
            }
            _ => {
                if is_no_such(line) {
                    self.unsupported = true;
                } else if !line.trim().is_empty() {
                    self.skip(line);
                }
            }
        }
        None
    }

    /// Flush the last pending row at end of output
    pub fn finish(&mut self) -> Option<WalkRow> {
        self.flush()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Agent answered "No Such Object/Instance" for the base OID
    pub fn unsupported(&self) -> bool {
        self.unsupported
    }

    fn flush(&mut self) -> Option<WalkRow> {
        self.pending.take().map(|(index, raw)| WalkRow {
            index,
            value: decode(&raw),
        })
    }

    fn skip(&mut self, line: &str) {
        self.skipped += 1;
        tracing::debug!("Skipping malformed walk line: {}", line);
    }

    /// Row index relative to the walked base OID. A GET on the exact OID
    /// yields index 0; symbolic output (`ENTITY-MIB::entPhysicalDescr.22`)
    /// falls back to the last sub-identifier.
    fn index_of(&self, oid: &str) -> Option<u32> {
        let oid = oid.trim_start_matches('.');
        if oid == self.base {
            return Some(0);
        }
        if let Some(rest) = oid.strip_prefix(&self.base).and_then(|r| r.strip_prefix('.')) {
            return rest.parse().ok();
        }
        if oid.contains("::") {
            return oid.rsplit('.').next().and_then(|s| s.parse().ok());
        }
        None
    }
}

fn split_varbind(line: &str) -> Option<(&str, &str)> {
    let (oid, raw) = line.split_once(" = ")?;
    let oid = oid.trim();
    let looks_like_oid = oid.starts_with('.')
        || oid.starts_with("iso")
        || oid.contains("::")
        || oid.chars().next().is_some_and(|c| c.is_ascii_digit());
    if looks_like_oid && !oid.contains(' ') {
        Some((oid, raw))
    } else {
        None
    }
}

fn is_no_such(raw: &str) -> bool {
    raw.contains("No Such Object")
        || raw.contains("No Such Instance")
        || raw.contains("No more variables")
}

fn is_open_quote(raw: &str) -> bool {
    let value = raw.split_once(": ").map(|(_, v)| v).unwrap_or(raw).trim_start();
    value.starts_with('"') && (value.len() == 1 || !value.ends_with('"'))
}
