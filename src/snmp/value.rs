/// Decoded SNMP varbind value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnmpValue {
    Text(String),
    Integer(i64),
    Opaque(Vec<u8>),
}

impl SnmpValue {
    /// Text rendering used for descriptive columns. Opaque values that are
    /// printable ASCII (serials are sometimes sent as Hex-STRING) are
    /// rendered as text, anything else as hex.
    pub fn as_text(&self) -> String {
        match self {
            SnmpValue::Text(s) => s.clone(),
            SnmpValue::Integer(i) => i.to_string(),
            SnmpValue::Opaque(bytes) => {
                let trimmed: Vec<u8> = bytes.iter().copied().filter(|b| *b != 0).collect();
                let printable = trimmed.iter().all(|b| b.is_ascii_graphic() || *b == b' ');
                if !trimmed.is_empty() && printable {
                    String::from_utf8_lossy(&trimmed).trim().to_string()
                } else {
                    bytes.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" ")
                }
            }
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SnmpValue::Integer(i) => Some(*i),
            SnmpValue::Text(s) => s.trim().parse().ok(),
            SnmpValue::Opaque(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SnmpValue::Text(s) => s.is_empty(),
            SnmpValue::Integer(_) => false,
            SnmpValue::Opaque(b) => b.is_empty(),
        }
    }
}

/// Decode the right-hand side of a net-snmp varbind line, e.g.
/// `STRING: "Nexus 5548"`, `INTEGER: chassis(3)` or `Hex-STRING: 46 4F 58`.
pub fn decode(raw: &str) -> SnmpValue {
    let raw = raw.trim();
    let (kind, body) = match raw.split_once(':') {
        Some((kind, body)) if is_type_tag(kind) => (kind.trim(), body.trim()),
        _ => ("", raw),
    };

    match kind {
        "INTEGER" | "Gauge32" | "Counter32" | "Counter64" | "Unsigned32" | "UInteger32" => {
            match parse_integer(body) {
                Some(i) => SnmpValue::Integer(i),
                None => SnmpValue::Text(clean_text(body)),
            }
        }
        "Timeticks" => {
            let ticks = body
                .strip_prefix('(')
                .and_then(|rest| rest.split_once(')'))
                .and_then(|(n, _)| n.trim().parse().ok());
            match ticks {
                Some(t) => SnmpValue::Integer(t),
                None => SnmpValue::Text(clean_text(body)),
            }
        }
        "Hex-STRING" => SnmpValue::Opaque(parse_hex(body)),
        _ => SnmpValue::Text(clean_text(body)),
    }
}

fn is_type_tag(kind: &str) -> bool {
    !kind.is_empty() && kind.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Accepts `3`, `chassis(3)` and `-1`
fn parse_integer(body: &str) -> Option<i64> {
    if let Ok(i) = body.parse::<i64>() {
        return Some(i);
    }
    let open = body.rfind('(')?;
    let close = body.rfind(')')?;
    if close <= open {
        return None;
    }
    body[open + 1..close].trim().parse().ok()
}

fn parse_hex(body: &str) -> Vec<u8> {
    body.split_whitespace()
        .filter_map(|pair| u8::from_str_radix(pair, 16).ok())
        .collect()
}

/// Strip quoting artifacts: `"abc"`, `""` and `""""` all collapse
fn clean_text(body: &str) -> String {
    let mut s = body.trim();
    while let Some(inner) = s.strip_prefix('"') {
        s = inner.strip_suffix('"').unwrap_or(inner).trim();
    }
    s.trim_end_matches('"').trim().to_string()
}
