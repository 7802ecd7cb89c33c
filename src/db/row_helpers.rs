use chrono::NaiveDate;
use sqlx::{sqlite::SqliteRow, Row};

use crate::models::*;

/// Empty TEXT columns become None; the schema defaults to '' rather than NULL
pub fn none_if_empty(opt: Option<String>) -> Option<String> {
    opt.filter(|s| !s.is_empty())
}

/// Rebuild a display position from its stored label
pub fn parse_position(label: &str) -> Position {
    match label {
        "Master" => Position::Master,
        "Slave" => Position::Slave,
        "Parent Switch" => Position::ParentSwitch,
        "Module" => Position::Module,
        "SFP" => Position::Sfp,
        "FEX" => Position::Fex(None),
        other => match other.strip_prefix("FEX-") {
            Some(n) => Position::Fex(n.parse().ok()),
            None => Position::Standalone,
        },
    }
}

/// Map a SQLite row to a WebRow
pub fn map_inventory_row(row: &SqliteRow) -> WebRow {
    let hostname: String = row.get("hostname");
    let relationship: String = row.get("relationship");
    let kind = if relationship == COMPONENT_RELATIONSHIP {
        RowKind::Component
    } else {
        RowKind::Device {
            hostname,
            ip_address: row.get("ip_address"),
        }
    };
    let position: String = row.get("position");
    WebRow {
        kind,
        site: row.get("site"),
        parent_hostname: row.get("parent_hostname"),
        position: parse_position(&position),
        model: row.get("model"),
        serial_number: row.get::<Option<String>, _>("serial_number").unwrap_or_default(),
        port_location: row.get("port_location"),
        vendor: row.get("vendor"),
        notes: row.get("notes"),
        row_order: row.get("row_order"),
        announcement_date: row.get::<Option<NaiveDate>, _>("announcement_date"),
        end_of_sale: row.get::<Option<NaiveDate>, _>("end_of_sale"),
        end_of_support: row.get::<Option<NaiveDate>, _>("end_of_support"),
        eol_confidence: row.get("eol_confidence"),
    }
}

/// Map a SQLite row from eol_models or eol_patterns to an EolRecord
pub fn map_eol_row(row: &SqliteRow) -> EolRecord {
    EolRecord {
        key: row.get("key"),
        dates: EolDates {
            announcement_date: row.get::<Option<NaiveDate>, _>("announcement_date"),
            end_of_sale: row.get::<Option<NaiveDate>, _>("end_of_sale"),
            end_of_support: row.get::<Option<NaiveDate>, _>("end_of_support"),
        },
        source: row.get("source"),
    }
}

/// Map a SQLite row to a CollectionRun
pub fn map_run_row(row: &SqliteRow) -> CollectionRun {
    CollectionRun {
        id: row.get("id"),
        started_at: row.get("started_at"),
        finished_at: row.get("finished_at"),
        summary: CycleSummary {
            devices_total: row.get::<i64, _>("devices_total") as usize,
            succeeded: row.get::<i64, _>("devices_succeeded") as usize,
            partial: row.get::<i64, _>("devices_partial") as usize,
            failed: row.get::<i64, _>("devices_failed") as usize,
            rows_published: row.get::<i64, _>("rows_published") as usize,
            rows_pruned: row.get::<i64, _>("rows_pruned") as u64,
        },
    }
}

/// Map a SQLite row to a DeviceCollection
pub fn map_device_collection_row(row: &SqliteRow) -> DeviceCollection {
    DeviceCollection {
        run_id: row.get("run_id"),
        hostname: row.get("hostname"),
        ip_address: row.get("ip_address"),
        status: row.get("status"),
        method: row.get("method"),
        component_count: row.get("component_count"),
        error: none_if_empty(row.get("error")),
    }
}
