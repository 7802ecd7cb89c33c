//! CSV export of the published inventory table.

use anyhow::Context;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::models::WebRow;

const HEADERS: [&str; 16] = [
    "row_order",
    "site",
    "hostname",
    "ip_address",
    "position",
    "relationship",
    "parent_hostname",
    "model",
    "serial_number",
    "port_location",
    "vendor",
    "notes",
    "announcement_date",
    "end_of_sale",
    "end_of_support",
    "eol_confidence",
];

fn date_cell(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn record(row: &WebRow) -> Vec<String> {
    vec![
        row.row_order.to_string(),
        row.site.clone(),
        row.hostname().to_string(),
        row.ip_address().to_string(),
        row.position.to_string(),
        row.relationship(),
        row.parent_hostname.clone(),
        row.model.clone(),
        row.serial_number.clone(),
        row.port_location.clone(),
        row.vendor.clone(),
        row.notes.clone(),
        date_cell(row.announcement_date),
        date_cell(row.end_of_sale),
        date_cell(row.end_of_support),
        row.eol_confidence.clone(),
    ]
}

/// Render rows as CSV bytes, header first
pub fn to_csv(rows: &[WebRow]) -> anyhow::Result<Vec<u8>> {
    // The csv crate has no async API, so we buffer in memory first
    let mut buffer = Vec::new();
    {
        let mut w = csv::Writer::from_writer(&mut buffer);
        w.write_record(HEADERS).context("Failed to write CSV headers")?;
        for row in rows {
            w.write_record(record(row)).context("Failed to write CSV row")?;
        }
        w.flush().context("Failed to flush CSV writer")?;
    }
    Ok(buffer)
}

/// Write the published table to `path`, replacing any previous export
pub async fn export_rows(rows: &[WebRow], path: &Path) -> anyhow::Result<()> {
    let bytes = to_csv(rows)?;

    let mut file = File::create(path)
        .await
        .with_context(|| format!("Failed to create CSV export file: {}", path.display()))?;

    file.write_all(&bytes)
        .await
        .with_context(|| format!("Failed to write CSV export to: {}", path.display()))?;

    file.flush()
        .await
        .with_context(|| format!("Failed to flush CSV export to: {}", path.display()))?;

    tracing::info!("Exported {} inventory rows to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Position, RowKind};

    fn rows() -> Vec<WebRow> {
        let device = WebRow {
            kind: RowKind::Device {
                hostname: "BR-3850".to_string(),
                ip_address: "10.2.0.5".to_string(),
            },
            site: "Branch".to_string(),
            parent_hostname: "BR-3850".to_string(),
            position: Position::Standalone,
            model: "WS-C3850-48P".to_string(),
            serial_number: "FOC1".to_string(),
            port_location: String::new(),
            vendor: "Cisco".to_string(),
            notes: String::new(),
            row_order: 1,
            announcement_date: None,
            end_of_sale: chrono::NaiveDate::from_ymd_opt(2020, 10, 30),
            end_of_support: None,
            eol_confidence: "exact".to_string(),
        };
        let optic = WebRow {
            kind: RowKind::Component,
            position: Position::Sfp,
            model: "GLC-SX-MMD".to_string(),
            serial_number: "FNS2".to_string(),
            port_location: "Gi1/1/1".to_string(),
            notes: "1000BaseSX SFP, multimode".to_string(),
            row_order: 2,
            end_of_sale: None,
            eol_confidence: String::new(),
            ..device.clone()
        };
        vec![device, optic]
    }

    #[test]
    fn test_to_csv_layout() {
        let text = String::from_utf8(to_csv(&rows()).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("row_order,site,hostname,ip_address,position"));
        assert_eq!(
            lines[1],
            "1,Branch,BR-3850,10.2.0.5,Standalone,Standalone,BR-3850,WS-C3850-48P,FOC1,,Cisco,,,2020-10-30,,exact"
        );
        // component rows leave hostname and ip empty; commas in notes are quoted
        assert!(lines[2].starts_with("2,Branch,,,SFP,Component,BR-3850,GLC-SX-MMD"));
        assert!(lines[2].contains("\"1000BaseSX SFP, multimode\""));
    }

    #[tokio::test]
    async fn test_export_rows_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.csv");
        export_rows(&rows(), &path).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written.lines().count(), 3);
    }
}
