use anyhow::Result;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::*;

use super::row_helpers::map_inventory_row;

const SELECT_INVENTORY_ROW: &str = r#"
    SELECT hostname, ip_address, position, model, serial_number, port_location, vendor,
           notes, parent_hostname, relationship, site, row_order, announcement_date,
           end_of_sale, end_of_support, eol_confidence
    FROM inventory_rows
"#;

/// Published inventory table operations
pub struct InventoryRepo;

impl InventoryRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<WebRow>> {
        let rows = sqlx::query(&format!("{} ORDER BY row_order, id", SELECT_INVENTORY_ROW))
            .fetch_all(pool)
            .await?;

        Ok(rows.iter().map(map_inventory_row).collect())
    }

    #[cfg(test)]
    pub async fn get_by_serial(pool: &Pool<Sqlite>, serial: &str) -> Result<Option<WebRow>> {
        let row = sqlx::query(&format!("{} WHERE serial_number = ?", SELECT_INVENTORY_ROW))
            .bind(serial)
            .fetch_optional(pool)
            .await?;

        Ok(row.as_ref().map(map_inventory_row))
    }

    /// Insert or update one row keyed by serial. Rows without a serial are
    /// keyed by parent, hostname, port and model. An empty incoming value
    /// never overwrites a stored one.
    pub async fn upsert(pool: &Pool<Sqlite>, row: &WebRow, run_id: &str) -> Result<()> {
        let now = Utc::now();
        let conflict_target = if row.serial_number.is_empty() {
            "ON CONFLICT(parent_hostname, hostname, port_location, model) WHERE serial_number IS NULL"
        } else {
            "ON CONFLICT(serial_number) WHERE serial_number IS NOT NULL"
        };
        let serial: Option<&str> = if row.serial_number.is_empty() {
            None
        } else {
            Some(&row.serial_number)
        };

        sqlx::query(&format!(
            r#"
            INSERT INTO inventory_rows (hostname, ip_address, position, model, serial_number,
                port_location, vendor, notes, parent_hostname, relationship, site, row_order,
                announcement_date, end_of_sale, end_of_support, eol_confidence, last_seen_run,
                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            {} DO UPDATE SET
                hostname = CASE WHEN excluded.hostname != '' THEN excluded.hostname ELSE inventory_rows.hostname END,
                ip_address = CASE WHEN excluded.ip_address != '' THEN excluded.ip_address ELSE inventory_rows.ip_address END,
                position = CASE WHEN excluded.position != '' THEN excluded.position ELSE inventory_rows.position END,
                model = CASE WHEN excluded.model != '' THEN excluded.model ELSE inventory_rows.model END,
                port_location = CASE WHEN excluded.port_location != '' THEN excluded.port_location ELSE inventory_rows.port_location END,
                vendor = CASE WHEN excluded.vendor != '' THEN excluded.vendor ELSE inventory_rows.vendor END,
                notes = CASE WHEN excluded.notes != '' THEN excluded.notes ELSE inventory_rows.notes END,
                parent_hostname = CASE WHEN excluded.parent_hostname != '' THEN excluded.parent_hostname ELSE inventory_rows.parent_hostname END,
                relationship = CASE WHEN excluded.relationship != '' THEN excluded.relationship ELSE inventory_rows.relationship END,
                site = CASE WHEN excluded.site != '' THEN excluded.site ELSE inventory_rows.site END,
                row_order = excluded.row_order,
                announcement_date = COALESCE(excluded.announcement_date, inventory_rows.announcement_date),
                end_of_sale = COALESCE(excluded.end_of_sale, inventory_rows.end_of_sale),
                end_of_support = COALESCE(excluded.end_of_support, inventory_rows.end_of_support),
                eol_confidence = CASE WHEN excluded.eol_confidence != '' THEN excluded.eol_confidence ELSE inventory_rows.eol_confidence END,
                last_seen_run = excluded.last_seen_run,
                updated_at = excluded.updated_at
            "#,
            conflict_target
        ))
        .bind(row.hostname())
        .bind(row.ip_address())
        .bind(row.position.to_string())
        .bind(&row.model)
        .bind(serial)
        .bind(&row.port_location)
        .bind(&row.vendor)
        .bind(&row.notes)
        .bind(&row.parent_hostname)
        .bind(row.relationship())
        .bind(&row.site)
        .bind(row.row_order)
        .bind(row.announcement_date)
        .bind(row.end_of_sale)
        .bind(row.end_of_support)
        .bind(&row.eol_confidence)
        .bind(run_id)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Delete rows under `parent_hostname` that `run_id` did not write
    pub async fn delete_unseen(
        pool: &Pool<Sqlite>,
        parent_hostname: &str,
        run_id: &str,
    ) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM inventory_rows WHERE parent_hostname = ? AND last_seen_run != ?",
        )
        .bind(parent_hostname)
        .bind(run_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete rows not refreshed within `retention_days`
    pub async fn prune_stale(pool: &Pool<Sqlite>, retention_days: i64) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(retention_days);
        let result = sqlx::query("DELETE FROM inventory_rows WHERE updated_at < ?")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(pool: &Pool<Sqlite>) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM inventory_rows")
            .fetch_one(pool)
            .await?;
        Ok(count.0)
    }
}
