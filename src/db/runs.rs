use anyhow::Result;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::*;

use super::row_helpers::{map_device_collection_row, map_run_row};

const SELECT_RUN: &str = r#"
    SELECT id, started_at, finished_at, devices_total, devices_succeeded, devices_partial,
           devices_failed, rows_published, rows_pruned
    FROM collection_runs
"#;

/// Collection run bookkeeping
pub struct RunRepo;

impl RunRepo {
    pub async fn create(pool: &Pool<Sqlite>, id: &str) -> Result<CollectionRun> {
        let now = Utc::now();
        sqlx::query("INSERT INTO collection_runs (id, started_at) VALUES (?, ?)")
            .bind(id)
            .bind(now)
            .execute(pool)
            .await?;

        Ok(CollectionRun {
            id: id.to_string(),
            started_at: now,
            finished_at: None,
            summary: CycleSummary::default(),
        })
    }

    pub async fn finish(pool: &Pool<Sqlite>, id: &str, summary: &CycleSummary) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE collection_runs SET
                finished_at = ?, devices_total = ?, devices_succeeded = ?, devices_partial = ?,
                devices_failed = ?, rows_published = ?, rows_pruned = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(summary.devices_total as i64)
        .bind(summary.succeeded as i64)
        .bind(summary.partial as i64)
        .bind(summary.failed as i64)
        .bind(summary.rows_published as i64)
        .bind(summary.rows_pruned as i64)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: &str) -> Result<Option<CollectionRun>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_RUN))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_run_row))
    }

    #[cfg(test)]
    pub async fn list(pool: &Pool<Sqlite>, limit: i32) -> Result<Vec<CollectionRun>> {
        let rows = sqlx::query(&format!("{} ORDER BY started_at DESC LIMIT ?", SELECT_RUN))
            .bind(limit)
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_run_row).collect())
    }

    pub async fn record_device(pool: &Pool<Sqlite>, entry: &DeviceCollection) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO device_collections (run_id, hostname, ip_address, status, method, component_count, error)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.run_id)
        .bind(&entry.hostname)
        .bind(&entry.ip_address)
        .bind(&entry.status)
        .bind(&entry.method)
        .bind(entry.component_count)
        .bind(entry.error.as_deref().unwrap_or(""))
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn list_devices(pool: &Pool<Sqlite>, run_id: &str) -> Result<Vec<DeviceCollection>> {
        let rows = sqlx::query(
            r#"
            SELECT run_id, hostname, ip_address, status, method, component_count, error
            FROM device_collections WHERE run_id = ? ORDER BY hostname
            "#,
        )
        .bind(run_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.iter().map(map_device_collection_row).collect())
    }
}
