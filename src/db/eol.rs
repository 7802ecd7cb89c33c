use anyhow::Result;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::*;

use super::row_helpers::map_eol_row;

/// End-of-life catalog operations. Exact model keys and family patterns
/// live in separate tables with the same shape.
pub struct EolRepo;

impl EolRepo {
    pub async fn list_models(pool: &Pool<Sqlite>) -> Result<Vec<EolRecord>> {
        let rows = sqlx::query(
            "SELECT model AS key, announcement_date, end_of_sale, end_of_support, source FROM eol_models ORDER BY model",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows.iter().map(map_eol_row).collect())
    }

    pub async fn list_patterns(pool: &Pool<Sqlite>) -> Result<Vec<EolRecord>> {
        let rows = sqlx::query(
            "SELECT pattern AS key, announcement_date, end_of_sale, end_of_support, source FROM eol_patterns ORDER BY pattern",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows.iter().map(map_eol_row).collect())
    }

    pub async fn upsert_model(pool: &Pool<Sqlite>, record: &EolRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO eol_models (model, announcement_date, end_of_sale, end_of_support, source, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(model) DO UPDATE SET
                announcement_date = COALESCE(excluded.announcement_date, eol_models.announcement_date),
                end_of_sale = COALESCE(excluded.end_of_sale, eol_models.end_of_sale),
                end_of_support = COALESCE(excluded.end_of_support, eol_models.end_of_support),
                source = CASE WHEN excluded.source != '' THEN excluded.source ELSE eol_models.source END,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.key.trim().to_uppercase())
        .bind(record.dates.announcement_date)
        .bind(record.dates.end_of_sale)
        .bind(record.dates.end_of_support)
        .bind(&record.source)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn upsert_pattern(pool: &Pool<Sqlite>, record: &EolRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO eol_patterns (pattern, announcement_date, end_of_sale, end_of_support, source, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(pattern) DO UPDATE SET
                announcement_date = COALESCE(excluded.announcement_date, eol_patterns.announcement_date),
                end_of_sale = COALESCE(excluded.end_of_sale, eol_patterns.end_of_sale),
                end_of_support = COALESCE(excluded.end_of_support, eol_patterns.end_of_support),
                source = CASE WHEN excluded.source != '' THEN excluded.source ELSE eol_patterns.source END,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.key.trim().to_uppercase())
        .bind(record.dates.announcement_date)
        .bind(record.dates.end_of_sale)
        .bind(record.dates.end_of_support)
        .bind(&record.source)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Insert a pattern only if it is not already present
    pub async fn insert_pattern_if_missing(pool: &Pool<Sqlite>, record: &EolRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO eol_patterns (pattern, announcement_date, end_of_sale, end_of_support, source, updated_at)
            VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(record.key.trim().to_uppercase())
        .bind(record.dates.announcement_date)
        .bind(record.dates.end_of_sale)
        .bind(record.dates.end_of_support)
        .bind(&record.source)
        .execute(pool)
        .await?;
        Ok(())
    }
}
