mod eol;
mod inventory;
pub(crate) mod row_helpers;
mod runs;
pub mod seeds;

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

use crate::inventory::EolCatalog;
use crate::models::*;

/// Store handles all database operations, delegating to per-entity repo modules.
#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    /// Create a new database store with a specific pool size
    pub async fn with_pool_size(db_path: &str, max_connections: u32) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Private in-memory database for tests. A single connection keeps every
    /// query on the same memory database.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;

        self.seed_default_eol_patterns().await?;
        Ok(())
    }

    async fn seed_default_eol_patterns(&self) -> Result<()> {
        for record in seeds::seed_eol_pattern_params() {
            eol::EolRepo::insert_pattern_if_missing(&self.pool, &record).await?;
        }
        Ok(())
    }

    // ========== Inventory Operations ==========

    pub async fn list_inventory_rows(&self) -> Result<Vec<WebRow>> {
        inventory::InventoryRepo::list(&self.pool).await
    }

    #[cfg(test)]
    pub async fn get_inventory_row_by_serial(&self, serial: &str) -> Result<Option<WebRow>> {
        inventory::InventoryRepo::get_by_serial(&self.pool, serial).await
    }

    /// Upsert a published table; returns rows written. A failing row is logged and skipped.
    pub async fn upsert_inventory_rows(&self, rows: &[WebRow], run_id: &str) -> Result<usize> {
        let mut written = 0;
        for row in rows {
            if let Err(e) = inventory::InventoryRepo::upsert(&self.pool, row, run_id).await {
                tracing::warn!(
                    "Failed to upsert inventory row {} / {}: {}",
                    row.parent_hostname,
                    row.serial_number,
                    e
                );
                continue;
            }
            written += 1;
        }
        Ok(written)
    }

    /// Drop rows of re-collected devices that this run no longer reported.
    /// Devices absent from `parents` keep their rows until retention expires.
    pub async fn remove_unseen_inventory_rows(
        &self,
        parents: &[String],
        run_id: &str,
    ) -> Result<u64> {
        let mut removed = 0;
        for parent in parents {
            let n = inventory::InventoryRepo::delete_unseen(&self.pool, parent, run_id).await?;
            if n > 0 {
                tracing::info!("Removed {} rows {} no longer reports", n, parent);
            }
            removed += n;
        }
        Ok(removed)
    }

    /// Delete rows older than `retention_days`; zero disables pruning
    pub async fn prune_inventory_rows(&self, retention_days: i64) -> Result<u64> {
        if retention_days <= 0 {
            return Ok(0);
        }
        inventory::InventoryRepo::prune_stale(&self.pool, retention_days).await
    }

    pub async fn count_inventory_rows(&self) -> Result<i64> {
        inventory::InventoryRepo::count(&self.pool).await
    }

    // ========== EOL Catalog Operations ==========

    pub async fn load_eol_catalog(&self) -> Result<EolCatalog> {
        let models = eol::EolRepo::list_models(&self.pool).await?;
        let patterns = eol::EolRepo::list_patterns(&self.pool).await?;
        Ok(EolCatalog::new(models, patterns))
    }

    pub async fn upsert_eol_model(&self, record: &EolRecord) -> Result<()> {
        eol::EolRepo::upsert_model(&self.pool, record).await
    }

    pub async fn upsert_eol_pattern(&self, record: &EolRecord) -> Result<()> {
        eol::EolRepo::upsert_pattern(&self.pool, record).await
    }

    /// Import a catalog file; returns the number of records written
    pub async fn import_eol_catalog(&self, file: &EolCatalogFile) -> Result<usize> {
        for record in &file.models {
            self.upsert_eol_model(record).await?;
        }
        for record in &file.patterns {
            self.upsert_eol_pattern(record).await?;
        }
        Ok(file.models.len() + file.patterns.len())
    }

    // ========== Collection Run Operations ==========

    pub async fn create_run(&self, id: &str) -> Result<CollectionRun> {
        runs::RunRepo::create(&self.pool, id).await
    }

    pub async fn finish_run(&self, id: &str, summary: &CycleSummary) -> Result<()> {
        runs::RunRepo::finish(&self.pool, id, summary).await
    }

    pub async fn get_run(&self, id: &str) -> Result<Option<CollectionRun>> {
        runs::RunRepo::get(&self.pool, id).await
    }

    #[cfg(test)]
    pub async fn list_runs(&self, limit: i32) -> Result<Vec<CollectionRun>> {
        runs::RunRepo::list(&self.pool, limit).await
    }

    pub async fn record_device_collection(&self, entry: &DeviceCollection) -> Result<()> {
        runs::RunRepo::record_device(&self.pool, entry).await
    }

    pub async fn list_device_collections(&self, run_id: &str) -> Result<Vec<DeviceCollection>> {
        runs::RunRepo::list_devices(&self.pool, run_id).await
    }
}
