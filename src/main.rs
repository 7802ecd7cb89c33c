mod config;
mod db;
mod export;
mod inventory;
mod jobs;
mod models;
mod snmp;
mod utils;

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use db::Store;
use jobs::{CollectionService, CycleOptions};
use models::EolCatalogFile;

async fn read_eol_catalog(path: &str) -> anyhow::Result<EolCatalogFile> {
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read EOL catalog {}", path))?;
    serde_json::from_str(&data).with_context(|| format!("Invalid EOL catalog {}", path))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forge_inventory=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let cfg = Config::load();
    tracing::info!("Starting ForgeInventory collection");
    tracing::info!("Database: {}", cfg.db_path);
    tracing::info!("Roster: {}", cfg.roster_path);

    // Initialize database
    let store = Store::with_pool_size(&cfg.db_path, cfg.db_max_connections).await?;
    tracing::info!("Database initialized (pool_size={})", cfg.db_max_connections);

    if let Some(path) = &cfg.eol_catalog_path {
        match read_eol_catalog(path).await {
            Ok(file) => {
                let imported = store.import_eol_catalog(&file).await?;
                tracing::info!("Imported {} EOL catalog records from {}", imported, path);
            }
            Err(e) => tracing::warn!("Skipping EOL catalog import: {:#}", e),
        }
    }

    let roster = config::load_roster(&cfg.roster_path)
        .await
        .context("Roster unavailable")?;

    let service = CollectionService::new(
        Arc::new(cfg.transport()),
        cfg.collector_settings(),
        cfg.collect_workers,
    );
    let options = CycleOptions {
        export_csv_path: cfg.export_csv_path.as_ref().map(PathBuf::from),
        retention_days: cfg.retention_days,
    };

    let summary = jobs::run_cycle(&store, &service, &roster, &options).await?;
    if summary.failed > 0 {
        tracing::warn!("{} of {} devices failed", summary.failed, summary.devices_total);
    }

    Ok(())
}
