use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::models::CollectionMethod;

use super::client::{SnmpTarget, SnmpTransport, TableWalk, WalkMode};
use super::oids::{self, EntityColumn};
use super::SnmpError;

/// Timeouts and retry budget for one device collection
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub probe_timeout: Duration,
    pub table_timeout: Duration,
    pub chunk_timeout: Duration,
    pub chunk_retries: u32,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(15),
            table_timeout: Duration::from_secs(30),
            chunk_timeout: Duration::from_secs(60),
            chunk_retries: 2,
        }
    }
}

/// Everything one device returned: the probe answer and each walked column
#[derive(Debug, Clone)]
pub struct RawCollection {
    pub system_description: String,
    pub method: CollectionMethod,
    pub tables: BTreeMap<EntityColumn, TableWalk>,
}

impl RawCollection {
    pub fn failed_tables(&self) -> Vec<(EntityColumn, &SnmpError)> {
        self.tables
            .iter()
            .filter_map(|(col, walk)| walk.error.as_ref().map(|e| (*col, e)))
            .collect()
    }

    pub fn is_partial(&self) -> bool {
        self.tables.values().any(|walk| !walk.is_complete())
    }

    /// No table produced a single row
    pub fn is_empty(&self) -> bool {
        self.tables.values().all(|walk| walk.rows.is_empty())
    }
}

/// Walks the entity table of one device. Holds no per-device state.
#[derive(Clone)]
pub struct Collector {
    transport: Arc<dyn SnmpTransport>,
    settings: CollectorSettings,
}

impl Collector {
    pub fn new(transport: Arc<dyn SnmpTransport>, settings: CollectorSettings) -> Self {
        Self { transport, settings }
    }

    /// Probe the device, then walk its entity columns. Only an unanswered
    /// probe fails the whole collection; table failures are recorded per table.
    pub async fn collect(
        &self,
        target: &SnmpTarget,
        method: CollectionMethod,
    ) -> Result<RawCollection, SnmpError> {
        let system_description = self
            .transport
            .get(target, oids::SYS_DESCR, self.settings.probe_timeout)
            .await
            .map_err(|e| SnmpError::Unreachable {
                host: target.hostname.clone(),
                reason: e.to_string(),
            })?
            .as_text();

        let tables = match method {
            CollectionMethod::Full => self.walk_full(target).await,
            CollectionMethod::Chunked => self.walk_chunked(target).await,
        };

        let raw = RawCollection {
            system_description,
            method,
            tables,
        };
        for (col, err) in raw.failed_tables() {
            tracing::warn!("{}: {} walk incomplete: {}", target.hostname, col.table_name(), err);
        }
        Ok(raw)
    }

    async fn walk_full(&self, target: &SnmpTarget) -> BTreeMap<EntityColumn, TableWalk> {
        let mut tables = BTreeMap::new();
        for col in EntityColumn::FULL {
            let walk = self
                .transport
                .walk(target, &col.oid(), WalkMode::Bulk, self.settings.table_timeout)
                .await;
            tracing::debug!(
                "{}: {} returned {} rows",
                target.hostname,
                col.table_name(),
                walk.rows.len()
            );
            tables.insert(*col, walk);
        }
        tables
    }

    /// One GETNEXT walk per column, each retried on its own. The attempt with
    /// the most rows is kept if every attempt fails.
    async fn walk_chunked(&self, target: &SnmpTarget) -> BTreeMap<EntityColumn, TableWalk> {
        let mut tables = BTreeMap::new();
        for col in EntityColumn::CHUNKED {
            let mut best: Option<TableWalk> = None;
            for attempt in 0..=self.settings.chunk_retries {
                let walk = self
                    .transport
                    .walk(target, &col.oid(), WalkMode::GetNext, self.settings.chunk_timeout)
                    .await;
                let retry = walk.error.as_ref().is_some_and(|e| e.is_retryable());
                let better = best
                    .as_ref()
                    .map_or(true, |b| walk.is_complete() || walk.rows.len() > b.rows.len());
                if better {
                    best = Some(walk);
                }
                if !retry {
                    break;
                }
                if attempt < self.settings.chunk_retries {
                    tracing::info!(
                        "{}: retrying {} (attempt {}/{})",
                        target.hostname,
                        col.table_name(),
                        attempt + 2,
                        self.settings.chunk_retries + 1
                    );
                }
            }
            tables.insert(*col, best.unwrap_or_default());
        }
        tables
    }
}
