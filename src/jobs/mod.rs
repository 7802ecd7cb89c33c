use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::Instrument;

use crate::db::Store;
use crate::export;
use crate::inventory::{self, ModelEnhancer, Reconciler, SiteResolver};
use crate::models::*;
use crate::snmp::{Collector, CollectorSettings, SnmpError, SnmpTarget, SnmpTransport};

/// Result of collecting one roster entry
#[derive(Debug)]
pub struct DeviceOutcome {
    pub entry: RosterEntry,
    pub status: CollectionStatus,
    pub inventory: Option<DeviceInventory>,
    pub error: Option<String>,
}

impl DeviceOutcome {
    fn failed(entry: RosterEntry, error: SnmpError) -> Self {
        Self {
            entry,
            status: CollectionStatus::Failed,
            inventory: None,
            error: Some(error.to_string()),
        }
    }

    pub fn component_count(&self) -> usize {
        self.inventory.as_ref().map(|inv| inv.components.len()).unwrap_or(0)
    }
}

/// Per-cycle knobs that do not affect collection itself
#[derive(Debug, Clone, Default)]
pub struct CycleOptions {
    pub export_csv_path: Option<PathBuf>,
    pub retention_days: i64,
}

/// CollectionService fans roster entries out to a fixed pool of workers
pub struct CollectionService {
    collector: Collector,
    enhancer: ModelEnhancer,
    workers: usize,
}

impl CollectionService {
    pub fn new(
        transport: Arc<dyn SnmpTransport>,
        settings: CollectorSettings,
        workers: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            collector: Collector::new(transport, settings),
            enhancer: ModelEnhancer::default(),
            workers: workers.max(1),
        })
    }

    /// Collect every roster entry and return once all workers have finished
    pub async fn collect_all(self: &Arc<Self>, roster: &Roster) -> Vec<DeviceOutcome> {
        let total = roster.devices.len();
        if total == 0 {
            return Vec::new();
        }

        let (queue_tx, queue_rx) = mpsc::channel::<RosterEntry>(total);
        let (result_tx, mut result_rx) = mpsc::channel::<DeviceOutcome>(total);
        for entry in &roster.devices {
            if let Err(e) = queue_tx.send(entry.clone()).await {
                tracing::warn!("Failed to queue {}: {}", entry.hostname, e);
            }
        }
        drop(queue_tx);

        let queue_rx = Arc::new(Mutex::new(queue_rx));
        let credentials = Arc::new(roster.credentials.clone());
        let sites = Arc::new(SiteResolver::new(roster.sites.clone()));
        let worker_count = self.workers.min(total);
        tracing::info!("Collecting {} devices with {} workers", total, worker_count);

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let service = self.clone();
            let queue_rx = queue_rx.clone();
            let result_tx = result_tx.clone();
            let credentials = credentials.clone();
            let sites = sites.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let next = queue_rx.lock().await.recv().await;
                    let Some(entry) = next else { break };
                    let span = tracing::info_span!(
                        "device",
                        hostname = %entry.hostname,
                        worker = worker_id
                    );
                    let outcome = service
                        .collect_device(entry, &credentials, &sites)
                        .instrument(span)
                        .await;
                    if result_tx.send(outcome).await.is_err() {
                        break;
                    }
                }
            }));
        }
        drop(result_tx);

        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                tracing::error!("Collection worker panicked: {}", e);
            }
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = result_rx.recv().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn collect_device(
        &self,
        entry: RosterEntry,
        credentials: &HashMap<String, Credential>,
        sites: &SiteResolver,
    ) -> DeviceOutcome {
        let Some(credential) = credentials.get(&entry.credential) else {
            tracing::warn!(
                "Skipping {}: unknown credential {}",
                entry.hostname,
                entry.credential
            );
            let error = SnmpError::MissingCredential(entry.credential.clone());
            return DeviceOutcome::failed(entry, error);
        };

        let target = SnmpTarget {
            hostname: entry.hostname.clone(),
            address: entry.ip.clone(),
            credential: credential.clone(),
        };
        let method = entry.method();
        tracing::debug!("Collecting {} ({}, {})", entry.ip, method.as_str(), credential.label());

        let raw = match self.collector.collect(&target, method).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("{} skipped: {}", entry.hostname, e);
                return DeviceOutcome::failed(entry, e);
            }
        };

        if raw.is_empty() {
            tracing::warn!(
                "{} answered the probe but its {} walk returned no entity rows",
                entry.hostname,
                raw.method.as_str()
            );
        }

        let site = sites.resolve(&entry);
        let device = Device::from_roster(&entry, &site);
        let inventory = inventory::assemble(device, &raw, &self.enhancer);

        let failed_tables = raw.failed_tables();
        let error = if failed_tables.is_empty() {
            None
        } else {
            Some(
                failed_tables
                    .iter()
                    .map(|(col, e)| format!("{}: {}", col.table_name(), e))
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        };
        match inventory.status {
            CollectionStatus::Success => {
                tracing::info!("{}: {} components", entry.hostname, inventory.components.len())
            }
            CollectionStatus::Partial => tracing::warn!(
                "{}: partial collection, {} components ({})",
                entry.hostname,
                inventory.components.len(),
                error.as_deref().unwrap_or("")
            ),
            CollectionStatus::Failed => tracing::warn!("{}: every table failed", entry.hostname),
        }

        DeviceOutcome {
            entry,
            status: inventory.status,
            inventory: Some(inventory),
            error,
        }
    }
}

/// One full cycle: collect, reconcile, attach EOL dates, publish, record.
/// Device failures are counted, not returned; only storage errors abort.
pub async fn run_cycle(
    store: &Store,
    service: &Arc<CollectionService>,
    roster: &Roster,
    options: &CycleOptions,
) -> Result<CycleSummary> {
    let run_id = uuid::Uuid::new_v4().to_string();
    store.create_run(&run_id).await?;
    tracing::info!("Starting collection run {}", run_id);

    let outcomes = service.collect_all(roster).await;

    let mut summary = CycleSummary::default();
    let mut inventories = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        summary.record(outcome.status);
        let entry = DeviceCollection {
            run_id: run_id.clone(),
            hostname: outcome.entry.hostname.clone(),
            ip_address: outcome.entry.ip.clone(),
            status: outcome.status.as_str().to_string(),
            method: outcome.entry.method().as_str().to_string(),
            component_count: outcome.component_count() as i64,
            error: outcome.error.clone(),
        };
        if let Err(e) = store.record_device_collection(&entry).await {
            tracing::warn!("Failed to record collection for {}: {}", entry.hostname, e);
        }
        if outcome.status == CollectionStatus::Failed {
            continue;
        }
        if let Some(inventory) = outcome.inventory {
            inventories.push(inventory);
        }
    }

    let mut rows = Reconciler::default().publish(inventories);

    let catalog = store.load_eol_catalog().await?;
    if catalog.is_empty() {
        tracing::warn!("EOL catalog is empty; rows will carry no lifecycle dates");
    }
    let dated = catalog.apply(&mut rows);
    tracing::info!(
        "EOL catalog ({} entries) matched {} of {} rows",
        catalog.len(),
        dated,
        rows.len()
    );

    summary.rows_published = store.upsert_inventory_rows(&rows, &run_id).await?;

    let parents: Vec<String> = rows
        .iter()
        .filter(|r| r.is_device())
        .map(|r| r.parent_hostname.clone())
        .collect();
    summary.rows_pruned = store.remove_unseen_inventory_rows(&parents, &run_id).await?;
    summary.rows_pruned += store.prune_inventory_rows(options.retention_days).await?;

    if let Some(path) = &options.export_csv_path {
        let exported = match store.list_inventory_rows().await {
            Ok(table) => export::export_rows(&table, path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = exported {
            tracing::warn!("CSV export failed: {:#}", e);
        }
    }

    store.finish_run(&run_id, &summary).await?;
    report_run(store, &run_id).await?;
    Ok(summary)
}

/// Log the stored record of a finished run
async fn report_run(store: &Store, run_id: &str) -> Result<()> {
    let Some(run) = store.get_run(run_id).await? else {
        tracing::warn!("Run {} has no stored record", run_id);
        return Ok(());
    };
    let elapsed = run
        .finished_at
        .map(|end| (end - run.started_at).num_seconds())
        .unwrap_or_default();
    let s = &run.summary;
    tracing::info!(
        "Run {} finished in {}s: {} devices ({} ok, {} partial, {} failed), {} rows published, {} pruned",
        run.id,
        elapsed,
        s.devices_total,
        s.succeeded,
        s.partial,
        s.failed,
        s.rows_published,
        s.rows_pruned
    );

    for device in store.list_device_collections(run_id).await? {
        if device.status == collection_status::FAILED {
            tracing::warn!(
                "{} ({}) failed: {}",
                device.hostname,
                device.ip_address,
                device.error.as_deref().unwrap_or("no error recorded")
            );
        }
    }
    tracing::info!("Published table holds {} rows", store.count_inventory_rows().await?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snmp::collector::tests::FakeTransport;
    use crate::snmp::client::TableWalk;
    use crate::snmp::EntityColumn;
    use std::time::Duration;

    fn entry(hostname: &str, ip: &str, credential: &str) -> RosterEntry {
        RosterEntry {
            hostname: hostname.to_string(),
            ip: ip.to_string(),
            credential: credential.to_string(),
            device_type: None,
            chunked: false,
            site: None,
        }
    }

    fn roster(devices: Vec<RosterEntry>) -> Roster {
        let mut credentials = HashMap::new();
        credentials.insert(
            "default".to_string(),
            Credential::Community {
                community: "public".to_string(),
            },
        );
        Roster {
            devices,
            credentials,
            sites: vec![SiteRule {
                name: "Branch".to_string(),
                ip_prefixes: vec!["10.2.".to_string()],
                hostname_prefixes: vec![],
            }],
        }
    }

    fn catalyst_transport() -> FakeTransport {
        let transport =
            FakeTransport::reachable("Cisco IOS Software, Catalyst L3 Switch, Version 16.12.4");
        transport.script(
            EntityColumn::Descr,
            vec![TableWalk {
                rows: FakeTransport::text_rows(&[
                    (1, "Catalyst 3850 Chassis"),
                    (2, "1000BaseSX SFP"),
                ]),
                error: None,
            }],
        );
        transport.script(
            EntityColumn::Class,
            vec![TableWalk {
                rows: FakeTransport::int_rows(&[(1, 3), (2, 10)]),
                error: None,
            }],
        );
        transport.script(
            EntityColumn::Name,
            vec![TableWalk {
                rows: FakeTransport::text_rows(&[(2, "GigabitEthernet1/1/1")]),
                error: None,
            }],
        );
        transport.script(
            EntityColumn::SerialNum,
            vec![TableWalk {
                rows: FakeTransport::text_rows(&[(1, "FOC1"), (2, "FNS2")]),
                error: None,
            }],
        );
        transport.script(
            EntityColumn::ModelName,
            vec![TableWalk {
                rows: FakeTransport::text_rows(&[(1, "WS-C3850-48P"), (2, "GLC-SX-MMD")]),
                error: None,
            }],
        );
        transport
    }

    fn settings() -> CollectorSettings {
        CollectorSettings {
            probe_timeout: Duration::from_secs(1),
            table_timeout: Duration::from_secs(1),
            chunk_timeout: Duration::from_secs(1),
            chunk_retries: 1,
        }
    }

    #[tokio::test]
    async fn test_collect_all_waits_for_every_device() {
        let service = CollectionService::new(Arc::new(catalyst_transport()), settings(), 2);
        let devices = (1..=5)
            .map(|i| entry(&format!("BR-{}", i), &format!("10.2.0.{}", i), "default"))
            .collect();

        let outcomes = service.collect_all(&roster(devices)).await;
        assert_eq!(outcomes.len(), 5);
        assert!(outcomes.iter().all(|o| o.status == CollectionStatus::Success));
        assert!(outcomes.iter().all(|o| o.component_count() == 2));
    }

    #[tokio::test]
    async fn test_unreachable_device_fails() {
        let service = CollectionService::new(Arc::new(FakeTransport::default()), settings(), 4);
        let outcomes = service
            .collect_all(&roster(vec![entry("dead", "10.9.9.9", "default")]))
            .await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, CollectionStatus::Failed);
        assert!(outcomes[0].inventory.is_none());
    }

    #[tokio::test]
    async fn test_run_cycle_publishes_and_records() {
        let store = Store::in_memory().await.unwrap();
        let service = CollectionService::new(Arc::new(catalyst_transport()), settings(), 4);
        let roster = roster(vec![
            entry("BR-3850", "10.2.0.5", "default"),
            entry("BR-OTHER", "10.2.0.6", "missing"),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let options = CycleOptions {
            export_csv_path: Some(dir.path().join("inventory.csv")),
            retention_days: 30,
        };

        let summary = run_cycle(&store, &service, &roster, &options).await.unwrap();
        assert_eq!(summary.devices_total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.rows_published, 2);
        assert_eq!(summary.rows_pruned, 0);

        let rows = store.list_inventory_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].hostname(), "BR-3850");
        assert_eq!(rows[0].site, "Branch");
        assert_eq!(rows[1].position, Position::Sfp);
        assert_eq!(rows[1].model, "GLC-SX-MMD");

        let exported = tokio::fs::read_to_string(dir.path().join("inventory.csv"))
            .await
            .unwrap();
        assert_eq!(exported.lines().count(), 3);

        let runs = store.list_runs(5).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].summary, summary);
        let devices = store.list_device_collections(&runs[0].id).await.unwrap();
        assert_eq!(devices.len(), 2);
        let failed = devices.iter().find(|d| d.hostname == "BR-OTHER").unwrap();
        assert_eq!(failed.status, "failed");
        assert!(failed.error.as_deref().unwrap_or("").contains("missing"));
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let store = Store::in_memory().await.unwrap();
        let service = CollectionService::new(Arc::new(catalyst_transport()), settings(), 4);
        let roster = roster(vec![entry("BR-3850", "10.2.0.5", "default")]);

        run_cycle(&store, &service, &roster, &CycleOptions::default())
            .await
            .unwrap();
        let first = store.list_inventory_rows().await.unwrap();
        run_cycle(&store, &service, &roster, &CycleOptions::default())
            .await
            .unwrap();
        let second = store.list_inventory_rows().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_swapped_optic_replaces_old_row() {
        let store = Store::in_memory().await.unwrap();
        let transport = catalyst_transport();
        transport.script(
            EntityColumn::SerialNum,
            vec![
                TableWalk {
                    rows: FakeTransport::text_rows(&[(1, "FOC1"), (2, "FNS2")]),
                    error: None,
                },
                TableWalk {
                    rows: FakeTransport::text_rows(&[(1, "FOC1"), (2, "FNS3")]),
                    error: None,
                },
            ],
        );
        let service = CollectionService::new(Arc::new(transport), settings(), 1);
        let roster = roster(vec![
            entry("BR-3850", "10.2.0.5", "default"),
            entry("BR-OTHER", "10.2.0.6", "missing"),
        ]);

        run_cycle(&store, &service, &roster, &CycleOptions::default())
            .await
            .unwrap();
        let summary = run_cycle(&store, &service, &roster, &CycleOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.rows_pruned, 1);

        let serials: Vec<String> = store
            .list_inventory_rows()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.serial_number)
            .collect();
        assert_eq!(serials, vec!["FOC1".to_string(), "FNS3".to_string()]);
    }
}
