//! Reconciliation between the remote sharded store and the local cache
//!
//! Two strategies, both externally triggered:
//! - full resync: remote clear + fresh upstream ingest, local cache untouched
//! - windowed sync: pull one date from the remote store into the local cache
//!
//! Outcomes always cross the boundary as [`SyncOutcome`], never as a raw
//! error.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::cache::CacheDb;
use crate::ingest::{ClientId, ClientStatus, UpstreamSource};
use crate::model::date_key;
use crate::remote::{DocumentBackend, ShardFilter, ShardedStore};
use crate::DemandError;

/// Caller-facing result of a sync or clear operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub success: bool,
    pub message: String,
    /// For partial failures: how many records/operations were committed
    /// before the failure
    pub partial_count: Option<u32>,
}

impl SyncOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            partial_count: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            partial_count: None,
        }
    }

    fn from_error(error: DemandError) -> Self {
        let partial_count = match &error {
            DemandError::PartialWrite { committed, .. } => Some(*committed),
            _ => None,
        };
        Self {
            success: false,
            message: error.to_string(),
            partial_count,
        }
    }
}

/// Full-resync report: the outcome plus per-client source diagnostics,
/// surfaced unchanged from the ingestion adapter
#[derive(Debug)]
pub struct FullResyncReport {
    pub outcome: SyncOutcome,
    pub per_client_status: Vec<ClientStatus>,
}

/// Reconciler options
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Extra attempts for the remote write during a full resync.
    /// Retrying is safe: writes upsert per (shard, date) cell.
    pub retries: u32,
}

/// Orchestrates reconciliation between remote store and local cache
pub struct Reconciler<B: DocumentBackend> {
    store: ShardedStore<B>,
    cache: Mutex<CacheDb>,
    date_locks: Mutex<HashMap<NaiveDate, Arc<tokio::sync::Mutex<()>>>>,
    options: SyncOptions,
}

impl<B: DocumentBackend> Reconciler<B> {
    pub fn new(store: ShardedStore<B>, cache: CacheDb) -> Self {
        Self::with_options(store, cache, SyncOptions::default())
    }

    pub fn with_options(store: ShardedStore<B>, cache: CacheDb, options: SyncOptions) -> Self {
        Self {
            store,
            cache: Mutex::new(cache),
            date_locks: Mutex::new(HashMap::new()),
            options,
        }
    }

    pub fn store(&self) -> &ShardedStore<B> {
        &self.store
    }

    /// Direct access to the local cache (reports, status output)
    pub fn cache(&self) -> MutexGuard<'_, CacheDb> {
        self.cache.lock().unwrap()
    }

    /// Replace the remote store's contents with fresh upstream data.
    ///
    /// Clears the remote store, ingests upstream records, writes them back.
    /// The local cache is not touched. If the write fails partway the
    /// remote store is left partially populated; this is reported, not
    /// retried automatically (beyond the configured `retries`).
    pub async fn full_resync(
        &self,
        source: &impl UpstreamSource,
        clients: &[ClientId],
    ) -> FullResyncReport {
        if let Err(e) = self.store.clear_all().await {
            return FullResyncReport {
                outcome: SyncOutcome::from_error(e),
                per_client_status: Vec::new(),
            };
        }

        let fetch = match source.fetch(clients).await {
            Ok(fetch) => fetch,
            Err(e) => {
                return FullResyncReport {
                    outcome: SyncOutcome::failed(format!("upstream fetch failed: {}", e)),
                    per_client_status: Vec::new(),
                }
            }
        };

        if fetch.records.is_empty() {
            // Legitimate empty sources are informational, not a failure
            return FullResyncReport {
                outcome: SyncOutcome::ok("upstream returned no records; remote store is empty"),
                per_client_status: fetch.per_client_status,
            };
        }

        let mut attempts = 0;
        let outcome = loop {
            match self.store.write(&fetch.records).await {
                Ok(written) => {
                    break SyncOutcome::ok(format!(
                        "wrote {} records to the remote store",
                        written.records_written
                    ))
                }
                Err(e) if attempts < self.options.retries => {
                    attempts += 1;
                    warn!(attempt = attempts, error = %e, "remote write failed, retrying");
                }
                Err(e) => break SyncOutcome::from_error(e),
            }
        };

        FullResyncReport {
            outcome,
            per_client_status: fetch.per_client_status,
        }
    }

    /// Reconcile the local cache for a single date.
    ///
    /// Fetches the date from the remote store with bypass limits, then
    /// delete-by-date, then upsert, then records the sync time. The
    /// delete-before-insert ordering is mandatory: readers polling the
    /// cache must never see stale and fresh rows together; a brief empty
    /// window is the accepted cost if the process dies mid-sequence.
    /// Same-date calls serialize behind a per-date guard.
    pub async fn sync_date(&self, date: NaiveDate) -> SyncOutcome {
        let guard = self.date_guard(date);
        let _held = guard.lock().await;

        let records = match self
            .store
            .read_point(&ShardFilter::default(), date, true)
            .await
        {
            Ok(records) => records,
            Err(e) => return SyncOutcome::from_error(e),
        };

        let result = {
            let mut cache = self.cache.lock().unwrap();
            cache
                .delete_by_date(date)
                .and_then(|_| cache.upsert(&records))
                .and_then(|_| cache.set_sync_meta(Utc::now()))
        };

        match result {
            Ok(()) => {
                info!(date = %date_key(date), count = records.len(), "local cache reconciled");
                SyncOutcome::ok(format!(
                    "synced {} records for {}",
                    records.len(),
                    date_key(date)
                ))
            }
            Err(e) => SyncOutcome::from_error(e),
        }
    }

    /// Per-date mutual-exclusion guard: two syncs for the same date
    /// serialize instead of interleaving their delete+insert sequences
    fn date_guard(&self, date: NaiveDate) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.date_locks.lock().unwrap();
        locks.entry(date).or_default().clone()
    }
}
