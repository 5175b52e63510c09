//! Sync commands for demand-cli

use crate::error::{DemandError, Result};
use crate::ingest::{ClientId, JsonFileSource};
use crate::sync::{Reconciler, SyncOptions};

use super::{build_store, open_cache, parse_client, resolve_date};

/// Reconcile the local cache for one date
pub async fn run(date: Option<String>, cache_path: Option<String>) -> Result<()> {
    let date = resolve_date(date)?;
    let cache = open_cache(cache_path)?;
    let recon = Reconciler::new(build_store()?, cache);

    println!("Syncing {} from remote store...", date);
    let outcome = recon.sync_date(date).await;
    report_outcome(&outcome)
}

/// Full resync: clear the remote store and re-ingest from an upstream export
pub async fn full(
    source_path: String,
    clients: Vec<String>,
    retries: u32,
    cache_path: Option<String>,
) -> Result<()> {
    let clients: Vec<ClientId> = clients
        .iter()
        .map(|c| parse_client(c))
        .collect::<Result<_>>()?;

    let cache = open_cache(cache_path)?;
    let recon = Reconciler::with_options(build_store()?, cache, SyncOptions { retries });
    let source = JsonFileSource::new(&source_path);

    println!("Running full resync from {}...", source_path);
    let report = recon.full_resync(&source, &clients).await;

    for status in &report.per_client_status {
        let detail = status
            .message
            .as_deref()
            .map(|m| format!(" ({})", m))
            .unwrap_or_default();
        println!(
            "  {:<10} {:?}: {} rows{}",
            status.client.name(),
            status.status,
            status.row_count,
            detail
        );
    }

    report_outcome(&report.outcome)
}

/// Show last sync time and cache size
pub async fn status(cache_path: Option<String>) -> Result<()> {
    let cache = open_cache(cache_path)?;
    let meta = cache.get_sync_meta()?;
    let count = cache.total_count()?;

    println!("Sync Status");
    println!("{}", "-".repeat(40));
    match meta.last_synced_at {
        Some(at) => println!("Last synced: {}", at.to_rfc3339()),
        None => println!("Last synced: never"),
    }
    println!("Cached records: {}", count);
    Ok(())
}

fn report_outcome(outcome: &crate::sync::SyncOutcome) -> Result<()> {
    if outcome.success {
        println!("{}", outcome.message);
        Ok(())
    } else {
        if let Some(committed) = outcome.partial_count {
            println!("Partial progress: {} operations committed", committed);
        }
        Err(DemandError::Other(outcome.message.clone()))
    }
}
