//! Local cache commands for demand-cli

use crate::error::Result;

use super::open_cache;

/// Drop all cached records and sync metadata
pub async fn clear(cache_path: Option<String>) -> Result<()> {
    let cache = open_cache(cache_path)?;
    cache.clear_all()?;
    println!("Local cache cleared");
    Ok(())
}

/// Show cache size and last sync time
pub async fn status(cache_path: Option<String>) -> Result<()> {
    let cache = open_cache(cache_path)?;
    let count = cache.total_count()?;
    let meta = cache.get_sync_meta()?;

    println!("Cache Status");
    println!("{}", "-".repeat(40));
    println!("Records: {}", count);
    match meta.last_synced_at {
        Some(at) => println!("Last synced: {}", at.to_rfc3339()),
        None => println!("Last synced: never"),
    }
    Ok(())
}
