pub mod cache;
pub mod report;
pub mod sync;

pub use cache::{clear as cache_clear, status as cache_status};
pub use report::{area, city, client, hotspots, matrix};
pub use sync::{full as sync_full, run as sync_run, status as sync_status};

use chrono::{Local, NaiveDate};

use crate::cache::CacheDb;
use crate::config;
use crate::error::{DemandError, Result};
use crate::remote::{HttpBackend, ShardedStore};

/// Parse a YYYY-MM-DD argument, defaulting to today
pub(crate) fn resolve_date(date: Option<String>) -> Result<NaiveDate> {
    match date {
        Some(s) => crate::model::parse_date(&s).ok_or(DemandError::InvalidDateFormat(s)),
        None => Ok(Local::now().date_naive()),
    }
}

/// Open the local cache at the given path, or the default location
pub(crate) fn open_cache(path: Option<String>) -> Result<CacheDb> {
    match path {
        Some(p) => CacheDb::open(p),
        None => {
            let dir = config::data_dir()?;
            config::ensure_dir(&dir)?;
            CacheDb::open(config::default_cache_path()?)
        }
    }
}

/// Build the remote store from environment configuration
pub(crate) fn build_store() -> Result<ShardedStore<HttpBackend>> {
    let backend = HttpBackend::new(&config::api_url()?, config::api_token());
    Ok(ShardedStore::new(backend))
}

pub(crate) fn parse_client(name: &str) -> Result<crate::ingest::ClientId> {
    use crate::ingest::ClientId;
    ClientId::ALL
        .into_iter()
        .find(|c| c.name() == name)
        .ok_or_else(|| DemandError::config(format!("Unknown client: {}", name)))
}
