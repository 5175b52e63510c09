use std::path::PathBuf;

use crate::error::{DemandError, Result};

/// Default data directory name
const DATA_DIR_NAME: &str = "demand";

/// Environment variable naming the remote store's base URL
pub const API_URL_ENV: &str = "DEMAND_API_URL";

/// Environment variable carrying the bearer token for the remote store
pub const API_TOKEN_ENV: &str = "DEMAND_API_TOKEN";

/// Get the data directory path for the local cache
/// Returns ~/.local/share/demand on Unix, ~/Library/Application Support/demand on macOS
pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|p| p.join(DATA_DIR_NAME))
        .ok_or_else(|| DemandError::config("Could not determine data directory"))
}

/// Default path of the local cache database
pub fn default_cache_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("cache.db"))
}

/// Remote store base URL, from the environment
pub fn api_url() -> Result<String> {
    std::env::var(API_URL_ENV)
        .map_err(|_| DemandError::config(format!("{} is not set", API_URL_ENV)))
}

/// Optional bearer token, from the environment
pub fn api_token() -> Option<String> {
    std::env::var(API_TOKEN_ENV).ok().filter(|t| !t.is_empty())
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &PathBuf) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
