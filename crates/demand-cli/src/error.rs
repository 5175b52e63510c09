use thiserror::Error;

/// Main error type for demand-cli
#[derive(Error, Debug)]
pub enum DemandError {
    #[error("Remote store unreachable: {0}")]
    Connectivity(#[from] reqwest::Error),

    #[error("Remote store error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Partial write: {committed} records committed before a batch failed: {message}")]
    PartialWrite { committed: u32, message: String },

    #[error("Shard enumeration failed: {0}")]
    ShardEnumeration(String),

    #[error("Batch of {0} operations exceeds the backend's hard per-batch limit")]
    BatchTooLarge(usize),

    #[error("Cache error: {0}")]
    Database(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid date format: {0}. Expected YYYY-MM-DD")]
    InvalidDateFormat(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DemandError>;

impl DemandError {
    /// Create a cache error from a message
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a configuration error from a message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a shard enumeration error from a message
    pub fn shard_enumeration(msg: impl Into<String>) -> Self {
        Self::ShardEnumeration(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_write_display() {
        let err = DemandError::PartialWrite {
            committed: 490,
            message: "backend unavailable".to_string(),
        };
        assert!(err.to_string().contains("490"));
        assert!(err.to_string().contains("backend unavailable"));
    }

    #[test]
    fn test_invalid_date_format_error() {
        let err = DemandError::InvalidDateFormat("not-a-date".to_string());
        assert!(err.to_string().contains("not-a-date"));
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_error_constructors() {
        assert!(matches!(
            DemandError::database("boom"),
            DemandError::Database(_)
        ));
        assert!(matches!(
            DemandError::config("missing url"),
            DemandError::Config(_)
        ));
        assert!(matches!(
            DemandError::shard_enumeration("listing failed"),
            DemandError::ShardEnumeration(_)
        ));
    }
}
