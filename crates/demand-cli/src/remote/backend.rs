//! Document backend contract for the remote sharded store

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{DailyEntry, ShardKey, ShardMeta};

/// The backend's hard per-batch operation limit.
///
/// A commit carrying more operations than this is rejected outright; the
/// store batches under [`super::OP_CEILING`] to stay below it.
pub const HARD_BATCH_CAP: usize = 500;

/// One operation inside a batch commit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DocOp {
    /// Upsert shard metadata. Merge semantics: fields the backend already
    /// holds but this op does not carry are preserved.
    MergeShard { key: ShardKey, meta: ShardMeta },
    /// Upsert the daily entry for `entry.date` under the shard
    PutDaily { key: ShardKey, entry: DailyEntry },
    /// Delete one daily entry
    DeleteDaily { key: ShardKey, date: NaiveDate },
    /// Delete the shard metadata document
    DeleteShard { key: ShardKey },
}

/// A shard document as enumerated from the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardDoc {
    pub key: ShardKey,
    pub meta: ShardMeta,
}

/// Optional dimension filter for shard enumeration
#[derive(Debug, Clone, Default)]
pub struct ShardFilter {
    pub client: Option<String>,
    pub city: Option<String>,
}

impl ShardFilter {
    /// A filter carrying at least one dimension bounds the shard subset
    pub fn is_narrow(&self) -> bool {
        self.client.is_some() || self.city.is_some()
    }
}

/// Batched document backend.
///
/// Daily entries are keyed by their `YYYY-MM-DD` date string; implementations
/// must serve `list_daily_range` with lexicographic bounds on that key, which
/// is chronologically correct only under that exact format (see
/// [`crate::model::date_key`]).
pub trait DocumentBackend {
    /// Commit a batch of operations atomically.
    ///
    /// Fails with [`crate::DemandError::BatchTooLarge`] when the batch
    /// exceeds [`HARD_BATCH_CAP`].
    fn commit(&self, ops: &[DocOp]) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Enumerate shard documents, optionally filtered and capped
    fn list_shards(
        &self,
        filter: &ShardFilter,
        limit: Option<usize>,
    ) -> impl std::future::Future<Output = Result<Vec<ShardDoc>>> + Send;

    /// Point read of one shard's daily entry
    fn get_daily(
        &self,
        key: &ShardKey,
        date: NaiveDate,
    ) -> impl std::future::Future<Output = Result<Option<DailyEntry>>> + Send;

    /// Range read of one shard's daily entries, bounds inclusive
    fn list_daily_range(
        &self,
        key: &ShardKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl std::future::Future<Output = Result<Vec<DailyEntry>>> + Send;

    /// Enumerate the dates of all daily entries under a shard
    fn list_daily_dates(
        &self,
        key: &ShardKey,
    ) -> impl std::future::Future<Output = Result<Vec<NaiveDate>>> + Send;
}
