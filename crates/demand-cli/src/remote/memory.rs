//! In-memory document backend (for testing and offline runs)
//!
//! Daily entries are keyed by their `YYYY-MM-DD` string in a `BTreeMap`, so
//! range scans use the same lexicographic bounds the HTTP backend relies on.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::error::{DemandError, Result};
use crate::model::{date_key, DailyEntry, ShardKey, ShardMeta};
use crate::remote::backend::{DocOp, DocumentBackend, ShardDoc, ShardFilter, HARD_BATCH_CAP};

#[derive(Debug, Default)]
struct ShardState {
    meta: ShardMeta,
    daily: BTreeMap<String, DailyEntry>,
}

#[derive(Debug, Default)]
struct State {
    shards: BTreeMap<String, ShardState>,
    commits: u32,
    max_batch_len: usize,
    fail_on_commit: Option<u32>,
    fail_daily_for: Option<ShardKey>,
}

/// In-memory backend sharing its state across clones
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<State>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of batch commits accepted so far
    pub fn commit_count(&self) -> u32 {
        self.inner.lock().unwrap().commits
    }

    /// Largest batch accepted so far
    pub fn max_batch_len(&self) -> usize {
        self.inner.lock().unwrap().max_batch_len
    }

    /// Make the n-th commit attempt (1-based) fail without applying its
    /// operations. One-shot: a later attempt succeeds.
    pub fn fail_on_commit(&self, n: u32) {
        self.inner.lock().unwrap().fail_on_commit = Some(n);
    }

    /// Make daily reads for one shard fail
    pub fn fail_daily_reads_for(&self, key: ShardKey) {
        self.inner.lock().unwrap().fail_daily_for = Some(key);
    }

    /// Total daily entries across all shards
    pub fn daily_entry_count(&self) -> usize {
        let state = self.inner.lock().unwrap();
        state.shards.values().map(|s| s.daily.len()).sum()
    }

    /// Number of shard documents
    pub fn shard_count(&self) -> usize {
        self.inner.lock().unwrap().shards.len()
    }
}

fn matches_filter(meta: &ShardMeta, filter: &ShardFilter) -> bool {
    if let Some(client) = &filter.client {
        if &meta.client != client {
            return false;
        }
    }
    if let Some(city) = &filter.city {
        if &meta.city != city {
            return false;
        }
    }
    true
}

impl DocumentBackend for MemoryBackend {
    async fn commit(&self, ops: &[DocOp]) -> Result<()> {
        if ops.len() > HARD_BATCH_CAP {
            return Err(DemandError::BatchTooLarge(ops.len()));
        }

        let mut state = self.inner.lock().unwrap();
        if let Some(n) = state.fail_on_commit {
            if state.commits + 1 == n {
                state.fail_on_commit = None;
                return Err(DemandError::Api {
                    status: 503,
                    message: "simulated commit failure".to_string(),
                });
            }
        }

        for op in ops {
            match op {
                DocOp::MergeShard { key, meta } => {
                    let shard = state.shards.entry(key.as_str().to_string()).or_default();
                    // All three fields are carried, so the merge reduces to
                    // replacing them; entries under the shard are untouched.
                    shard.meta = meta.clone();
                }
                DocOp::PutDaily { key, entry } => {
                    let shard = state.shards.entry(key.as_str().to_string()).or_default();
                    shard.daily.insert(date_key(entry.date), entry.clone());
                }
                DocOp::DeleteDaily { key, date } => {
                    if let Some(shard) = state.shards.get_mut(key.as_str()) {
                        shard.daily.remove(&date_key(*date));
                    }
                }
                DocOp::DeleteShard { key } => {
                    state.shards.remove(key.as_str());
                }
            }
        }

        state.commits += 1;
        state.max_batch_len = state.max_batch_len.max(ops.len());
        Ok(())
    }

    async fn list_shards(
        &self,
        filter: &ShardFilter,
        limit: Option<usize>,
    ) -> Result<Vec<ShardDoc>> {
        let state = self.inner.lock().unwrap();
        let docs = state
            .shards
            .iter()
            .filter(|(_, shard)| matches_filter(&shard.meta, filter))
            .map(|(key, shard)| ShardDoc {
                key: ShardKey::from_raw(key.clone()),
                meta: shard.meta.clone(),
            })
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        Ok(docs)
    }

    async fn get_daily(&self, key: &ShardKey, date: NaiveDate) -> Result<Option<DailyEntry>> {
        let state = self.inner.lock().unwrap();
        if state.fail_daily_for.as_ref() == Some(key) {
            return Err(DemandError::Api {
                status: 503,
                message: "simulated daily read failure".to_string(),
            });
        }
        Ok(state
            .shards
            .get(key.as_str())
            .and_then(|shard| shard.daily.get(&date_key(date)).cloned()))
    }

    async fn list_daily_range(
        &self,
        key: &ShardKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyEntry>> {
        let state = self.inner.lock().unwrap();
        if state.fail_daily_for.as_ref() == Some(key) {
            return Err(DemandError::Api {
                status: 503,
                message: "simulated daily read failure".to_string(),
            });
        }
        let Some(shard) = state.shards.get(key.as_str()) else {
            return Ok(Vec::new());
        };
        // Inclusive lexicographic range over the YYYY-MM-DD keys
        Ok(shard
            .daily
            .range(date_key(start)..=date_key(end))
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    async fn list_daily_dates(&self, key: &ShardKey) -> Result<Vec<NaiveDate>> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .shards
            .get(key.as_str())
            .map(|shard| shard.daily.values().map(|e| e.date).collect())
            .unwrap_or_default())
    }
}
