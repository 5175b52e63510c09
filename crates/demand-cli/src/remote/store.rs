//! Batched write/read/clear protocol over the document backend

use chrono::NaiveDate;
use tracing::warn;

use crate::error::{DemandError, Result};
use crate::model::DemandRecord;
use crate::remote::backend::{DocOp, DocumentBackend, ShardFilter};

/// Operations accumulated per batch before committing.
///
/// Kept below the backend's hard cap of 500 to leave headroom.
pub const OP_CEILING: usize = 490;

/// Shard cap for broad point reads (no client/city filter)
pub const BROAD_SHARD_CAP: usize = 150;

/// Shard cap for analytical reads and broad reads with bypass requested
pub const ANALYSIS_SHARD_CAP: usize = 750;

/// Maximum client-facing result size unless bypass is requested
pub const RESULT_CAP: usize = 500;

/// Outcome of a successful bulk write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub records_written: u32,
}

/// Outcome of a successful bulk clear
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearOutcome {
    pub shards_deleted: u32,
    pub daily_entries_deleted: u32,
}

/// Remote sharded time-series store
#[derive(Debug, Clone)]
pub struct ShardedStore<B> {
    backend: B,
}

impl<B: DocumentBackend> ShardedStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Persist a batch of records.
    ///
    /// Each record costs two operations (shard metadata merge + daily
    /// upsert); both stay in the same batch. Batches commit strictly in
    /// assembly order. A failed commit aborts the call and reports the
    /// records already committed — earlier batches are not rolled back.
    pub async fn write(&self, records: &[DemandRecord]) -> Result<WriteOutcome> {
        let mut batch: Vec<DocOp> = Vec::new();
        let mut batch_records = 0u32;
        let mut committed = 0u32;

        for record in records {
            if batch.len() + 2 > OP_CEILING {
                self.commit_write_batch(&batch, committed).await?;
                committed += batch_records;
                batch.clear();
                batch_records = 0;
            }

            let key = record.shard_key();
            batch.push(DocOp::MergeShard {
                key: key.clone(),
                meta: record.shard_meta(),
            });
            batch.push(DocOp::PutDaily {
                key,
                entry: record.daily_entry(),
            });
            batch_records += 1;
        }

        if !batch.is_empty() {
            self.commit_write_batch(&batch, committed).await?;
            committed += batch_records;
        }

        Ok(WriteOutcome {
            records_written: committed,
        })
    }

    async fn commit_write_batch(&self, batch: &[DocOp], committed: u32) -> Result<()> {
        self.backend
            .commit(batch)
            .await
            .map_err(|e| DemandError::PartialWrite {
                committed,
                message: e.to_string(),
            })
    }

    /// Delete every daily entry and every shard document.
    ///
    /// Two phases: enumerate each shard's daily entries and batch-delete
    /// them, then re-enumerate the shard documents and batch-delete those.
    /// The phase split is bookkeeping clarity, not a correctness need.
    pub async fn clear_all(&self) -> Result<ClearOutcome> {
        let mut outcome = ClearOutcome::default();

        let shards = self.backend.list_shards(&ShardFilter::default(), None).await?;
        let mut batch: Vec<DocOp> = Vec::new();
        let mut batch_entries = 0u32;

        for shard in &shards {
            let dates = self.backend.list_daily_dates(&shard.key).await?;
            for date in dates {
                if batch.len() + 1 > OP_CEILING {
                    self.commit_clear_batch(&batch, &outcome).await?;
                    outcome.daily_entries_deleted += batch_entries;
                    batch.clear();
                    batch_entries = 0;
                }
                batch.push(DocOp::DeleteDaily {
                    key: shard.key.clone(),
                    date,
                });
                batch_entries += 1;
            }
        }
        if !batch.is_empty() {
            self.commit_clear_batch(&batch, &outcome).await?;
            outcome.daily_entries_deleted += batch_entries;
        }

        // Phase two: the shard documents themselves
        let shards = self.backend.list_shards(&ShardFilter::default(), None).await?;
        let mut batch: Vec<DocOp> = Vec::new();
        let mut batch_shards = 0u32;
        for shard in &shards {
            if batch.len() + 1 > OP_CEILING {
                self.commit_clear_batch(&batch, &outcome).await?;
                outcome.shards_deleted += batch_shards;
                batch.clear();
                batch_shards = 0;
            }
            batch.push(DocOp::DeleteShard {
                key: shard.key.clone(),
            });
            batch_shards += 1;
        }
        if !batch.is_empty() {
            self.commit_clear_batch(&batch, &outcome).await?;
            outcome.shards_deleted += batch_shards;
        }

        Ok(outcome)
    }

    async fn commit_clear_batch(&self, batch: &[DocOp], applied: &ClearOutcome) -> Result<()> {
        self.backend
            .commit(batch)
            .await
            .map_err(|e| DemandError::PartialWrite {
                committed: applied.daily_entries_deleted + applied.shards_deleted,
                message: e.to_string(),
            })
    }

    /// Point read: every shard's daily entry for one date.
    ///
    /// Broad reads (no filter) cap the shard query itself; narrow reads run
    /// uncapped but truncate the shard list before issuing daily reads.
    /// Shard-enumeration failure is fatal; individual daily reads that fail
    /// are logged and skipped, degrading to partial results.
    pub async fn read_point(
        &self,
        filter: &ShardFilter,
        date: NaiveDate,
        bypass_limits: bool,
    ) -> Result<Vec<DemandRecord>> {
        let shard_cap = if bypass_limits {
            ANALYSIS_SHARD_CAP
        } else {
            BROAD_SHARD_CAP
        };

        let mut shards = if filter.is_narrow() {
            self.backend.list_shards(filter, None).await?
        } else {
            self.backend.list_shards(filter, Some(shard_cap)).await?
        };
        shards.truncate(shard_cap);

        let mut results = Vec::new();
        for shard in shards {
            match self.backend.get_daily(&shard.key, date).await {
                Ok(Some(entry)) => results.push(entry.into_record(&shard.meta)),
                Ok(None) => {}
                Err(e) => {
                    warn!(shard = %shard.key, error = %e, "skipping shard after failed daily read");
                }
            }
        }

        results.sort_by(|a, b| b.demand_score.cmp(&a.demand_score));
        if !bypass_limits {
            results.truncate(RESULT_CAP);
        }
        Ok(results)
    }

    /// Range read: daily entries for all matching shards between `start` and
    /// `end` inclusive, sorted by date ascending then score descending.
    ///
    /// Per-shard range queries use lexicographic bounds on the `YYYY-MM-DD`
    /// key — correct only under that exact zero-padded format.
    pub async fn read_range(
        &self,
        filter: &ShardFilter,
        start: NaiveDate,
        end: NaiveDate,
        bypass_limits: bool,
    ) -> Result<Vec<DemandRecord>> {
        let shards = self
            .backend
            .list_shards(filter, Some(ANALYSIS_SHARD_CAP))
            .await?;

        let mut results = Vec::new();
        for shard in shards {
            match self.backend.list_daily_range(&shard.key, start, end).await {
                Ok(entries) => {
                    results.extend(entries.into_iter().map(|e| e.into_record(&shard.meta)));
                }
                Err(e) => {
                    warn!(shard = %shard.key, error = %e, "skipping shard after failed range read");
                }
            }
        }

        results.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| b.demand_score.cmp(&a.demand_score))
        });
        if !bypass_limits {
            results.truncate(RESULT_CAP);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShardKey;
    use crate::remote::MemoryBackend;
    use chrono::{TimeZone, Utc};

    fn record(id: &str, client: &str, city: &str, area: &str, score: u32, day: u32) -> DemandRecord {
        DemandRecord::new(
            id,
            client,
            city,
            area,
            score,
            Utc.with_ymd_and_hms(2024, 1, day, 8, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_write_groups_record_ops_in_one_batch() {
        let backend = MemoryBackend::new();
        let store = ShardedStore::new(backend.clone());

        // 245 records = 490 ops: exactly one full batch
        let records: Vec<_> = (0..245)
            .map(|i| record(&format!("r{}", i), "apex", &format!("city{}", i), "a", 1, 1))
            .collect();
        let outcome = store.write(&records).await.unwrap();

        assert_eq!(outcome.records_written, 245);
        assert_eq!(backend.commit_count(), 1);
        assert_eq!(backend.max_batch_len(), OP_CEILING);
    }

    #[tokio::test]
    async fn test_point_read_skips_failing_shard() {
        let backend = MemoryBackend::new();
        let store = ShardedStore::new(backend.clone());
        store
            .write(&[
                record("r1", "apex", "Lisbon", "Alfama", 10, 5),
                record("r2", "apex", "Porto", "Foz", 7, 5),
            ])
            .await
            .unwrap();

        backend.fail_daily_reads_for(ShardKey::from_parts("apex", "Lisbon", "Alfama"));

        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let results = store
            .read_point(&ShardFilter::default(), date, false)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].city, "Porto");
    }

    #[tokio::test]
    async fn test_narrow_read_filters_by_client() {
        let backend = MemoryBackend::new();
        let store = ShardedStore::new(backend.clone());
        store
            .write(&[
                record("r1", "apex", "Lisbon", "Alfama", 10, 5),
                record("r2", "borealis", "Lisbon", "Alfama", 7, 5),
            ])
            .await
            .unwrap();

        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let filter = ShardFilter {
            client: Some("borealis".to_string()),
            city: None,
        };
        let results = store.read_point(&filter, date, false).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].client, "borealis");
    }

    #[tokio::test]
    async fn test_point_read_sorted_by_score_desc() {
        let backend = MemoryBackend::new();
        let store = ShardedStore::new(backend.clone());
        store
            .write(&[
                record("r1", "apex", "Lisbon", "Alfama", 3, 5),
                record("r2", "apex", "Porto", "Foz", 9, 5),
                record("r3", "apex", "Faro", "Centro", 6, 5),
            ])
            .await
            .unwrap();

        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let results = store
            .read_point(&ShardFilter::default(), date, false)
            .await
            .unwrap();
        let scores: Vec<u32> = results.iter().map(|r| r.demand_score).collect();
        assert_eq!(scores, vec![9, 6, 3]);
    }
}
