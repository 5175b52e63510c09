//! Store-level contract tests against the in-memory backend

use chrono::{NaiveDate, TimeZone, Utc};
use demand_cli::model::DemandRecord;
use demand_cli::remote::{MemoryBackend, ShardFilter, ShardedStore, OP_CEILING};
use demand_cli::DemandError;

fn record(id: &str, city: &str, area: &str, score: u32, day: u32) -> DemandRecord {
    DemandRecord::new(
        id,
        "apex",
        city,
        area,
        score,
        Utc.with_ymd_and_hms(2024, 1, day, 8, 0, 0).unwrap(),
    )
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

#[tokio::test]
async fn test_write_then_point_read_round_trips() {
    let backend = MemoryBackend::new();
    let store = ShardedStore::new(backend);

    store
        .write(&[record("r1", "Lisbon", "Alfama", 10, 5)])
        .await
        .unwrap();

    let results = store
        .read_point(&ShardFilter::default(), date(5), false)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "r1");
    assert_eq!(results[0].city, "Lisbon");
    assert_eq!(results[0].demand_score, 10);
}

#[tokio::test]
async fn test_rewrite_of_same_cell_keeps_last_score() {
    let backend = MemoryBackend::new();
    let store = ShardedStore::new(backend.clone());

    store
        .write(&[record("r1", "Lisbon", "Alfama", 10, 5)])
        .await
        .unwrap();
    store
        .write(&[record("r2", "Lisbon", "Alfama", 3, 5)])
        .await
        .unwrap();

    // One (shard, date) cell, no history
    assert_eq!(backend.daily_entry_count(), 1);
    let results = store
        .read_point(&ShardFilter::default(), date(5), false)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].demand_score, 3);
    assert_eq!(results[0].id, "r2");
}

#[tokio::test]
async fn test_clear_all_deletes_entries_and_shards() {
    let backend = MemoryBackend::new();
    let store = ShardedStore::new(backend.clone());

    store
        .write(&[
            record("r1", "Lisbon", "Alfama", 10, 5),
            record("r2", "Porto", "Foz", 7, 6),
        ])
        .await
        .unwrap();

    let outcome = store.clear_all().await.unwrap();
    assert_eq!(outcome.daily_entries_deleted, 2);
    assert_eq!(outcome.shards_deleted, 2);
    assert_eq!(backend.daily_entry_count(), 0);
    assert_eq!(backend.shard_count(), 0);
}

#[tokio::test]
async fn test_bulk_write_batches_stay_under_ceiling() {
    let backend = MemoryBackend::new();
    let store = ShardedStore::new(backend.clone());

    // 1000 records = 2000 ops, so five commits at two ops per record
    let records: Vec<_> = (0..1000)
        .map(|i| record(&format!("r{}", i), &format!("city{}", i), "a", 1, 5))
        .collect();
    let outcome = store.write(&records).await.unwrap();

    assert_eq!(outcome.records_written, 1000);
    assert_eq!(backend.commit_count(), 5);
    assert!(backend.max_batch_len() <= OP_CEILING);
}

#[tokio::test]
async fn test_partial_write_reports_committed_records() {
    let backend = MemoryBackend::new();
    let store = ShardedStore::new(backend.clone());

    backend.fail_on_commit(3);
    let records: Vec<_> = (0..1000)
        .map(|i| record(&format!("r{}", i), &format!("city{}", i), "a", 1, 5))
        .collect();

    let err = store.write(&records).await.unwrap_err();
    match err {
        DemandError::PartialWrite { committed, .. } => {
            // Two full batches of 245 records landed before the failure
            assert_eq!(committed, 490);
        }
        other => panic!("expected PartialWrite, got {:?}", other),
    }
    assert_eq!(backend.daily_entry_count(), 490);
}

#[tokio::test]
async fn test_range_read_bounds_are_inclusive() {
    let backend = MemoryBackend::new();
    let store = ShardedStore::new(backend);

    let records: Vec<_> = (1..=11)
        .map(|day| record(&format!("r{}", day), "Lisbon", "Alfama", day, day))
        .collect();
    store.write(&records).await.unwrap();

    let results = store
        .read_range(&ShardFilter::default(), date(5), date(10), false)
        .await
        .unwrap();

    let days: Vec<u32> = results.iter().map(|r| r.demand_score).collect();
    assert_eq!(days, vec![5, 6, 7, 8, 9, 10]);
}

#[tokio::test]
async fn test_range_read_sorts_date_asc_then_score_desc() {
    let backend = MemoryBackend::new();
    let store = ShardedStore::new(backend);

    store
        .write(&[
            record("r1", "Lisbon", "Alfama", 3, 6),
            record("r2", "Porto", "Foz", 9, 5),
            record("r3", "Faro", "Centro", 6, 5),
        ])
        .await
        .unwrap();

    let results = store
        .read_range(&ShardFilter::default(), date(5), date(6), false)
        .await
        .unwrap();

    let pairs: Vec<(u32, u32)> = results
        .iter()
        .map(|r| (r.date.format("%d").to_string().parse().unwrap(), r.demand_score))
        .collect();
    assert_eq!(pairs, vec![(5, 9), (5, 6), (6, 3)]);
}
