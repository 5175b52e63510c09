//! SQLite-backed local record cache
//!
//! Mirrors a working subset of the remote store for fast offline-capable
//! reads:
//! - records: one row per DemandRecord, keyed by id, indexed by the
//!   report dimensions
//! - sync_meta: a single row recording the last successful reconciliation

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{DemandError, Result};
use crate::model::{date_key, DemandRecord, SyncMeta};

/// Local cache database
pub struct CacheDb {
    conn: Connection,
}

impl CacheDb {
    /// Open or create the cache database
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| DemandError::database(format!("Failed to open cache database: {}", e)))?;

        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            DemandError::database(format!("Failed to open in-memory database: {}", e))
        })?;

        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Run migrations
    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS records (
                    id TEXT PRIMARY KEY,
                    client TEXT NOT NULL,
                    city TEXT NOT NULL,
                    area TEXT NOT NULL,
                    demand_score INTEGER NOT NULL,
                    timestamp TEXT NOT NULL,
                    date TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_records_date ON records(date);
                CREATE INDEX IF NOT EXISTS idx_records_client ON records(client);
                CREATE INDEX IF NOT EXISTS idx_records_city ON records(city);
                CREATE INDEX IF NOT EXISTS idx_records_area ON records(area);

                CREATE TABLE IF NOT EXISTS sync_meta (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    last_synced_at TEXT NOT NULL
                );
                "#,
            )
            .map_err(|e| DemandError::database(format!("Failed to run migrations: {}", e)))?;

        Ok(())
    }

    /// Insert-or-replace records by their natural id.
    ///
    /// Does not deduplicate across repeated ingests; callers syncing a date
    /// window must clear the overlapping range first.
    pub fn upsert(&mut self, records: &[DemandRecord]) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| DemandError::database(e.to_string()))?;

        for record in records {
            tx.execute(
                "INSERT OR REPLACE INTO records
                     (id, client, city, area, demand_score, timestamp, date)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    record.id,
                    record.client,
                    record.city,
                    record.area,
                    record.demand_score,
                    record.timestamp.to_rfc3339(),
                    date_key(record.date),
                ],
            )
            .map_err(|e| DemandError::database(format!("Failed to upsert record: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| DemandError::database(e.to_string()))?;
        Ok(())
    }

    /// Remove every cached record for one date
    pub fn delete_by_date(&self, date: NaiveDate) -> Result<u32> {
        let count = self
            .conn
            .execute("DELETE FROM records WHERE date = ?", params![date_key(date)])
            .map_err(|e| DemandError::database(format!("Failed to delete records: {}", e)))?;
        Ok(count as u32)
    }

    /// Remove every cached record and reset sync metadata to absent
    pub fn clear_all(&self) -> Result<()> {
        self.conn
            .execute_batch("DELETE FROM records; DELETE FROM sync_meta;")
            .map_err(|e| DemandError::database(format!("Failed to clear cache: {}", e)))?;
        Ok(())
    }

    /// All cached records for one date
    pub fn query_by_date(&self, date: NaiveDate) -> Result<Vec<DemandRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, client, city, area, demand_score, timestamp, date
                 FROM records WHERE date = ?",
            )
            .map_err(|e| DemandError::database(e.to_string()))?;

        let rows = stmt
            .query_map(params![date_key(date)], row_to_record)
            .map_err(|e| DemandError::database(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| DemandError::database(e.to_string()))?);
        }
        Ok(records)
    }

    /// Total number of cached records
    pub fn total_count(&self) -> Result<u32> {
        self.conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
            .map_err(|e| DemandError::database(e.to_string()))
    }

    /// Read sync metadata; absent until the first successful sync
    pub fn get_sync_meta(&self) -> Result<SyncMeta> {
        let last_synced_at: Option<String> = self
            .conn
            .query_row("SELECT last_synced_at FROM sync_meta WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| DemandError::database(e.to_string()))?;

        Ok(SyncMeta {
            last_synced_at: last_synced_at
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }

    /// Record a successful reconciliation
    pub fn set_sync_meta(&self, synced_at: DateTime<Utc>) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_meta (id, last_synced_at) VALUES (1, ?)
                 ON CONFLICT (id) DO UPDATE SET last_synced_at = excluded.last_synced_at",
                params![synced_at.to_rfc3339()],
            )
            .map_err(|e| DemandError::database(format!("Failed to set sync meta: {}", e)))?;
        Ok(())
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<DemandRecord> {
    let timestamp: String = row.get(5)?;
    let date: String = row.get(6)?;
    Ok(DemandRecord {
        id: row.get(0)?,
        client: row.get(1)?,
        city: row.get(2)?,
        area: row.get(3)?,
        demand_score: row.get(4)?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_default(),
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap_or_default(),
    })
}
