//! Core record types and derived key functions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One demand measurement: a score for a (client, city, area) on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandRecord {
    /// Source-supplied identifier, or a deterministic fallback.
    /// Unique within one ingestion batch only.
    pub id: String,
    pub client: String,
    pub city: String,
    pub area: String,
    pub demand_score: u32,
    pub timestamp: DateTime<Utc>,
    /// Calendar day, always derived from `timestamp`
    pub date: NaiveDate,
}

impl DemandRecord {
    /// Build a record, deriving `date` from the timestamp
    pub fn new(
        id: impl Into<String>,
        client: impl Into<String>,
        city: impl Into<String>,
        area: impl Into<String>,
        demand_score: u32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            client: client.into(),
            city: city.into(),
            area: area.into(),
            demand_score,
            timestamp,
            date: timestamp.date_naive(),
        }
    }

    /// Shard this record belongs to
    pub fn shard_key(&self) -> ShardKey {
        ShardKey::from_parts(&self.client, &self.city, &self.area)
    }

    /// Shard metadata carried alongside the daily entries
    pub fn shard_meta(&self) -> ShardMeta {
        ShardMeta {
            client: self.client.clone(),
            city: self.city.clone(),
            area: self.area.clone(),
        }
    }

    /// The daily entry this record maps to
    pub fn daily_entry(&self) -> DailyEntry {
        DailyEntry {
            date: self.date,
            demand_score: self.demand_score,
            timestamp: self.timestamp,
            source_record_id: self.id.clone(),
        }
    }
}

/// Sanitized `(client, city, area)` grouping key.
///
/// Owns the shard's daily entries in the remote store; the string form is
/// path-safe (any character that is not ASCII alphanumeric becomes `_`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardKey(String);

impl ShardKey {
    pub fn from_parts(client: &str, city: &str, area: &str) -> Self {
        let raw = format!("{}_{}_{}", client, city, area);
        Self(sanitize(&raw))
    }

    /// Wrap an already-sanitized key (as returned by the backend)
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShardKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Replace anything that would break a path-safe identifier
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Shard metadata document: the un-sanitized dimension values.
///
/// Written with merge semantics so a later write never destroys fields the
/// backend already holds but this write does not carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardMeta {
    pub client: String,
    pub city: String,
    pub area: String,
}

/// One day's demand score for a shard.
///
/// At most one entry exists per (shard, date); a later write for the same
/// cell overwrites the earlier one with no history retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyEntry {
    pub date: NaiveDate,
    pub demand_score: u32,
    pub timestamp: DateTime<Utc>,
    pub source_record_id: String,
}

impl DailyEntry {
    /// Rebuild the flat record from shard metadata plus this entry
    pub fn into_record(self, meta: &ShardMeta) -> DemandRecord {
        DemandRecord {
            id: self.source_record_id,
            client: meta.client.clone(),
            city: meta.city.clone(),
            area: meta.area.clone(),
            demand_score: self.demand_score,
            timestamp: self.timestamp,
            date: self.date,
        }
    }
}

/// Singleton record tracking when the local cache was last reconciled
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMeta {
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Format a date as the storage key for daily entries.
///
/// Always zero-padded `YYYY-MM-DD`. Range reads over daily entries use
/// lexicographic bounds on this string, which is chronologically correct
/// ONLY under this exact format. Do not change it.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` date argument
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_date_derived_from_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 5, 23, 30, 0).unwrap();
        let record = DemandRecord::new("r1", "apex", "Lisbon", "Alfama", 10, ts);
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn test_shard_key_sanitization() {
        let key = ShardKey::from_parts("apex", "São Paulo", "Vila Madalena/Sul");
        assert_eq!(key.as_str(), "apex_S_o_Paulo_Vila_Madalena_Sul");
    }

    #[test]
    fn test_shard_key_stable_for_clean_input() {
        let key = ShardKey::from_parts("apex", "Lisbon", "Alfama");
        assert_eq!(key.as_str(), "apex_Lisbon_Alfama");
    }

    #[test]
    fn test_date_key_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(date_key(date), "2024-03-07");
    }

    #[test]
    fn test_date_key_lexicographic_order_matches_chronological() {
        let a = date_key(NaiveDate::from_ymd_opt(2024, 9, 30).unwrap());
        let b = date_key(NaiveDate::from_ymd_opt(2024, 10, 1).unwrap());
        assert!(a < b);
    }

    #[test]
    fn test_record_round_trips_through_daily_entry() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap();
        let record = DemandRecord::new("r1", "apex", "Lisbon", "Alfama", 42, ts);
        let rebuilt = record.daily_entry().into_record(&record.shard_meta());
        assert_eq!(rebuilt, record);
    }
}
