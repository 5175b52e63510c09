//! Ingestion boundary: upstream sources producing raw demand records
//!
//! The spreadsheet adapters live outside this crate; what is fixed here is
//! the contract they must satisfy (records plus precise per-client status)
//! and the data-driven parsing table: a closed set of clients, each mapped
//! to field extractors resolved through a small interpreter.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DemandError, Result};
use crate::model::DemandRecord;

/// The fixed set of upstream clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientId {
    Apex,
    Borealis,
    Cinder,
}

impl ClientId {
    pub const ALL: [ClientId; 3] = [ClientId::Apex, ClientId::Borealis, ClientId::Cinder];

    pub fn name(&self) -> &'static str {
        match self {
            ClientId::Apex => "apex",
            ClientId::Borealis => "borealis",
            ClientId::Cinder => "cinder",
        }
    }

    /// Total mapping from client to its parsing configuration
    pub fn config(&self) -> ClientConfig {
        match self {
            ClientId::Apex => ClientConfig {
                id_field: FieldExtractor::Literal("request_id"),
                city_field: FieldExtractor::Literal("city"),
                area_field: FieldExtractor::Literal("area"),
                score_field: FieldExtractor::Literal("demand"),
            },
            ClientId::Borealis => ClientConfig {
                id_field: FieldExtractor::Literal("uuid"),
                city_field: FieldExtractor::Literal("municipality"),
                area_field: FieldExtractor::Computed(borealis_area),
                score_field: FieldExtractor::Literal("score"),
            },
            ClientId::Cinder => ClientConfig {
                id_field: FieldExtractor::Computed(cinder_id),
                city_field: FieldExtractor::Literal("location"),
                area_field: FieldExtractor::Literal("district"),
                score_field: FieldExtractor::Literal("requests"),
            },
        }
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Borealis nests the area under `zone.name`
fn borealis_area(row: &Value) -> Option<String> {
    row.get("zone")
        .and_then(|z| z.get("name"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Cinder rows carry no id; derive one from location and sequence
fn cinder_id(row: &Value) -> Option<String> {
    let location = row.get("location").and_then(|v| v.as_str())?;
    let seq = row.get("seq").and_then(|v| v.as_i64())?;
    Some(format!("cinder-{}-{}", location, seq))
}

/// How one logical field is pulled out of a raw row: either a literal
/// field name or a computed function over the whole row
pub enum FieldExtractor {
    Literal(&'static str),
    Computed(fn(&Value) -> Option<String>),
}

impl FieldExtractor {
    /// Resolve the extractor against one row
    pub fn resolve(&self, row: &Value) -> Option<String> {
        match self {
            FieldExtractor::Literal(name) => match row.get(*name) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            },
            FieldExtractor::Computed(f) => f(row),
        }
    }
}

/// Per-client parsing table
pub struct ClientConfig {
    pub id_field: FieldExtractor,
    pub city_field: FieldExtractor,
    pub area_field: FieldExtractor,
    pub score_field: FieldExtractor,
}

/// Outcome of fetching one client's source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Success,
    Error,
    Empty,
}

/// Per-client fetch diagnostics, surfaced unchanged to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientStatus {
    pub client: ClientId,
    pub status: SourceStatus,
    pub row_count: u32,
    pub message: Option<String>,
}

/// Records plus per-client diagnostics from one upstream fetch
#[derive(Debug, Default)]
pub struct UpstreamFetch {
    pub records: Vec<DemandRecord>,
    pub per_client_status: Vec<ClientStatus>,
}

/// An upstream source of raw demand records.
///
/// Implementations fetch clients sequentially so one failing source is
/// never conflated with another in the status report.
pub trait UpstreamSource {
    fn fetch(
        &self,
        clients: &[ClientId],
    ) -> impl std::future::Future<Output = Result<UpstreamFetch>> + Send;
}

/// Parse one client's raw rows into records.
///
/// Rows missing a city or area are skipped; an unparseable score counts as
/// zero; a missing id gets a deterministic fallback unique within the batch.
pub fn parse_rows(client: ClientId, rows: &[Value], fetched_at: DateTime<Utc>) -> Vec<DemandRecord> {
    let config = client.config();
    let mut records = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let Some(city) = config.city_field.resolve(row) else {
            continue;
        };
        let Some(area) = config.area_field.resolve(row) else {
            continue;
        };

        let score = config
            .score_field
            .resolve(row)
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(0);

        let id = config
            .id_field
            .resolve(row)
            .unwrap_or_else(|| format!("{}-{}-{}", client, fetched_at.timestamp(), index));

        records.push(DemandRecord::new(id, client.name(), city, area, score, fetched_at));
    }

    records
}

/// Upstream source reading pre-exported rows from a JSON file.
///
/// The file maps client names to row arrays:
/// `{ "apex": [ {...}, ... ], "borealis": [ ... ] }`
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl UpstreamSource for JsonFileSource {
    async fn fetch(&self, clients: &[ClientId]) -> Result<UpstreamFetch> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let sheets: Value = serde_json::from_str(&raw)?;
        let sheets = sheets
            .as_object()
            .ok_or_else(|| DemandError::Other("expected a JSON object of client sheets".into()))?;

        let requested: BTreeSet<&str> = clients.iter().map(|c| c.name()).collect();
        let fetched_at = Utc::now();
        let mut fetch = UpstreamFetch::default();

        // One client at a time, so status attribution stays precise
        for client in ClientId::ALL {
            if !clients.is_empty() && !requested.contains(client.name()) {
                continue;
            }

            let Some(rows) = sheets.get(client.name()).and_then(|v| v.as_array()) else {
                fetch.per_client_status.push(ClientStatus {
                    client,
                    status: SourceStatus::Error,
                    row_count: 0,
                    message: Some("no sheet present for client".to_string()),
                });
                continue;
            };

            if rows.is_empty() {
                fetch.per_client_status.push(ClientStatus {
                    client,
                    status: SourceStatus::Empty,
                    row_count: 0,
                    message: None,
                });
                continue;
            }

            let records = parse_rows(client, rows, fetched_at);
            fetch.per_client_status.push(ClientStatus {
                client,
                status: SourceStatus::Success,
                row_count: records.len() as u32,
                message: None,
            });
            fetch.records.extend(records);
        }

        Ok(fetch)
    }
}
