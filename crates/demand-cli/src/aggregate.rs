//! Pure aggregation over in-memory record sets
//!
//! Every function here is deterministic, performs no I/O, and never fails:
//! the summaries are recomputed on demand and carry no lifecycle of their
//! own. Grouping uses BTreeMaps so iteration order, and therefore every
//! tie-break, is reproducible.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::DemandRecord;

/// Summed demand for one city
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityDemand {
    pub city: String,
    pub total_demand: u64,
}

/// Summed demand for one client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientDemand {
    pub client: String,
    pub total_demand: u64,
}

/// Summed demand for one (city, area) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaDemand {
    pub city: String,
    pub area: String,
    pub total_demand: u64,
    /// Every client that contributed any score to this pair
    pub clients: BTreeSet<String>,
}

/// A city where several clients independently show strong demand
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotspotCity {
    pub city: String,
    pub active_clients: Vec<String>,
    /// Sum over active clients only
    pub total_demand: u64,
    pub client_count: usize,
}

/// One row of the city × client activity matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityActivityRow {
    pub city: String,
    /// Presence per selected client
    pub presence: BTreeMap<String, bool>,
    /// Highest-demand area per present client
    pub top_area: BTreeMap<String, String>,
    pub active_count: usize,
}

/// Group-sum demand by city, highest first
pub fn city_demand(records: &[DemandRecord]) -> Vec<CityDemand> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for record in records {
        *totals.entry(&record.city).or_default() += u64::from(record.demand_score);
    }

    let mut out: Vec<CityDemand> = totals
        .into_iter()
        .map(|(city, total_demand)| CityDemand {
            city: city.to_string(),
            total_demand,
        })
        .collect();
    out.sort_by(|a, b| b.total_demand.cmp(&a.total_demand).then(a.city.cmp(&b.city)));
    out
}

/// Group-sum demand by client, highest first
pub fn client_demand(records: &[DemandRecord]) -> Vec<ClientDemand> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for record in records {
        *totals.entry(&record.client).or_default() += u64::from(record.demand_score);
    }

    let mut out: Vec<ClientDemand> = totals
        .into_iter()
        .map(|(client, total_demand)| ClientDemand {
            client: client.to_string(),
            total_demand,
        })
        .collect();
    out.sort_by(|a, b| {
        b.total_demand
            .cmp(&a.total_demand)
            .then(a.client.cmp(&b.client))
    });
    out
}

/// Group-sum demand by (city, area), highest first, with contributing clients
pub fn area_demand(records: &[DemandRecord]) -> Vec<AreaDemand> {
    let mut groups: BTreeMap<(&str, &str), (u64, BTreeSet<String>)> = BTreeMap::new();
    for record in records {
        let entry = groups
            .entry((&record.city, &record.area))
            .or_insert_with(|| (0, BTreeSet::new()));
        entry.0 += u64::from(record.demand_score);
        entry.1.insert(record.client.clone());
    }

    let mut out: Vec<AreaDemand> = groups
        .into_iter()
        .map(|((city, area), (total_demand, clients))| AreaDemand {
            city: city.to_string(),
            area: area.to_string(),
            total_demand,
            clients,
        })
        .collect();
    out.sort_by(|a, b| {
        b.total_demand
            .cmp(&a.total_demand)
            .then(a.city.cmp(&b.city))
            .then(a.area.cmp(&b.area))
    });
    out
}

/// Cities where at least `min_clients` clients each reach
/// `min_demand_per_client` on their own.
///
/// A client is active in a city only when its per-client sum meets the
/// threshold; the hotspot total counts active clients' contributions only.
/// Sorted by active client count, then total demand, both descending.
pub fn multi_client_hotspots(
    records: &[DemandRecord],
    min_clients: usize,
    min_demand_per_client: u64,
) -> Vec<HotspotCity> {
    // city -> client -> summed score
    let mut per_city: BTreeMap<&str, BTreeMap<&str, u64>> = BTreeMap::new();
    for record in records {
        *per_city
            .entry(&record.city)
            .or_default()
            .entry(&record.client)
            .or_default() += u64::from(record.demand_score);
    }

    let mut out = Vec::new();
    for (city, client_totals) in per_city {
        let mut active_clients = Vec::new();
        let mut total_demand = 0u64;
        for (client, total) in client_totals {
            if total >= min_demand_per_client {
                active_clients.push(client.to_string());
                total_demand += total;
            }
        }

        if active_clients.len() >= min_clients {
            out.push(HotspotCity {
                city: city.to_string(),
                client_count: active_clients.len(),
                active_clients,
                total_demand,
            });
        }
    }

    out.sort_by(|a, b| {
        b.client_count
            .cmp(&a.client_count)
            .then(b.total_demand.cmp(&a.total_demand))
            .then(a.city.cmp(&b.city))
    });
    out
}

/// City × client activity matrix over a selected client set.
///
/// Presence is true when any record exists for the (city, client) pair; the
/// top area is the client's highest-summed area in that city, alphabetically
/// first on ties. Rows sort by active client count descending, then city
/// ascending; the city tie-break always applies, never arbitrary order.
pub fn city_activity_matrix(
    records: &[DemandRecord],
    selected_clients: &[String],
) -> Vec<CityActivityRow> {
    // city -> client -> area -> summed score
    let mut groups: BTreeMap<&str, BTreeMap<&str, BTreeMap<&str, u64>>> = BTreeMap::new();
    for record in records {
        if !selected_clients.iter().any(|c| c == &record.client) {
            continue;
        }
        *groups
            .entry(&record.city)
            .or_default()
            .entry(&record.client)
            .or_default()
            .entry(&record.area)
            .or_default() += u64::from(record.demand_score);
    }

    let mut out = Vec::new();
    for (city, per_client) in groups {
        let mut presence = BTreeMap::new();
        let mut top_area = BTreeMap::new();
        let mut active_count = 0;

        for client in selected_clients {
            match per_client.get(client.as_str()) {
                Some(areas) => {
                    presence.insert(client.clone(), true);
                    active_count += 1;
                    // Highest sum wins; BTreeMap iteration makes the
                    // alphabetically-first area win strict ties
                    if let Some((area, _)) = areas
                        .iter()
                        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
                    {
                        top_area.insert(client.clone(), area.to_string());
                    }
                }
                None => {
                    presence.insert(client.clone(), false);
                }
            }
        }

        out.push(CityActivityRow {
            city: city.to_string(),
            presence,
            top_area,
            active_count,
        });
    }

    out.sort_by(|a, b| b.active_count.cmp(&a.active_count).then(a.city.cmp(&b.city)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(client: &str, city: &str, area: &str, score: u32) -> DemandRecord {
        DemandRecord::new(
            format!("{}-{}-{}", client, city, area),
            client,
            city,
            area,
            score,
            Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_city_demand_sums_and_sorts() {
        let records = vec![
            record("apex", "Lisbon", "Alfama", 5),
            record("borealis", "Lisbon", "Baixa", 3),
            record("apex", "Porto", "Foz", 10),
        ];
        let out = city_demand(&records);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].city, "Porto");
        assert_eq!(out[0].total_demand, 10);
        assert_eq!(out[1].city, "Lisbon");
        assert_eq!(out[1].total_demand, 8);
    }

    #[test]
    fn test_city_demand_sum_invariant() {
        let records = vec![
            record("apex", "Lisbon", "Alfama", 5),
            record("borealis", "Porto", "Foz", 3),
            record("cinder", "Faro", "Centro", 11),
        ];
        let total: u64 = city_demand(&records).iter().map(|c| c.total_demand).sum();
        let expected: u64 = records.iter().map(|r| u64::from(r.demand_score)).sum();
        assert_eq!(total, expected);
    }

    #[test]
    fn test_client_demand_groups_by_client() {
        let records = vec![
            record("apex", "Lisbon", "Alfama", 5),
            record("apex", "Porto", "Foz", 2),
            record("borealis", "Lisbon", "Baixa", 4),
        ];
        let out = client_demand(&records);
        assert_eq!(out[0].client, "apex");
        assert_eq!(out[0].total_demand, 7);
        assert_eq!(out[1].client, "borealis");
    }

    #[test]
    fn test_area_demand_collects_contributing_clients() {
        let records = vec![
            record("apex", "Lisbon", "Alfama", 5),
            record("borealis", "Lisbon", "Alfama", 1),
            record("apex", "Lisbon", "Baixa", 2),
        ];
        let out = area_demand(&records);
        assert_eq!(out[0].area, "Alfama");
        assert_eq!(out[0].total_demand, 6);
        assert_eq!(
            out[0].clients.iter().collect::<Vec<_>>(),
            vec!["apex", "borealis"]
        );
        assert_eq!(out[1].clients.len(), 1);
    }

    #[test]
    fn test_hotspot_requires_per_client_threshold() {
        // A scores 10, B scores 3: only A is active, so no hotspot
        let records = vec![
            record("a", "X", "Area1", 10),
            record("b", "X", "Area2", 3),
        ];
        assert!(multi_client_hotspots(&records, 2, 5).is_empty());

        // Raising B to 5 makes X a hotspot with both clients active
        let records = vec![
            record("a", "X", "Area1", 10),
            record("b", "X", "Area2", 5),
        ];
        let out = multi_client_hotspots(&records, 2, 5);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].active_clients, vec!["a", "b"]);
        assert_eq!(out[0].total_demand, 15);
    }

    #[test]
    fn test_hotspot_total_excludes_inactive_clients() {
        let records = vec![
            record("a", "X", "Area1", 10),
            record("b", "X", "Area2", 6),
            record("c", "X", "Area3", 2),
        ];
        let out = multi_client_hotspots(&records, 2, 5);
        assert_eq!(out[0].client_count, 2);
        // c's 2 points counted for neither the threshold pass nor the total
        assert_eq!(out[0].total_demand, 16);
    }

    #[test]
    fn test_hotspot_sort_client_count_then_demand() {
        let records = vec![
            record("a", "X", "A1", 5),
            record("b", "X", "A2", 5),
            record("a", "Y", "B1", 50),
            record("b", "Y", "B2", 50),
            record("c", "Y", "B3", 50),
        ];
        let out = multi_client_hotspots(&records, 2, 5);
        assert_eq!(out[0].city, "Y");
        assert_eq!(out[1].city, "X");
    }

    #[test]
    fn test_matrix_presence_and_top_area() {
        let selected = vec!["apex".to_string(), "borealis".to_string()];
        let records = vec![
            record("apex", "Lisbon", "Alfama", 2),
            record("apex", "Lisbon", "Baixa", 7),
            record("borealis", "Porto", "Foz", 4),
        ];
        let out = city_activity_matrix(&records, &selected);

        let lisbon = out.iter().find(|r| r.city == "Lisbon").unwrap();
        assert_eq!(lisbon.presence["apex"], true);
        assert_eq!(lisbon.presence["borealis"], false);
        assert_eq!(lisbon.top_area["apex"], "Baixa");
        assert_eq!(lisbon.active_count, 1);
    }

    #[test]
    fn test_matrix_top_area_alphabetical_tie_break() {
        let selected = vec!["apex".to_string()];
        let records = vec![
            record("apex", "Lisbon", "Zeta", 5),
            record("apex", "Lisbon", "Alfa", 5),
        ];
        let out = city_activity_matrix(&records, &selected);
        assert_eq!(out[0].top_area["apex"], "Alfa");
    }

    #[test]
    fn test_matrix_rows_tie_break_on_city_name() {
        let selected = vec!["apex".to_string()];
        let records = vec![
            record("apex", "Porto", "Foz", 1),
            record("apex", "Lisbon", "Alfama", 1),
        ];
        let out = city_activity_matrix(&records, &selected);
        // Equal active counts fall through to city name ascending
        assert_eq!(out[0].city, "Lisbon");
        assert_eq!(out[1].city, "Porto");
    }

    #[test]
    fn test_matrix_ignores_unselected_clients() {
        let selected = vec!["apex".to_string()];
        let records = vec![record("borealis", "Lisbon", "Alfama", 9)];
        assert!(city_activity_matrix(&records, &selected).is_empty());
    }

    #[test]
    fn test_empty_input_yields_empty_summaries() {
        let records: Vec<DemandRecord> = Vec::new();
        assert!(city_demand(&records).is_empty());
        assert!(client_demand(&records).is_empty());
        assert!(area_demand(&records).is_empty());
        assert!(multi_client_hotspots(&records, 1, 1).is_empty());
        assert!(city_activity_matrix(&records, &["apex".to_string()]).is_empty());
    }
}
