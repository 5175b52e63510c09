//! Report commands for demand-cli
//!
//! Reports read the local cache only; run a sync first to refresh it.

use crate::aggregate;
use crate::error::Result;

use super::{open_cache, resolve_date};

/// Demand by city for one date
pub async fn city(date: Option<String>, cache_path: Option<String>) -> Result<()> {
    let date = resolve_date(date)?;
    let records = open_cache(cache_path)?.query_by_date(date)?;
    let rows = aggregate::city_demand(&records);

    println!("Demand by City ({})", date);
    println!("{}", "-".repeat(40));
    if rows.is_empty() {
        println!("No cached records for this date");
        return Ok(());
    }
    for row in rows {
        println!("{:<28} {:>10}", row.city, row.total_demand);
    }
    Ok(())
}

/// Demand by client for one date
pub async fn client(date: Option<String>, cache_path: Option<String>) -> Result<()> {
    let date = resolve_date(date)?;
    let records = open_cache(cache_path)?.query_by_date(date)?;
    let rows = aggregate::client_demand(&records);

    println!("Demand by Client ({})", date);
    println!("{}", "-".repeat(40));
    if rows.is_empty() {
        println!("No cached records for this date");
        return Ok(());
    }
    for row in rows {
        println!("{:<28} {:>10}", row.client, row.total_demand);
    }
    Ok(())
}

/// Demand by city/area for one date
pub async fn area(date: Option<String>, cache_path: Option<String>) -> Result<()> {
    let date = resolve_date(date)?;
    let records = open_cache(cache_path)?.query_by_date(date)?;
    let rows = aggregate::area_demand(&records);

    println!("Demand by Area ({})", date);
    println!("{}", "-".repeat(60));
    if rows.is_empty() {
        println!("No cached records for this date");
        return Ok(());
    }
    for row in rows {
        let clients: Vec<&str> = row.clients.iter().map(|s| s.as_str()).collect();
        println!(
            "{:<18} {:<18} {:>8}  [{}]",
            row.city,
            row.area,
            row.total_demand,
            clients.join(", ")
        );
    }
    Ok(())
}

/// Cities where several clients independently show strong demand
pub async fn hotspots(
    date: Option<String>,
    min_clients: usize,
    min_demand: u64,
    cache_path: Option<String>,
) -> Result<()> {
    let date = resolve_date(date)?;
    let records = open_cache(cache_path)?.query_by_date(date)?;
    let rows = aggregate::multi_client_hotspots(&records, min_clients, min_demand);

    println!(
        "Multi-Client Hotspots ({}, >= {} clients at >= {} demand)",
        date, min_clients, min_demand
    );
    println!("{}", "-".repeat(60));
    if rows.is_empty() {
        println!("No hotspots for this date");
        return Ok(());
    }
    for row in rows {
        println!(
            "{:<18} {:>2} clients {:>8}  [{}]",
            row.city,
            row.client_count,
            row.total_demand,
            row.active_clients.join(", ")
        );
    }
    Ok(())
}

/// City x client activity matrix for one date
pub async fn matrix(
    date: Option<String>,
    clients: Vec<String>,
    cache_path: Option<String>,
) -> Result<()> {
    let date = resolve_date(date)?;
    let records = open_cache(cache_path)?.query_by_date(date)?;
    let rows = aggregate::city_activity_matrix(&records, &clients);

    println!("City Activity Matrix ({})", date);
    println!("{}", "-".repeat(60));
    if rows.is_empty() {
        println!("No cached records for the selected clients on this date");
        return Ok(());
    }
    for row in rows {
        println!("{} ({} active)", row.city, row.active_count);
        for client in &clients {
            let present = row.presence.get(client).copied().unwrap_or(false);
            if present {
                let top = row
                    .top_area
                    .get(client)
                    .map(|a| a.as_str())
                    .unwrap_or("-");
                println!("  {:<12} present   top area: {}", client, top);
            } else {
                println!("  {:<12} -", client);
            }
        }
    }
    Ok(())
}
