//! Cleaning stage: raw per-instant snapshots -> daily-granularity records.

use std::collections::HashSet;

use chrono::DateTime;

use crate::models::market::{CleanedRecord, RawSnapshot};

/// Normalize raw snapshots into one record per (coin, day).
///
/// Steps, in order: truncate each timestamp to its UTC day, drop duplicate
/// (coin, day) pairs keeping the first occurrence in input order, drop
/// records missing price/volume/market cap, then sort ascending by
/// (coin, day). Empty input yields empty output.
pub fn clean_snapshots(raw: Vec<RawSnapshot>) -> Vec<CleanedRecord> {
    let mut seen: HashSet<(String, chrono::NaiveDate)> = HashSet::new();
    let mut cleaned = Vec::with_capacity(raw.len());

    for snapshot in raw {
        let date = match DateTime::from_timestamp_millis(snapshot.timestamp_ms) {
            Some(dt) => dt.date_naive(),
            None => {
                tracing::warn!(
                    "Dropping snapshot for {} with out-of-range timestamp {}",
                    snapshot.coin_id,
                    snapshot.timestamp_ms
                );
                continue;
            }
        };

        // A duplicate consumes its (coin, day) slot even if it is then
        // dropped for missing fields. Dedup runs before the missing-field
        // filter, matching the stage order.
        if !seen.insert((snapshot.coin_id.clone(), date)) {
            continue;
        }

        let (price, volume, market_cap) =
            match (snapshot.price, snapshot.volume, snapshot.market_cap) {
                (Some(p), Some(v), Some(m)) => (p, v, m),
                _ => continue,
            };

        cleaned.push(CleanedRecord {
            coin_id: snapshot.coin_id,
            date,
            price,
            volume,
            market_cap,
        });
    }

    cleaned.sort_by(|a, b| (a.coin_id.as_str(), a.date).cmp(&(b.coin_id.as_str(), b.date)));
    cleaned
}
