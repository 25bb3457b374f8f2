//! In-flight market data types, passed between pipeline stages.

use chrono::NaiveDate;

/// How the load stage writes into the target tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Truncate both tables, then insert everything.
    FullRefresh,
    /// Append only rows strictly newer than the newest persisted day.
    Incremental,
}

impl std::fmt::Display for LoadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadMode::FullRefresh => write!(f, "full refresh"),
            LoadMode::Incremental => write!(f, "incremental"),
        }
    }
}

/// One per-instant observation as the feed delivers it. Values may be
/// absent; the cleaner decides what to do with incomplete snapshots.
#[derive(Debug, Clone)]
pub struct RawSnapshot {
    pub coin_id: String,
    /// Milliseconds since the Unix epoch, UTC.
    pub timestamp_ms: i64,
    pub price: Option<f64>,
    pub volume: Option<f64>,
    pub market_cap: Option<f64>,
}

/// One complete observation per (coin, day), output of the cleaning stage.
#[derive(Debug, Clone)]
pub struct CleanedRecord {
    pub coin_id: String,
    pub date: NaiveDate,
    pub price: f64,
    pub volume: f64,
    pub market_cap: f64,
}

/// A cleaned record plus its derived metrics. Percentage metrics are
/// expressed as percentages (x100); `daily_return` stays a plain ratio.
#[derive(Debug, Clone)]
pub struct EnrichedRecord {
    pub coin_id: String,
    pub date: NaiveDate,
    pub price: f64,
    pub volume: f64,
    pub market_cap: f64,
    pub daily_return: f64,
    pub price_change_24h: f64,
    pub price_change_7d: f64,
    pub price_change_30d: f64,
    pub market_cap_change_24h: f64,
    pub market_cap_change_7d: f64,
    pub market_cap_change_30d: f64,
    pub volume_change_24h: f64,
    pub volume_change_7d: f64,
    pub volume_change_30d: f64,
    pub profitability_30d: f64,
    pub volatility_30d: f64,
}
