//! Pipeline configuration.
//!
//! Built once in `main` from the process environment and passed into each
//! component explicitly. Nothing reads the environment mid-pipeline.

use std::env;

/// Default tracked universe when ETL_COINS is not set.
const DEFAULT_COINS: &[&str] = &[
    "bitcoin",
    "ethereum",
    "cardano",
    "binancecoin",
    "uniswap",
    "ripple",
    "solana",
    "polkadot",
    "dogecoin",
];

/// Free-tier CoinGecko caps market_chart history at 365 days.
const DEFAULT_DAYS_TO_FETCH: u32 = 365;

#[derive(Debug, Clone)]
pub struct Config {
    /// CoinGecko coin ids to track.
    pub coins: Vec<String>,
    /// Lookback window, in days, requested from the feed.
    pub days_to_fetch: u32,
    /// Quote currency for prices/volumes/market caps.
    pub vs_currency: String,
    pub database_url: String,
    pub coingecko_base_url: String,
    /// Optional pro API key; the free tier works without one.
    pub coingecko_api_key: Option<String>,
    /// Pause between per-coin feed calls, to stay inside rate limits.
    pub fetch_pause_ms: u64,
}

impl Config {
    /// Read configuration from the environment. `DATABASE_URL` wins when set,
    /// otherwise the URL is assembled from DB_USER/DB_PASSWORD/DB_HOST/
    /// DB_PORT/DB_NAME with local-development defaults.
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            let user = env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string());
            let password = env::var("DB_PASSWORD").unwrap_or_else(|_| "postgres".to_string());
            let host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
            let port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
            let name = env::var("DB_NAME").unwrap_or_else(|_| "crypto_db".to_string());
            format!("postgres://{}:{}@{}:{}/{}", user, password, host, port, name)
        });

        let coins = match env::var("ETL_COINS") {
            Ok(raw) => raw
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            Err(_) => DEFAULT_COINS.iter().map(|c| c.to_string()).collect(),
        };

        let days_to_fetch = env::var("ETL_DAYS")
            .ok()
            .and_then(|d| d.parse().ok())
            .unwrap_or(DEFAULT_DAYS_TO_FETCH);

        Self {
            coins,
            days_to_fetch,
            vs_currency: env::var("ETL_VS_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            database_url,
            coingecko_base_url: env::var("COINGECKO_BASE_URL")
                .unwrap_or_else(|_| "https://api.coingecko.com/api/v3".to_string()),
            coingecko_api_key: env::var("COINGECKO_API_KEY").ok(),
            fetch_pause_ms: env::var("ETL_FETCH_PAUSE_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_universe_has_nine_coins() {
        assert_eq!(DEFAULT_COINS.len(), 9);
        assert!(DEFAULT_COINS.contains(&"bitcoin"));
    }
}
