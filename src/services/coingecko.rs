use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::models::market::RawSnapshot;
use crate::services::extractor::MarketDataSource;

#[derive(Clone)]
pub struct CoinGeckoService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    cache: Arc<Cache<String, Vec<RawSnapshot>>>,
}

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<[f64; 2]>,
    #[serde(default)]
    market_caps: Vec<[f64; 2]>,
    #[serde(default)]
    total_volumes: Vec<[f64; 2]>,
}

impl CoinGeckoService {
    pub fn new(api_key: Option<String>, base_url: String) -> Self {
        let cache = Cache::builder()
            .max_capacity(100) // Store up to 100 different coins
            .time_to_live(Duration::from_secs(3600)) // 1 hour TTL
            .build();

        Self {
            client: Client::new(),
            api_key,
            base_url,
            cache: Arc::new(cache),
        }
    }

    /// GET /coins/{id}/market_chart, zipped into one snapshot per sample
    /// instant. The three series align positionally; volume and market cap
    /// entries missing at an index are left unset and handled downstream.
    pub async fn get_market_chart(
        &self,
        coin_id: &str,
        vs_currency: &str,
        days: u32,
    ) -> Result<Vec<RawSnapshot>, Box<dyn std::error::Error + Send + Sync>> {
        let cache_key = format!("{}_{}_{}", coin_id, vs_currency, days);

        if let Some(cached) = self.cache.get(&cache_key).await {
            tracing::debug!("Cache hit for {}", cache_key);
            return Ok(cached);
        }

        tracing::info!("Fetching market chart for {} from CoinGecko", coin_id);

        let url = format!("{}/coins/{}/market_chart", self.base_url, coin_id);

        let mut request = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .query(&[
                ("vs_currency", vs_currency),
                ("days", &days.to_string()),
                ("interval", "daily"),
            ]);

        if let Some(api_key) = &self.api_key {
            request = request.header("x-cg-pro-api-key", api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(format!("CoinGecko API error {}: {}", status, error_text).into());
        }

        let data: MarketChartResponse = response.json().await?;

        let snapshots: Vec<RawSnapshot> = data
            .prices
            .iter()
            .enumerate()
            .map(|(i, sample)| RawSnapshot {
                coin_id: coin_id.to_string(),
                timestamp_ms: sample[0] as i64,
                price: Some(sample[1]),
                volume: data.total_volumes.get(i).map(|v| v[1]),
                market_cap: data.market_caps.get(i).map(|m| m[1]),
            })
            .collect();

        tracing::debug!("Fetched {} samples for {}", snapshots.len(), coin_id);

        self.cache.insert(cache_key, snapshots.clone()).await;

        Ok(snapshots)
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoService {
    async fn fetch_market_history(
        &self,
        coin_id: &str,
        vs_currency: &str,
        days: u32,
    ) -> Result<Vec<RawSnapshot>, Box<dyn std::error::Error + Send + Sync>> {
        self.get_market_chart(coin_id, vs_currency, days).await
    }
}
