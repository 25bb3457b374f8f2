//! Extraction collaborator: pulls raw snapshots for every tracked coin.

use async_trait::async_trait;
use tokio::time::{sleep, Duration};

use crate::config::Config;
use crate::models::market::RawSnapshot;

/// A provider of historical market observations for one coin.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_market_history(
        &self,
        coin_id: &str,
        vs_currency: &str,
        days: u32,
    ) -> Result<Vec<RawSnapshot>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Fetch snapshots for every configured coin, pacing calls to stay inside
/// the provider's rate limits. A coin that fails contributes nothing; total
/// emptiness is the caller's problem (the runner treats it as fatal).
pub async fn extract_all_coins(source: &dyn MarketDataSource, config: &Config) -> Vec<RawSnapshot> {
    let mut all = Vec::new();

    for (index, coin_id) in config.coins.iter().enumerate() {
        match source
            .fetch_market_history(coin_id, &config.vs_currency, config.days_to_fetch)
            .await
        {
            Ok(snapshots) => {
                tracing::info!("Extracted {} snapshots for {}", snapshots.len(), coin_id);
                all.extend(snapshots);
            }
            Err(e) => {
                tracing::warn!("Failed to extract data for {}: {}", coin_id, e);
            }
        }

        if index + 1 < config.coins.len() && config.fetch_pause_ms > 0 {
            sleep(Duration::from_millis(config.fetch_pause_ms)).await;
        }
    }

    all
}
