//! Scheduled ETL job: runs the pipeline daily in incremental mode.
//!
//! This is the workflow-scheduler collaborator. Retries live here, at the
//! run level, not inside the pipeline core.

use sea_orm::DatabaseConnection;
use tokio::time::{interval, Duration};

use crate::config::Config;
use crate::models::market::LoadMode;
use crate::pipeline::runner::run_pipeline;
use crate::services::coingecko::CoinGeckoService;

/// At most one retry per scheduled run.
const MAX_RETRIES: u32 = 1;

pub async fn start_etl_sync_job(
    db: DatabaseConnection,
    coingecko: CoinGeckoService,
    config: Config,
) {
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(86400)); // Daily

        loop {
            interval.tick().await;
            tracing::info!("Starting scheduled ETL run (incremental)");
            run_with_retry(&db, &coingecko, &config).await;
        }
    });
}

async fn run_with_retry(db: &DatabaseConnection, coingecko: &CoinGeckoService, config: &Config) {
    for attempt in 0..=MAX_RETRIES {
        match run_pipeline(db, coingecko, config, LoadMode::Incremental).await {
            Ok(summary) => {
                tracing::info!(
                    "Scheduled ETL run complete: {} rows selected, {} prices inserted",
                    summary.load.rows_selected,
                    summary.load.prices.inserted
                );
                return;
            }
            Err(e) if attempt < MAX_RETRIES => {
                tracing::warn!("ETL run failed (attempt {}), retrying: {}", attempt + 1, e);
            }
            Err(e) => {
                tracing::error!("ETL run failed after {} attempts: {}", attempt + 1, e);
            }
        }
    }
}
