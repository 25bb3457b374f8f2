//! Long-running scheduler: daily incremental ETL runs with one retry each.

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crypto_etl::config::Config;
use crypto_etl::jobs::etl_sync::start_etl_sync_job;
use crypto_etl::services::coingecko::CoinGeckoService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;

    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None).await?;

    let coingecko = CoinGeckoService::new(
        config.coingecko_api_key.clone(),
        config.coingecko_base_url.clone(),
    );

    tracing::info!("Starting daily ETL sync job");
    start_etl_sync_job(db, coingecko, config).await;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    Ok(())
}
