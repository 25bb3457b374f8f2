use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crypto_etl::config::Config;
use crypto_etl::models::market::LoadMode;
use crypto_etl::pipeline::runner::run_pipeline;
use crypto_etl::services::coingecko::CoinGeckoService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Usage: crypto-etl [--incremental]
    let mode = if std::env::args().any(|arg| arg == "--incremental") {
        LoadMode::Incremental
    } else {
        LoadMode::FullRefresh
    };

    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;

    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None).await?;

    let coingecko = CoinGeckoService::new(
        config.coingecko_api_key.clone(),
        config.coingecko_base_url.clone(),
    );

    match run_pipeline(&db, &coingecko, &config, mode).await {
        Ok(summary) => {
            tracing::info!(
                "Run finished: {} raw rows, {} cleaned, {} loaded ({} distinct coins in store)",
                summary.raw_rows,
                summary.cleaned_rows,
                summary.load.rows_selected,
                summary.quality.distinct_coins
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Pipeline failed: {}", e);
            std::process::exit(1);
        }
    }
}
