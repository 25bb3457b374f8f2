//! Pipeline runner: extract -> clean -> KPIs -> load -> quality gate.
//!
//! Strictly sequential, no stage overlap and no internal retries; retrying
//! a failed run is the caller's job (see `jobs::etl_sync`). Fatal errors
//! carry the violated invariant so a failed run names what broke instead of
//! failing generically.

use chrono::Utc;
use sea_orm::{DatabaseConnection, DbErr};

use crate::config::Config;
use crate::models::market::LoadMode;
use crate::pipeline::clean::clean_snapshots;
use crate::pipeline::kpis::calculate_kpis;
use crate::pipeline::load::{load, LoadReport};
use crate::pipeline::quality::{run_all_checks, QualityCheckError, QualityReport};
use crate::services::extractor::{extract_all_coins, MarketDataSource};

#[derive(Debug)]
pub enum PipelineError {
    /// The feed produced nothing usable; aborts before the cleaner runs.
    ExtractionEmpty,
    /// One target table took rows while the other errored; the stores no
    /// longer agree and the run must fail visibly.
    TablesDesynchronized { prices: String, metrics: String },
    /// A hard quality check fired after load.
    Quality(QualityCheckError),
    Database(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::ExtractionEmpty => write!(f, "no data extracted from the market feed"),
            PipelineError::TablesDesynchronized { prices, metrics } => write!(
                f,
                "target tables desynchronized: prices [{}], metrics [{}]",
                prices, metrics
            ),
            PipelineError::Quality(e) => write!(f, "quality gate failure: {}", e),
            PipelineError::Database(msg) => write!(f, "database error: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<DbErr> for PipelineError {
    fn from(e: DbErr) -> Self {
        PipelineError::Database(e.to_string())
    }
}

impl From<QualityCheckError> for PipelineError {
    fn from(e: QualityCheckError) -> Self {
        PipelineError::Quality(e)
    }
}

/// Counts and outcomes from one completed run.
#[derive(Debug)]
pub struct PipelineSummary {
    pub raw_rows: usize,
    pub cleaned_rows: usize,
    pub load: LoadReport,
    pub quality: QualityReport,
}

/// Run the whole pipeline once against `db`, in `mode`.
pub async fn run_pipeline(
    db: &DatabaseConnection,
    source: &dyn MarketDataSource,
    config: &Config,
    mode: LoadMode,
) -> Result<PipelineSummary, PipelineError> {
    tracing::info!("--- Starting ETL pipeline ({}) ---", mode);

    tracing::info!("[Step 1] Extracting market data");
    let raw = extract_all_coins(source, config).await;
    tracing::info!("Extracted {} raw snapshots", raw.len());
    if raw.is_empty() {
        return Err(PipelineError::ExtractionEmpty);
    }
    let raw_rows = raw.len();

    tracing::info!("[Step 2a] Cleaning data");
    let cleaned = clean_snapshots(raw);
    tracing::info!("{} cleaned records", cleaned.len());

    tracing::info!("[Step 2b] Calculating KPIs");
    let enriched = calculate_kpis(cleaned);

    for record in enriched.iter().rev().take(5).rev() {
        tracing::debug!(
            "{} {} price={:.4} profitability_30d={:.2}% volatility_30d={:.2}%",
            record.coin_id,
            record.date,
            record.price,
            record.profitability_30d,
            record.volatility_30d
        );
    }

    tracing::info!("[Step 3] Loading data");
    let cleaned_rows = enriched.len();
    let report = load(db, &enriched, mode).await?;
    tracing::info!(
        "Load done: {} of {} rows selected, prices {}/{}, metrics {}/{}",
        report.rows_selected,
        report.rows_considered,
        report.prices.inserted,
        report.prices.attempted,
        report.metrics.inserted,
        report.metrics.attempted
    );

    if report.is_desynchronized() {
        let describe = |o: &crate::pipeline::load::TableOutcome| match &o.error {
            Some(e) => format!("{}/{} inserted, error: {}", o.inserted, o.attempted, e),
            None => format!("{}/{} inserted", o.inserted, o.attempted),
        };
        return Err(PipelineError::TablesDesynchronized {
            prices: describe(&report.prices),
            metrics: describe(&report.metrics),
        });
    }

    tracing::info!("[Step 4] Running data quality checks");
    let quality = run_all_checks(db, Utc::now().date_naive()).await?;

    tracing::info!("--- Pipeline completed successfully ---");
    Ok(PipelineSummary {
        raw_rows,
        cleaned_rows,
        load: report,
        quality,
    })
}
