//! Quality gate: fixed battery of checks against the persisted store.
//!
//! Runs after every load, whatever the mode. Checks execute in a fixed
//! order and the first hard failure aborts the run immediately; the
//! asset-diversity check is soft and only logs a warning.

use chrono::NaiveDate;
use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, FromQueryResult, Statement};

/// Freshness tolerance: the newest persisted day may lag "today" by at
/// most this many days.
const MAX_DAYS_LAG: i64 = 2;

/// Soft minimum number of distinct coins expected in the store.
const MIN_DISTINCT_COINS: i64 = 5;

/// A violated quality check, carrying the measured value that tripped it.
#[derive(Debug)]
pub enum QualityCheckError {
    /// Hard: the price table holds no rows at all.
    EmptyPricesTable,
    /// Hard: newest persisted day is too far in the past.
    StaleData {
        last_date: NaiveDate,
        days_stale: i64,
    },
    /// Hard: rows with NULL price/volume/market_cap exist.
    NullCriticalColumns { null_rows: i64 },
    /// Hard: some (coin, price_timestamp) group has more than one row.
    DuplicateRows {
        groups: Vec<(String, NaiveDate, i64)>,
    },
    /// Infrastructure failure while probing the store.
    Database(String),
}

impl std::fmt::Display for QualityCheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityCheckError::EmptyPricesTable => {
                write!(f, "non-empty check failed: cryptocurrency_prices has 0 rows")
            }
            QualityCheckError::StaleData {
                last_date,
                days_stale,
            } => write!(
                f,
                "freshness check failed: newest price_timestamp is {} ({} days stale, max {})",
                last_date, days_stale, MAX_DAYS_LAG
            ),
            QualityCheckError::NullCriticalColumns { null_rows } => write!(
                f,
                "non-null critical columns check failed: {} rows with NULL price/volume/market_cap",
                null_rows
            ),
            QualityCheckError::DuplicateRows { groups } => write!(
                f,
                "no-duplicates check failed: {} duplicated (coin, price_timestamp) groups, e.g. {:?}",
                groups.len(),
                groups.first()
            ),
            QualityCheckError::Database(msg) => write!(f, "quality check database error: {}", msg),
        }
    }
}

impl std::error::Error for QualityCheckError {}

impl From<DbErr> for QualityCheckError {
    fn from(e: DbErr) -> Self {
        QualityCheckError::Database(e.to_string())
    }
}

/// Measured values from a passing gate run.
#[derive(Debug, Clone)]
pub struct QualityReport {
    pub row_count: i64,
    pub last_date: NaiveDate,
    pub days_stale: i64,
    pub distinct_coins: i64,
    /// False when the soft diversity check fired (warning only).
    pub diversity_ok: bool,
}

/// Run every check, in order, against the persisted store. `today` is the
/// caller's reference day for the freshness check.
pub async fn run_all_checks(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<QualityReport, QualityCheckError> {
    tracing::info!("Running data quality checks");

    let row_count = check_non_empty(db).await?;
    let (last_date, days_stale) = check_freshness(db, today).await?;
    check_no_nulls(db).await?;
    check_no_duplicates(db).await?;
    let (distinct_coins, diversity_ok) = check_asset_diversity(db).await?;

    tracing::info!(
        "All hard quality checks passed ({} rows, newest {}, {} coins)",
        row_count,
        last_date,
        distinct_coins
    );

    Ok(QualityReport {
        row_count,
        last_date,
        days_stale,
        distinct_coins,
        diversity_ok,
    })
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    count: i64,
}

async fn scalar_count(db: &DatabaseConnection, sql: &str) -> Result<i64, QualityCheckError> {
    let row = CountRow::find_by_statement(Statement::from_string(
        DatabaseBackend::Postgres,
        sql.to_string(),
    ))
    .one(db)
    .await?;

    Ok(row.map_or(0, |r| r.count))
}

async fn check_non_empty(db: &DatabaseConnection) -> Result<i64, QualityCheckError> {
    let count = scalar_count(db, "SELECT COUNT(*) AS count FROM cryptocurrency_prices").await?;
    if count == 0 {
        return Err(QualityCheckError::EmptyPricesTable);
    }
    tracing::info!("PASSED: price table holds {} rows", count);
    Ok(count)
}

async fn check_freshness(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<(NaiveDate, i64), QualityCheckError> {
    #[derive(Debug, FromQueryResult)]
    struct MaxDate {
        max_date: Option<NaiveDate>,
    }

    let row = MaxDate::find_by_statement(Statement::from_string(
        DatabaseBackend::Postgres,
        "SELECT MAX(price_timestamp) AS max_date FROM cryptocurrency_prices",
    ))
    .one(db)
    .await?;

    // The non-empty check runs first, so an absent max here means the table
    // emptied between probes. Treat it the same way.
    let last_date = row
        .and_then(|r| r.max_date)
        .ok_or(QualityCheckError::EmptyPricesTable)?;

    let days_stale = (today - last_date).num_days();
    if days_stale > MAX_DAYS_LAG {
        return Err(QualityCheckError::StaleData {
            last_date,
            days_stale,
        });
    }

    tracing::info!("PASSED: data is fresh (newest: {})", last_date);
    Ok((last_date, days_stale))
}

async fn check_no_nulls(db: &DatabaseConnection) -> Result<(), QualityCheckError> {
    let null_rows = scalar_count(
        db,
        "SELECT COUNT(*) AS count FROM cryptocurrency_prices \
         WHERE price IS NULL OR volume IS NULL OR market_cap IS NULL",
    )
    .await?;

    if null_rows > 0 {
        return Err(QualityCheckError::NullCriticalColumns { null_rows });
    }
    tracing::info!("PASSED: no NULLs in critical columns");
    Ok(())
}

async fn check_no_duplicates(db: &DatabaseConnection) -> Result<(), QualityCheckError> {
    #[derive(Debug, FromQueryResult)]
    struct DuplicateGroup {
        coin: String,
        price_timestamp: NaiveDate,
        dup_count: i64,
    }

    let groups = DuplicateGroup::find_by_statement(Statement::from_string(
        DatabaseBackend::Postgres,
        "SELECT coin, price_timestamp, COUNT(*) AS dup_count \
         FROM cryptocurrency_prices \
         GROUP BY coin, price_timestamp \
         HAVING COUNT(*) > 1 \
         LIMIT 5",
    ))
    .all(db)
    .await?;

    if !groups.is_empty() {
        return Err(QualityCheckError::DuplicateRows {
            groups: groups
                .into_iter()
                .map(|g| (g.coin, g.price_timestamp, g.dup_count))
                .collect(),
        });
    }
    tracing::info!("PASSED: no duplicate (coin, price_timestamp) rows");
    Ok(())
}

async fn check_asset_diversity(db: &DatabaseConnection) -> Result<(i64, bool), QualityCheckError> {
    let distinct_coins = scalar_count(
        db,
        "SELECT COUNT(DISTINCT coin) AS count FROM cryptocurrency_prices",
    )
    .await?;

    let diversity_ok = distinct_coins >= MIN_DISTINCT_COINS;
    if diversity_ok {
        tracing::info!("PASSED: {} distinct coins tracked", distinct_coins);
    } else {
        tracing::warn!(
            "Quality warning: only {} distinct coins tracked (expected >= {})",
            distinct_coins,
            MIN_DISTINCT_COINS
        );
    }
    Ok((distinct_coins, diversity_ok))
}
