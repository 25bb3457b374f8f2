//! Load stage: persist enriched records into the two target tables.
//!
//! Supports a full refresh (truncate, then insert everything) and an
//! incremental append (insert only rows dated after the global max already
//! persisted). Writes to the two tables are independent: a failure on one
//! does not prevent the attempt on the other, and the per-table outcome is
//! reported back to the caller instead of being swallowed here.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, EntityTrait,
    FromQueryResult, Insert, IntoActiveModel, Set, Statement,
};

use crate::entities::{cryptocurrency_metrics, cryptocurrency_prices};
use crate::models::market::{EnrichedRecord, LoadMode};

/// Batch size for multi-row inserts.
const INSERT_CHUNK_SIZE: usize = 1000;

/// What happened to one target table during a load.
#[derive(Debug, Clone)]
pub struct TableOutcome {
    pub table: &'static str,
    pub attempted: usize,
    pub inserted: usize,
    pub error: Option<String>,
}

impl TableOutcome {
    fn skipped(table: &'static str) -> Self {
        Self {
            table,
            attempted: 0,
            inserted: 0,
            error: None,
        }
    }
}

/// Result of one dispatcher run. The runner decides whether a partial
/// failure is run-fatal; the dispatcher only records what happened.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub mode: LoadMode,
    /// Global incremental cutoff that was applied, if any.
    pub cutoff: Option<NaiveDate>,
    /// Rows handed to the dispatcher.
    pub rows_considered: usize,
    /// Rows surviving the incremental filter (everything, under full refresh).
    pub rows_selected: usize,
    pub prices: TableOutcome,
    pub metrics: TableOutcome,
}

impl LoadReport {
    /// True when the two tables no longer describe the same set of
    /// observation days: one errored while the other did not, or they
    /// committed a different number of rows (both can error, at different
    /// chunk offsets, and still diverge).
    pub fn is_desynchronized(&self) -> bool {
        self.prices.inserted != self.metrics.inserted
            || self.prices.error.is_some() != self.metrics.error.is_some()
    }
}

/// Persist `records` according to `mode`.
///
/// Full refresh truncates both tables (resetting identity numbering) and
/// inserts every record with row_index restarting at 0. Incremental reads
/// the global max persisted date, keeps only strictly newer records, and
/// continues row_index from the persisted maximum. An empty selection is
/// not an error; the dispatcher performs no writes and reports zero rows.
pub async fn load(
    db: &DatabaseConnection,
    records: &[EnrichedRecord],
    mode: LoadMode,
) -> Result<LoadReport, DbErr> {
    let (selected, cutoff, first_row_index) = match mode {
        LoadMode::FullRefresh => {
            tracing::info!("Load mode: FULL REFRESH, truncating target tables");
            truncate_tables(db).await?;
            (records.to_vec(), None, 0)
        }
        LoadMode::Incremental => {
            let cutoff = latest_loaded_date(db).await?;
            tracing::info!("Load mode: INCREMENTAL, global cutoff: {:?}", cutoff);

            let selected: Vec<EnrichedRecord> = match cutoff {
                Some(cutoff) => records.iter().filter(|r| r.date > cutoff).cloned().collect(),
                None => records.to_vec(),
            };

            if selected.is_empty() {
                tracing::info!("No rows newer than cutoff, skipping load");
                return Ok(LoadReport {
                    mode,
                    cutoff,
                    rows_considered: records.len(),
                    rows_selected: 0,
                    prices: TableOutcome::skipped("cryptocurrency_prices"),
                    metrics: TableOutcome::skipped("cryptocurrency_metrics"),
                });
            }

            let next = next_row_index(db).await?;
            (selected, cutoff, next)
        }
    };

    // Convert everything before touching either table so a bad value cannot
    // desynchronize them mid-batch.
    let price_models = price_models(&selected, first_row_index)?;
    let metric_models = metric_models(&selected)?;

    let prices = insert_chunked(db, "cryptocurrency_prices", price_models).await;
    let metrics = insert_chunked(db, "cryptocurrency_metrics", metric_models).await;

    Ok(LoadReport {
        mode,
        cutoff,
        rows_considered: records.len(),
        rows_selected: selected.len(),
        prices,
        metrics,
    })
}

async fn truncate_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.execute(Statement::from_string(
        DatabaseBackend::Postgres,
        "TRUNCATE TABLE cryptocurrency_prices, cryptocurrency_metrics RESTART IDENTITY",
    ))
    .await?;
    Ok(())
}

/// Global max persisted date, across all coins. A single scalar, not
/// per-coin; coins onboarded late can therefore be filtered out until the
/// next full refresh.
async fn latest_loaded_date(db: &DatabaseConnection) -> Result<Option<NaiveDate>, DbErr> {
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

    Ok(row.and_then(|r| r.max_date))
}

/// Next row_index to assign: one past the persisted maximum, or 0 when the
/// table is empty.
pub(crate) async fn next_row_index(db: &DatabaseConnection) -> Result<i32, DbErr> {
    #[derive(Debug, FromQueryResult)]
    struct MaxRowIndex {
        max_row_index: Option<i32>,
    }

    let row = MaxRowIndex::find_by_statement(Statement::from_string(
        DatabaseBackend::Postgres,
        "SELECT MAX(row_index) AS max_row_index FROM cryptocurrency_prices",
    ))
    .one(db)
    .await?;

    Ok(row.and_then(|r| r.max_row_index).map_or(0, |max| max + 1))
}

fn to_decimal(value: f64, field: &str, coin: &str) -> Result<Decimal, DbErr> {
    Decimal::from_f64_retain(value)
        .ok_or_else(|| DbErr::Custom(format!("Invalid {} value {} for {}", field, value, coin)))
}

fn price_models(
    records: &[EnrichedRecord],
    first_row_index: i32,
) -> Result<Vec<cryptocurrency_prices::ActiveModel>, DbErr> {
    records
        .iter()
        .enumerate()
        .map(|(offset, r)| {
            Ok(cryptocurrency_prices::ActiveModel {
                coin: Set(r.coin_id.clone()),
                price_timestamp: Set(r.date),
                price: Set(Some(to_decimal(r.price, "price", &r.coin_id)?)),
                volume: Set(Some(to_decimal(r.volume, "volume", &r.coin_id)?)),
                market_cap: Set(Some(to_decimal(r.market_cap, "market_cap", &r.coin_id)?)),
                row_index: Set(first_row_index + offset as i32),
                ..Default::default()
            })
        })
        .collect()
}

fn metric_models(
    records: &[EnrichedRecord],
) -> Result<Vec<cryptocurrency_metrics::ActiveModel>, DbErr> {
    records
        .iter()
        .map(|r| {
            let pct = |value: f64, field: &str| to_decimal(value, field, &r.coin_id).map(Some);
            Ok(cryptocurrency_metrics::ActiveModel {
                coin: Set(r.coin_id.clone()),
                price_timestamp: Set(r.date),
                price_change_24h: Set(pct(r.price_change_24h, "price_change_24h")?),
                price_change_7d: Set(pct(r.price_change_7d, "price_change_7d")?),
                price_change_30d: Set(pct(r.price_change_30d, "price_change_30d")?),
                market_cap_change_24h: Set(pct(r.market_cap_change_24h, "market_cap_change_24h")?),
                market_cap_change_7d: Set(pct(r.market_cap_change_7d, "market_cap_change_7d")?),
                market_cap_change_30d: Set(pct(r.market_cap_change_30d, "market_cap_change_30d")?),
                volume_change_24h: Set(pct(r.volume_change_24h, "volume_change_24h")?),
                volume_change_7d: Set(pct(r.volume_change_7d, "volume_change_7d")?),
                volume_change_30d: Set(pct(r.volume_change_30d, "volume_change_30d")?),
                ..Default::default()
            })
        })
        .collect()
}

/// Insert models in chunks, stopping at the first failed chunk for this
/// table only. The error is captured in the outcome, not raised, so the
/// other table still gets its attempt.
async fn insert_chunked<A>(
    db: &DatabaseConnection,
    table: &'static str,
    models: Vec<A>,
) -> TableOutcome
where
    A: ActiveModelTrait + Clone,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    let attempted = models.len();
    let mut inserted = 0;
    let mut error = None;

    for chunk in models.chunks(INSERT_CHUNK_SIZE) {
        // exec_without_returning: nothing reads the generated ids, and it
        // keeps Postgres from appending a RETURNING clause to the insert.
        match Insert::<A>::many(chunk.to_vec()).exec_without_returning(db).await {
            Ok(_) => inserted += chunk.len(),
            Err(e) => {
                tracing::error!("Error loading {} (likely duplicates): {}", table, e);
                error = Some(e.to_string());
                break;
            }
        }
    }

    if error.is_none() {
        tracing::info!("Loaded {} rows into {}", inserted, table);
    }

    TableOutcome {
        table,
        attempted,
        inserted,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;

    fn record(coin: &str, date: NaiveDate, price: f64) -> EnrichedRecord {
        EnrichedRecord {
            coin_id: coin.to_string(),
            date,
            price,
            volume: 1000.0,
            market_cap: 1_000_000.0,
            daily_return: 0.0,
            price_change_24h: 0.0,
            price_change_7d: 0.0,
            price_change_30d: 0.0,
            market_cap_change_24h: 0.0,
            market_cap_change_7d: 0.0,
            market_cap_change_30d: 0.0,
            volume_change_24h: 0.0,
            volume_change_7d: 0.0,
            volume_change_30d: 0.0,
            profitability_30d: 0.0,
            volatility_30d: 0.0,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn exec_ok() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }
    }

    fn max_date_row(date: Option<NaiveDate>) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("max_date", Value::ChronoDate(date.map(Box::new)))])
    }

    fn max_row_index_row(max: Option<i32>) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("max_row_index", Value::Int(max))])
    }

    #[tokio::test]
    async fn full_refresh_truncates_then_inserts_everything() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_ok(), exec_ok(), exec_ok()])
            .into_connection();

        let records = vec![
            record("bitcoin", day(1), 100.0),
            record("bitcoin", day(2), 101.0),
            record("ethereum", day(1), 10.0),
        ];

        let report = load(&db, &records, LoadMode::FullRefresh).await.unwrap();

        assert_eq!(report.rows_considered, 3);
        assert_eq!(report.rows_selected, 3);
        assert_eq!(report.prices.inserted, 3);
        assert_eq!(report.metrics.inserted, 3);
        assert!(report.prices.error.is_none());
        assert!(!report.is_desynchronized());

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 3);
        assert!(format!("{:?}", log[0]).contains("TRUNCATE TABLE cryptocurrency_prices"));
    }

    #[tokio::test]
    async fn incremental_filters_rows_at_or_before_cutoff() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![max_date_row(Some(day(2)))]])
            .append_query_results([vec![max_row_index_row(Some(119))]])
            .append_exec_results([exec_ok(), exec_ok()])
            .into_connection();

        let records = vec![
            record("bitcoin", day(1), 100.0),
            record("bitcoin", day(2), 101.0),
            record("bitcoin", day(3), 102.0),
            record("bitcoin", day(4), 103.0),
        ];

        let report = load(&db, &records, LoadMode::Incremental).await.unwrap();

        assert_eq!(report.cutoff, Some(day(2)));
        assert_eq!(report.rows_considered, 4);
        assert_eq!(report.rows_selected, 2);
        assert_eq!(report.prices.inserted, 2);
        assert_eq!(report.metrics.inserted, 2);
    }

    #[tokio::test]
    async fn incremental_with_no_new_rows_performs_no_writes() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![max_date_row(Some(day(4)))]])
            .into_connection();

        let records = vec![
            record("bitcoin", day(3), 102.0),
            record("bitcoin", day(4), 103.0),
        ];

        let report = load(&db, &records, LoadMode::Incremental).await.unwrap();

        assert_eq!(report.rows_selected, 0);
        assert_eq!(report.prices.attempted, 0);
        assert_eq!(report.metrics.attempted, 0);
        assert!(!report.is_desynchronized());

        // Only the cutoff probe ran.
        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn incremental_with_empty_store_inserts_everything() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![max_date_row(None)]])
            .append_query_results([vec![max_row_index_row(None)]])
            .append_exec_results([exec_ok(), exec_ok()])
            .into_connection();

        let records = vec![
            record("bitcoin", day(1), 100.0),
            record("bitcoin", day(2), 101.0),
        ];

        let report = load(&db, &records, LoadMode::Incremental).await.unwrap();

        assert_eq!(report.cutoff, None);
        assert_eq!(report.rows_selected, 2);
        assert_eq!(report.prices.inserted, 2);
    }

    #[tokio::test]
    async fn one_table_failure_does_not_stop_the_other() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_ok()])
            .append_exec_errors([DbErr::Custom(
                "duplicate key value violates unique constraint".to_string(),
            )])
            .append_exec_results([exec_ok()])
            .into_connection();

        let records = vec![record("bitcoin", day(1), 100.0)];
        let report = load(&db, &records, LoadMode::FullRefresh).await.unwrap();

        assert_eq!(report.prices.inserted, 0);
        assert!(report.prices.error.is_some());
        assert_eq!(report.metrics.inserted, 1);
        assert!(report.metrics.error.is_none());
        assert!(report.is_desynchronized());
    }

    #[tokio::test]
    async fn tables_erroring_at_different_offsets_are_desynchronized() {
        // Prices commits its first chunk before erroring on the second;
        // metrics errors immediately. Both carry an error, but they no
        // longer hold the same rows.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_ok(), exec_ok()])
            .append_exec_errors([
                DbErr::Custom("connection reset".to_string()),
                DbErr::Custom("connection reset".to_string()),
            ])
            .into_connection();

        let records: Vec<EnrichedRecord> = (0..1500)
            .map(|i| record("bitcoin", day(1) + chrono::Days::new(i), 100.0))
            .collect();

        let report = load(&db, &records, LoadMode::FullRefresh).await.unwrap();

        assert_eq!(report.prices.inserted, 1000);
        assert!(report.prices.error.is_some());
        assert_eq!(report.metrics.inserted, 0);
        assert!(report.metrics.error.is_some());
        assert!(report.is_desynchronized());
    }

    #[test]
    fn price_models_convert_values_and_number_rows() {
        use rust_decimal_macros::dec;

        let records = vec![
            record("bitcoin", day(1), 100.5),
            record("bitcoin", day(2), 101.25),
        ];

        let models = price_models(&records, 6).unwrap();
        assert_eq!(models[0].price, Set(Some(dec!(100.5))));
        assert_eq!(models[0].row_index, Set(6));
        assert_eq!(models[1].price, Set(Some(dec!(101.25))));
        assert_eq!(models[1].row_index, Set(7));
    }

    #[tokio::test]
    async fn row_index_continues_from_persisted_max() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![max_row_index_row(Some(119))]])
            .into_connection();
        assert_eq!(next_row_index(&db).await.unwrap(), 120);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![max_row_index_row(None)]])
            .into_connection();
        assert_eq!(next_row_index(&db).await.unwrap(), 0);
    }
}
