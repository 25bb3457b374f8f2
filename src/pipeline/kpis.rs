//! KPI stage: rolling and percentage-change metrics per coin.
//!
//! Operates on the cleaner's output, which is sorted by (coin_id, date) and
//! grouped contiguously by coin. Each coin's history is enriched
//! independently; there is no cross-coin leakage. Metrics whose lookback
//! window is unavailable are emitted as exactly 0, so early-history rows
//! read as "no change" rather than "unknown".

use crate::models::market::{CleanedRecord, EnrichedRecord};

/// Trailing window length, in observations, for the 30-day statistics.
const MONTH_WINDOW: usize = 30;

/// Enrich cleaned records with daily returns, 24h/7d/30d percentage changes,
/// monthly profitability and monthly volatility. Output has the same
/// cardinality and order as the input.
pub fn calculate_kpis(records: Vec<CleanedRecord>) -> Vec<EnrichedRecord> {
    let mut enriched = Vec::with_capacity(records.len());

    let mut start = 0;
    while start < records.len() {
        let mut end = start + 1;
        while end < records.len() && records[end].coin_id == records[start].coin_id {
            end += 1;
        }
        enrich_group(&records[start..end], &mut enriched);
        start = end;
    }

    enriched
}

fn enrich_group(group: &[CleanedRecord], out: &mut Vec<EnrichedRecord>) {
    // daily_return[t] = price[t]/price[t-1] - 1, undefined at t = 0.
    let returns: Vec<Option<f64>> = (0..group.len())
        .map(|t| {
            if t == 0 {
                None
            } else {
                Some(group[t].price / group[t - 1].price - 1.0)
            }
        })
        .collect();

    for t in 0..group.len() {
        let record = &group[t];

        let price_change_24h = pct_change(group, t, 1, |r| r.price);
        let price_change_7d = pct_change(group, t, 7, |r| r.price);
        let price_change_30d = pct_change(group, t, 30, |r| r.price);

        out.push(EnrichedRecord {
            coin_id: record.coin_id.clone(),
            date: record.date,
            price: record.price,
            volume: record.volume,
            market_cap: record.market_cap,
            daily_return: returns[t].unwrap_or(0.0),
            price_change_24h,
            price_change_7d,
            price_change_30d,
            market_cap_change_24h: pct_change(group, t, 1, |r| r.market_cap),
            market_cap_change_7d: pct_change(group, t, 7, |r| r.market_cap),
            market_cap_change_30d: pct_change(group, t, 30, |r| r.market_cap),
            volume_change_24h: pct_change(group, t, 1, |r| r.volume),
            volume_change_7d: pct_change(group, t, 7, |r| r.volume),
            volume_change_30d: pct_change(group, t, 30, |r| r.volume),
            profitability_30d: price_change_30d,
            volatility_30d: rolling_volatility(&returns, t),
        });
    }
}

/// Percentage change over `periods` prior rows of the group, or 0 when
/// fewer than `periods` prior rows exist.
fn pct_change(group: &[CleanedRecord], t: usize, periods: usize, value: fn(&CleanedRecord) -> f64) -> f64 {
    if t < periods {
        return 0.0;
    }
    (value(&group[t]) / value(&group[t - periods]) - 1.0) * 100.0
}

/// Sample standard deviation (N-1 denominator) of the trailing
/// `MONTH_WINDOW` daily returns ending at `t`, as a percentage. Zero until
/// the group has accumulated that many return observations.
fn rolling_volatility(returns: &[Option<f64>], t: usize) -> f64 {
    // returns[0] is None, so t carries exactly t observations.
    if t < MONTH_WINDOW {
        return 0.0;
    }

    let window: Vec<f64> = returns[t + 1 - MONTH_WINDOW..=t]
        .iter()
        .map(|r| r.unwrap_or(0.0))
        .collect();

    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);

    variance.sqrt() * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const EPS: f64 = 1e-9;

    fn series(coin: &str, prices: &[f64]) -> Vec<CleanedRecord> {
        let day0 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, price)| CleanedRecord {
                coin_id: coin.to_string(),
                date: day0 + chrono::Days::new(i as u64),
                price: *price,
                volume: 1000.0 + i as f64,
                market_cap: (1_000_000 + i) as f64,
            })
            .collect()
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(calculate_kpis(vec![]).is_empty());
    }

    #[test]
    fn price_change_24h_matches_daily_ratio() {
        let prices = [100.0, 110.0, 99.0];
        let enriched = calculate_kpis(series("bitcoin", &prices));

        assert_eq!(enriched[0].price_change_24h, 0.0);
        for t in 1..prices.len() {
            let expected = (prices[t] / prices[t - 1] - 1.0) * 100.0;
            assert!((enriched[t].price_change_24h - expected).abs() < EPS);
            assert!((enriched[t].daily_return - (prices[t] / prices[t - 1] - 1.0)).abs() < EPS);
        }
    }

    #[test]
    fn monthly_change_fills_from_row_30() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let enriched = calculate_kpis(series("bitcoin", &prices));

        for t in 0..30 {
            assert_eq!(enriched[t].price_change_30d, 0.0, "row {} should be 0", t);
        }
        for t in 30..40 {
            let expected = (prices[t] / prices[t - 30] - 1.0) * 100.0;
            assert!((enriched[t].price_change_30d - expected).abs() < EPS);
        }
    }

    #[test]
    fn profitability_equals_monthly_price_change() {
        let prices: Vec<f64> = (0..40).map(|i| 50.0 * 1.01f64.powi(i)).collect();
        let enriched = calculate_kpis(series("bitcoin", &prices));

        for row in &enriched {
            assert_eq!(row.profitability_30d, row.price_change_30d);
        }
    }

    #[test]
    fn volatility_is_zero_for_short_groups() {
        // 30 records carry only 29 daily-return observations.
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + (i % 3) as f64).collect();
        let enriched = calculate_kpis(series("bitcoin", &prices));

        for row in &enriched {
            assert_eq!(row.volatility_30d, 0.0);
        }
    }

    #[test]
    fn volatility_matches_sample_standard_deviation() {
        // Alternate between two known return values so the sample stddev
        // has a closed form: 15x 1% and 15x 3% returns -> mean 2%,
        // every deviation is +-1%, variance = 30 * 0.0001 / 29.
        let mut prices = vec![1.0];
        for i in 0..30 {
            let r = if i % 2 == 0 { 0.01 } else { 0.03 };
            prices.push(prices.last().unwrap() * (1.0 + r));
        }
        let enriched = calculate_kpis(series("bitcoin", &prices));

        let expected = (30.0 * 0.0001f64 / 29.0).sqrt() * 100.0;
        assert!((enriched[30].volatility_30d - expected).abs() < 1e-6);
        assert_eq!(enriched[29].volatility_30d, 0.0);
    }

    #[test]
    fn groups_do_not_leak_into_each_other() {
        let mut records = series("bitcoin", &[100.0, 110.0]);
        records.extend(series("ethereum", &[10.0, 12.0]));

        let enriched = calculate_kpis(records);
        assert_eq!(enriched.len(), 4);

        // Ethereum's first row must not see bitcoin's last price.
        assert_eq!(enriched[2].coin_id, "ethereum");
        assert_eq!(enriched[2].price_change_24h, 0.0);
        assert_eq!(enriched[2].daily_return, 0.0);
        assert!((enriched[3].price_change_24h - 20.0).abs() < EPS);
    }

    #[test]
    fn preserves_cardinality_and_order() {
        let mut records = series("bitcoin", &[100.0, 101.0, 102.0]);
        records.extend(series("ethereum", &[10.0, 11.0]));
        let input = records.clone();

        let enriched = calculate_kpis(records);
        assert_eq!(enriched.len(), input.len());
        for (e, c) in enriched.iter().zip(&input) {
            assert_eq!(e.coin_id, c.coin_id);
            assert_eq!(e.date, c.date);
        }
    }
}
