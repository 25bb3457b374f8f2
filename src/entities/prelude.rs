pub use super::cryptocurrency_metrics::Entity as CryptocurrencyMetrics;
pub use super::cryptocurrency_prices::Entity as CryptocurrencyPrices;
