//! SeaORM entity for the cryptocurrency_prices table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cryptocurrency_prices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// CoinGecko coin id (e.g. "bitcoin")
    pub coin: String,
    /// Observation day (UTC, time-of-day truncated)
    pub price_timestamp: Date,
    #[sea_orm(column_type = "Decimal(None)", nullable)]
    pub price: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(None)", nullable)]
    pub volume: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(None)", nullable)]
    pub market_cap: Option<Decimal>,
    /// Position in the stored series, continued across loads
    pub row_index: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
