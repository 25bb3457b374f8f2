//! SeaORM entity for the cryptocurrency_metrics table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cryptocurrency_metrics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// CoinGecko coin id (e.g. "bitcoin")
    pub coin: String,
    /// Observation day the metrics refer to
    pub price_timestamp: Date,
    #[sea_orm(column_name = "price_change_24h", column_type = "Decimal(None)", nullable)]
    pub price_change_24h: Option<Decimal>,
    #[sea_orm(column_name = "price_change_7d", column_type = "Decimal(None)", nullable)]
    pub price_change_7d: Option<Decimal>,
    #[sea_orm(column_name = "price_change_30d", column_type = "Decimal(None)", nullable)]
    pub price_change_30d: Option<Decimal>,
    #[sea_orm(column_name = "market_cap_change_24h", column_type = "Decimal(None)", nullable)]
    pub market_cap_change_24h: Option<Decimal>,
    #[sea_orm(column_name = "market_cap_change_7d", column_type = "Decimal(None)", nullable)]
    pub market_cap_change_7d: Option<Decimal>,
    #[sea_orm(column_name = "market_cap_change_30d", column_type = "Decimal(None)", nullable)]
    pub market_cap_change_30d: Option<Decimal>,
    #[sea_orm(column_name = "volume_change_24h", column_type = "Decimal(None)", nullable)]
    pub volume_change_24h: Option<Decimal>,
    #[sea_orm(column_name = "volume_change_7d", column_type = "Decimal(None)", nullable)]
    pub volume_change_7d: Option<Decimal>,
    #[sea_orm(column_name = "volume_change_30d", column_type = "Decimal(None)", nullable)]
    pub volume_change_30d: Option<Decimal>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
