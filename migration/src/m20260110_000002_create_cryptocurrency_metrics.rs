use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CryptocurrencyMetrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CryptocurrencyMetrics::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CryptocurrencyMetrics::Coin)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CryptocurrencyMetrics::PriceTimestamp)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CryptocurrencyMetrics::PriceChange24h)
                            .decimal()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CryptocurrencyMetrics::PriceChange7d)
                            .decimal()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CryptocurrencyMetrics::PriceChange30d)
                            .decimal()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CryptocurrencyMetrics::MarketCapChange24h)
                            .decimal()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CryptocurrencyMetrics::MarketCapChange7d)
                            .decimal()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CryptocurrencyMetrics::MarketCapChange30d)
                            .decimal()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CryptocurrencyMetrics::VolumeChange24h)
                            .decimal()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CryptocurrencyMetrics::VolumeChange7d)
                            .decimal()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CryptocurrencyMetrics::VolumeChange30d)
                            .decimal()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cryptocurrency_metrics_coin_timestamp")
                    .table(CryptocurrencyMetrics::Table)
                    .col(CryptocurrencyMetrics::Coin)
                    .col(CryptocurrencyMetrics::PriceTimestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CryptocurrencyMetrics::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CryptocurrencyMetrics {
    Table,
    Id,
    Coin,
    PriceTimestamp,
    #[sea_orm(iden = "price_change_24h")]
    PriceChange24h,
    #[sea_orm(iden = "price_change_7d")]
    PriceChange7d,
    #[sea_orm(iden = "price_change_30d")]
    PriceChange30d,
    #[sea_orm(iden = "market_cap_change_24h")]
    MarketCapChange24h,
    #[sea_orm(iden = "market_cap_change_7d")]
    MarketCapChange7d,
    #[sea_orm(iden = "market_cap_change_30d")]
    MarketCapChange30d,
    #[sea_orm(iden = "volume_change_24h")]
    VolumeChange24h,
    #[sea_orm(iden = "volume_change_7d")]
    VolumeChange7d,
    #[sea_orm(iden = "volume_change_30d")]
    VolumeChange30d,
}
