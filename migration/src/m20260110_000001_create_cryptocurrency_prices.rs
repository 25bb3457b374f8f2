use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CryptocurrencyPrices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CryptocurrencyPrices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CryptocurrencyPrices::Coin)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CryptocurrencyPrices::PriceTimestamp)
                            .date()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CryptocurrencyPrices::Price).decimal().null())
                    .col(
                        ColumnDef::new(CryptocurrencyPrices::Volume)
                            .decimal()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CryptocurrencyPrices::MarketCap)
                            .decimal()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CryptocurrencyPrices::RowIndex)
                            .integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookup index only. Deduplication of (coin, price_timestamp) is the
        // pipeline's responsibility, so no unique constraint here.
        manager
            .create_index(
                Index::create()
                    .name("idx_cryptocurrency_prices_coin_timestamp")
                    .table(CryptocurrencyPrices::Table)
                    .col(CryptocurrencyPrices::Coin)
                    .col(CryptocurrencyPrices::PriceTimestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CryptocurrencyPrices::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CryptocurrencyPrices {
    Table,
    Id,
    Coin,
    PriceTimestamp,
    Price,
    Volume,
    MarketCap,
    RowIndex,
}
