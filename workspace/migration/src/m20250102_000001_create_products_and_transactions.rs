use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250101_000001_create_tenancy_tables::{Companies, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Products belong to a company; a company cannot be removed while it has products
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(pk_auto(Products::Id))
                    .col(integer(Products::CompanyId))
                    .col(string_len(Products::Code, 100))
                    .col(string_len(Products::Name, 100))
                    .col(big_integer(Products::Price))
                    .col(boolean(Products::ActiveListing).default(true))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_company")
                            .from(Products::Table, Products::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_company_code")
                    .table(Products::Table)
                    .col(Products::CompanyId)
                    .col(Products::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Transactions record purchases of a product by a user
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(pk_auto(Transactions::Id))
                    .col(integer(Transactions::UserId))
                    .col(integer(Transactions::ProductId))
                    .col(string_len(Transactions::Code, 100).unique_key())
                    .col(integer(Transactions::Quantity))
                    .col(timestamp_with_time_zone(Transactions::Timestamp))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_user")
                            .from(Transactions::Table, Transactions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_product")
                            .from(Transactions::Table, Transactions::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    CompanyId,
    Code,
    Name,
    Price,
    ActiveListing,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    UserId,
    ProductId,
    Code,
    Quantity,
    Timestamp,
}
