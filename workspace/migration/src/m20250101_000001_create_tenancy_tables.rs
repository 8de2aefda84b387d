use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string_len(Users::Username, 150).unique_key())
                    .col(boolean(Users::IsSuperuser).default(false))
                    .to_owned(),
            )
            .await?;

        // Create groups table
        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(pk_auto(Groups::Id))
                    .col(string_len(Groups::Name, 150).unique_key())
                    .to_owned(),
            )
            .await?;

        // Create user_groups table (join table)
        manager
            .create_table(
                Table::create()
                    .table(UserGroups::Table)
                    .if_not_exists()
                    .col(integer(UserGroups::UserId))
                    .col(integer(UserGroups::GroupId))
                    .primary_key(
                        Index::create()
                            .name("pk_user_groups")
                            .col(UserGroups::UserId)
                            .col(UserGroups::GroupId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_groups_user")
                            .from(UserGroups::Table, UserGroups::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_groups_group")
                            .from(UserGroups::Table, UserGroups::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create companies table
        manager
            .create_table(
                Table::create()
                    .table(Companies::Table)
                    .if_not_exists()
                    .col(pk_auto(Companies::Id))
                    .col(string_len(Companies::Code, 100).unique_key())
                    .col(string_len(Companies::Name, 100))
                    .to_owned(),
            )
            .await?;

        // Create company_owner_groups table (join table)
        manager
            .create_table(
                Table::create()
                    .table(CompanyOwnerGroups::Table)
                    .if_not_exists()
                    .col(integer(CompanyOwnerGroups::CompanyId))
                    .col(integer(CompanyOwnerGroups::GroupId))
                    .primary_key(
                        Index::create()
                            .name("pk_company_owner_groups")
                            .col(CompanyOwnerGroups::CompanyId)
                            .col(CompanyOwnerGroups::GroupId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_company_owner_groups_company")
                            .from(CompanyOwnerGroups::Table, CompanyOwnerGroups::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_company_owner_groups_group")
                            .from(CompanyOwnerGroups::Table, CompanyOwnerGroups::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The scope filter looks owner groups up by group id
        manager
            .create_index(
                Index::create()
                    .name("idx_company_owner_groups_group_id")
                    .table(CompanyOwnerGroups::Table)
                    .col(CompanyOwnerGroups::GroupId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order to avoid foreign key constraints
        manager
            .drop_table(Table::drop().table(CompanyOwnerGroups::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Companies::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(UserGroups::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Users {
    Table,
    Id,
    Username,
    IsSuperuser,
}

#[derive(DeriveIden)]
enum Groups {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum UserGroups {
    Table,
    UserId,
    GroupId,
}

#[derive(DeriveIden)]
pub(crate) enum Companies {
    Table,
    Id,
    Code,
    Name,
}

#[derive(DeriveIden)]
enum CompanyOwnerGroups {
    Table,
    CompanyId,
    GroupId,
}
