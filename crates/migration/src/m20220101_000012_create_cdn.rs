//! Create `cdn` table.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Cdn::Table)
                    .if_not_exists()
                    .col(pk_auto(Cdn::Id))
                    .col(string_len(Cdn::Name, 128).unique_key().not_null())
                    .col(string_len(Cdn::DomainName, 255).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Cdn::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Cdn { Table, Id, Name, DomainName }
