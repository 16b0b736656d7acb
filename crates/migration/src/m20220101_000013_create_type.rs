//! Create `type` table.
//!
//! Shared by delivery services and servers; `use_in_table` tells them apart.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Type::Table)
                    .if_not_exists()
                    .col(pk_auto(Type::Id))
                    .col(string_len(Type::Name, 64).not_null())
                    .col(string_len(Type::UseInTable, 64).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Type::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Type { Table, Id, Name, UseInTable }
