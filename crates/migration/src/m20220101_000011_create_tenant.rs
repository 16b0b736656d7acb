//! Create `tenant` table.
//!
//! Self-referencing tree; `parent_id` is null only for the root tenant.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tenant::Table)
                    .if_not_exists()
                    .col(pk_auto(Tenant::Id))
                    .col(string_len(Tenant::Name, 128).unique_key().not_null())
                    .col(boolean(Tenant::Active).not_null())
                    .col(ColumnDef::new(Tenant::ParentId).integer().null())
                    .col(timestamp_with_time_zone(Tenant::LastUpdated).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tenant_parent")
                            .from(Tenant::Table, Tenant::ParentId)
                            .to(Tenant::Table, Tenant::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Tenant::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Tenant { Table, Id, Name, Active, ParentId, LastUpdated }
