//! Create `server` table with FK to `cdn`.
//!
//! Only the columns the delivery service rules read: placement, role and capabilities.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Server::Table)
                    .if_not_exists()
                    .col(pk_auto(Server::Id))
                    .col(string_len(Server::HostName, 255).unique_key().not_null())
                    .col(integer(Server::CdnId).not_null())
                    .col(string_len(Server::Cachegroup, 128).not_null())
                    .col(string_len(Server::TypeName, 64).not_null())
                    .col(text(Server::Capabilities).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_server_cdn")
                            .from(Server::Table, Server::CdnId)
                            .to(Cdn::Table, Cdn::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Server::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Server { Table, Id, HostName, CdnId, Cachegroup, TypeName, Capabilities }

#[derive(DeriveIden)]
enum Cdn { Table, Id }
