//! Create `deliveryservice_server` assignment table.
//!
//! Composite primary key; both sides cascade so a deleted delivery service
//! takes its assignments with it.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeliveryserviceServer::Table)
                    .if_not_exists()
                    .col(integer(DeliveryserviceServer::Deliveryservice).not_null())
                    .col(integer(DeliveryserviceServer::Server).not_null())
                    .col(timestamp_with_time_zone(DeliveryserviceServer::LastUpdated).not_null())
                    .primary_key(
                        Index::create()
                            .col(DeliveryserviceServer::Deliveryservice)
                            .col(DeliveryserviceServer::Server),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_dss_deliveryservice")
                            .from(DeliveryserviceServer::Table, DeliveryserviceServer::Deliveryservice)
                            .to(Deliveryservice::Table, Deliveryservice::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_dss_server")
                            .from(DeliveryserviceServer::Table, DeliveryserviceServer::Server)
                            .to(Server::Table, Server::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeliveryserviceServer::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DeliveryserviceServer { Table, Deliveryservice, Server, LastUpdated }

#[derive(DeriveIden)]
enum Deliveryservice { Table, Id }

#[derive(DeriveIden)]
enum Server { Table, Id }
