//! Create `topology` and its cache group membership table.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Topology::Table)
                    .if_not_exists()
                    .col(string_len(Topology::Name, 128).primary_key())
                    .col(text(Topology::Description).not_null())
                    .col(timestamp_with_time_zone(Topology::LastUpdated).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TopologyCachegroup::Table)
                    .if_not_exists()
                    .col(pk_auto(TopologyCachegroup::Id))
                    .col(string_len(TopologyCachegroup::Topology, 128).not_null())
                    .col(string_len(TopologyCachegroup::Cachegroup, 128).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_topology_cachegroup_topology")
                            .from(TopologyCachegroup::Table, TopologyCachegroup::Topology)
                            .to(Topology::Table, Topology::Name)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TopologyCachegroup::Table).to_owned())
            .await?;
        manager.drop_table(Table::drop().table(Topology::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Topology { Table, Name, Description, LastUpdated }

#[derive(DeriveIden)]
enum TopologyCachegroup { Table, Id, Topology, Cachegroup }
