use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Tenant: children lookup when building the tree
        manager
            .create_index(
                Index::create()
                    .name("idx_tenant_parent")
                    .table(Tenant::Table)
                    .col(Tenant::ParentId)
                    .to_owned(),
            )
            .await?;

        // Deliveryservice: list filters
        manager
            .create_index(
                Index::create()
                    .name("idx_deliveryservice_tenant")
                    .table(Deliveryservice::Table)
                    .col(Deliveryservice::TenantId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_deliveryservice_topology")
                    .table(Deliveryservice::Table)
                    .col(Deliveryservice::Topology)
                    .to_owned(),
            )
            .await?;

        // Server: topology cache lookups go by cache group
        manager
            .create_index(
                Index::create()
                    .name("idx_server_cachegroup")
                    .table(Server::Table)
                    .col(Server::Cachegroup)
                    .to_owned(),
            )
            .await?;

        // TopologyCachegroup: one membership per (topology, cachegroup)
        manager
            .create_index(
                Index::create()
                    .name("uniq_topology_cachegroup")
                    .table(TopologyCachegroup::Table)
                    .col(TopologyCachegroup::Topology)
                    .col(TopologyCachegroup::Cachegroup)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_tenant_parent").table(Tenant::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_deliveryservice_tenant").table(Deliveryservice::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_deliveryservice_topology").table(Deliveryservice::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_server_cachegroup").table(Server::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_topology_cachegroup").table(TopologyCachegroup::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Tenant { Table, ParentId }

#[derive(DeriveIden)]
enum Deliveryservice { Table, TenantId, Topology }

#[derive(DeriveIden)]
enum Server { Table, Cachegroup }

#[derive(DeriveIden)]
enum TopologyCachegroup { Table, Topology, Cachegroup }
