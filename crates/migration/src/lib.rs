//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20220101_000011_create_tenant;
mod m20220101_000012_create_cdn;
mod m20220101_000013_create_type;
mod m20220101_000014_create_topology;
mod m20220101_000015_create_server;
mod m20220101_000016_create_deliveryservice;
mod m20220101_000017_create_deliveryservice_server;
mod m20220101_000002_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20220101_000011_create_tenant::Migration),
            Box::new(m20220101_000012_create_cdn::Migration),
            Box::new(m20220101_000013_create_type::Migration),
            Box::new(m20220101_000014_create_topology::Migration),
            Box::new(m20220101_000015_create_server::Migration),
            Box::new(m20220101_000016_create_deliveryservice::Migration),
            Box::new(m20220101_000017_create_deliveryservice_server::Migration),
            // Indexes should always be applied last
            Box::new(m20220101_000002_add_indexes::Migration),
        ]
    }
}
