//! Create `deliveryservice` table with FKs to `tenant`, `cdn`, `type` and `topology`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Deliveryservice::Table)
                    .if_not_exists()
                    .col(pk_auto(Deliveryservice::Id))
                    .col(string_len(Deliveryservice::XmlId, 48).unique_key().not_null())
                    .col(integer(Deliveryservice::TenantId).not_null())
                    .col(integer(Deliveryservice::CdnId).not_null())
                    .col(integer(Deliveryservice::TypeId).not_null())
                    .col(ColumnDef::new(Deliveryservice::ProfileId).integer().null())
                    .col(ColumnDef::new(Deliveryservice::ServiceCategory).string_len(128).null())
                    .col(string_len(Deliveryservice::DisplayName, 48).not_null())
                    .col(boolean(Deliveryservice::Active).not_null())
                    .col(integer(Deliveryservice::Dscp).not_null())
                    .col(integer(Deliveryservice::GeoLimit).not_null())
                    .col(text(Deliveryservice::GeoLimitCountries).not_null())
                    .col(integer(Deliveryservice::GeoProvider).not_null())
                    .col(integer(Deliveryservice::InitialDispersion).not_null())
                    .col(boolean(Deliveryservice::Ipv6RoutingEnabled).not_null())
                    .col(boolean(Deliveryservice::LogsEnabled).not_null())
                    .col(ColumnDef::new(Deliveryservice::MaxDnsAnswers).integer().null())
                    .col(ColumnDef::new(Deliveryservice::MaxOriginConnections).integer().null())
                    .col(ColumnDef::new(Deliveryservice::MaxRequestHeaderBytes).integer().null())
                    .col(double(Deliveryservice::MissLat).not_null())
                    .col(double(Deliveryservice::MissLong).not_null())
                    .col(boolean(Deliveryservice::MultiSiteOrigin).not_null())
                    .col(ColumnDef::new(Deliveryservice::OrgServerFqdn).string_len(255).null())
                    .col(integer(Deliveryservice::Protocol).not_null())
                    .col(integer(Deliveryservice::QstringIgnore).not_null())
                    .col(integer(Deliveryservice::RangeRequestHandling).not_null())
                    .col(ColumnDef::new(Deliveryservice::RangeSliceBlockSize).integer().null())
                    .col(boolean(Deliveryservice::RegionalGeoBlocking).not_null())
                    .col(ColumnDef::new(Deliveryservice::RemapText).text().null())
                    .col(string_len(Deliveryservice::RoutingName, 48).not_null())
                    .col(ColumnDef::new(Deliveryservice::Topology).string_len(128).null())
                    .col(ColumnDef::new(Deliveryservice::EdgeHeaderRewrite).text().null())
                    .col(ColumnDef::new(Deliveryservice::MidHeaderRewrite).text().null())
                    .col(ColumnDef::new(Deliveryservice::FirstHeaderRewrite).text().null())
                    .col(ColumnDef::new(Deliveryservice::InnerHeaderRewrite).text().null())
                    .col(ColumnDef::new(Deliveryservice::LastHeaderRewrite).text().null())
                    .col(ColumnDef::new(Deliveryservice::LongDesc).text().null())
                    .col(ColumnDef::new(Deliveryservice::LongDesc1).text().null())
                    .col(ColumnDef::new(Deliveryservice::LongDesc2).text().null())
                    .col(ColumnDef::new(Deliveryservice::LongDesc3).text().null())
                    .col(text(Deliveryservice::TlsVersions).not_null())
                    .col(text(Deliveryservice::RequiredCapabilities).not_null())
                    .col(ColumnDef::new(Deliveryservice::ConsistentHashRegex).string_len(1024).null())
                    .col(text(Deliveryservice::ConsistentHashQueryParams).not_null())
                    .col(ColumnDef::new(Deliveryservice::FqPacingRate).integer().null())
                    .col(ColumnDef::new(Deliveryservice::SigningAlgorithm).string_len(32).null())
                    .col(ColumnDef::new(Deliveryservice::TrRequestHeaders).text().null())
                    .col(ColumnDef::new(Deliveryservice::TrResponseHeaders).text().null())
                    .col(timestamp_with_time_zone(Deliveryservice::LastUpdated).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deliveryservice_tenant")
                            .from(Deliveryservice::Table, Deliveryservice::TenantId)
                            .to(Tenant::Table, Tenant::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deliveryservice_cdn")
                            .from(Deliveryservice::Table, Deliveryservice::CdnId)
                            .to(Cdn::Table, Cdn::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deliveryservice_type")
                            .from(Deliveryservice::Table, Deliveryservice::TypeId)
                            .to(Type::Table, Type::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deliveryservice_topology")
                            .from(Deliveryservice::Table, Deliveryservice::Topology)
                            .to(Topology::Table, Topology::Name)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Deliveryservice::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Deliveryservice {
    Table,
    Id,
    XmlId,
    TenantId,
    CdnId,
    TypeId,
    ProfileId,
    ServiceCategory,
    DisplayName,
    Active,
    Dscp,
    GeoLimit,
    GeoLimitCountries,
    GeoProvider,
    InitialDispersion,
    Ipv6RoutingEnabled,
    LogsEnabled,
    MaxDnsAnswers,
    MaxOriginConnections,
    MaxRequestHeaderBytes,
    MissLat,
    MissLong,
    MultiSiteOrigin,
    OrgServerFqdn,
    Protocol,
    QstringIgnore,
    RangeRequestHandling,
    RangeSliceBlockSize,
    RegionalGeoBlocking,
    RemapText,
    RoutingName,
    Topology,
    EdgeHeaderRewrite,
    MidHeaderRewrite,
    FirstHeaderRewrite,
    InnerHeaderRewrite,
    LastHeaderRewrite,
    LongDesc,
    LongDesc1,
    LongDesc2,
    LongDesc3,
    TlsVersions,
    RequiredCapabilities,
    ConsistentHashRegex,
    ConsistentHashQueryParams,
    FqPacingRate,
    SigningAlgorithm,
    TrRequestHeaders,
    TrResponseHeaders,
    LastUpdated,
}

#[derive(DeriveIden)]
enum Tenant { Table, Id }

#[derive(DeriveIden)]
enum Cdn { Table, Id }

#[derive(DeriveIden)]
enum Type { Table, Id }

#[derive(DeriveIden)]
enum Topology { Table, Name }
