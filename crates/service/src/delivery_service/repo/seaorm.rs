use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, NotSet, QueryFilter, QueryOrder,
    QuerySelect, QueryTrait, Set, SqlErr, TransactionTrait,
};
use tracing::debug;

use models::{cdn, delivery_service as ds, deliveryservice_server as dss, ds_type, server, tenant, topology, topology_cachegroup};

use crate::delivery_service::domain::{DeliveryService, DeliveryServiceFields, DsKind, Server, Topology};
use crate::delivery_service::filter::DeliveryServiceFilter;
use crate::delivery_service::repository::{next_timestamp, AssignmentGuard, DeliveryServiceRepository};
use crate::errors::ServiceError;
use crate::tenancy::Tenant;

pub struct SeaOrmDeliveryServiceRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmDeliveryServiceRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

fn to_domain(m: ds::Model) -> DeliveryService {
    DeliveryService {
        id: m.id,
        last_updated: m.last_updated.with_timezone(&Utc),
        fields: DeliveryServiceFields {
            xml_id: m.xml_id,
            tenant_id: m.tenant_id,
            cdn_id: m.cdn_id,
            type_id: m.type_id,
            profile_id: m.profile_id,
            service_category: m.service_category,
            display_name: m.display_name,
            active: m.active,
            dscp: m.dscp,
            geo_limit: m.geo_limit,
            geo_limit_countries: models::split_list(&m.geo_limit_countries),
            geo_provider: m.geo_provider,
            initial_dispersion: m.initial_dispersion,
            ipv6_routing_enabled: m.ipv6_routing_enabled,
            logs_enabled: m.logs_enabled,
            max_dns_answers: m.max_dns_answers,
            max_origin_connections: m.max_origin_connections,
            max_request_header_bytes: m.max_request_header_bytes,
            miss_lat: m.miss_lat,
            miss_long: m.miss_long,
            multi_site_origin: m.multi_site_origin,
            org_server_fqdn: m.org_server_fqdn,
            protocol: m.protocol,
            qstring_ignore: m.qstring_ignore,
            range_request_handling: m.range_request_handling,
            range_slice_block_size: m.range_slice_block_size,
            regional_geo_blocking: m.regional_geo_blocking,
            remap_text: m.remap_text,
            routing_name: m.routing_name,
            topology: m.topology,
            edge_header_rewrite: m.edge_header_rewrite,
            mid_header_rewrite: m.mid_header_rewrite,
            first_header_rewrite: m.first_header_rewrite,
            inner_header_rewrite: m.inner_header_rewrite,
            last_header_rewrite: m.last_header_rewrite,
            long_desc: m.long_desc,
            long_desc1: m.long_desc1,
            long_desc2: m.long_desc2,
            long_desc3: m.long_desc3,
            tls_versions: models::split_list(&m.tls_versions),
            required_capabilities: models::split_list(&m.required_capabilities),
            consistent_hash_regex: m.consistent_hash_regex,
            consistent_hash_query_params: models::split_list(&m.consistent_hash_query_params),
            fq_pacing_rate: m.fq_pacing_rate,
            signing_algorithm: m.signing_algorithm,
            tr_request_headers: m.tr_request_headers,
            tr_response_headers: m.tr_response_headers,
        },
    }
}

fn to_active(f: DeliveryServiceFields, last_updated: DateTime<Utc>) -> ds::ActiveModel {
    ds::ActiveModel {
        id: NotSet,
        xml_id: Set(f.xml_id),
        tenant_id: Set(f.tenant_id),
        cdn_id: Set(f.cdn_id),
        type_id: Set(f.type_id),
        profile_id: Set(f.profile_id),
        service_category: Set(f.service_category),
        display_name: Set(f.display_name),
        active: Set(f.active),
        dscp: Set(f.dscp),
        geo_limit: Set(f.geo_limit),
        geo_limit_countries: Set(models::join_list(&f.geo_limit_countries)),
        geo_provider: Set(f.geo_provider),
        initial_dispersion: Set(f.initial_dispersion),
        ipv6_routing_enabled: Set(f.ipv6_routing_enabled),
        logs_enabled: Set(f.logs_enabled),
        max_dns_answers: Set(f.max_dns_answers),
        max_origin_connections: Set(f.max_origin_connections),
        max_request_header_bytes: Set(f.max_request_header_bytes),
        miss_lat: Set(f.miss_lat),
        miss_long: Set(f.miss_long),
        multi_site_origin: Set(f.multi_site_origin),
        org_server_fqdn: Set(f.org_server_fqdn),
        protocol: Set(f.protocol),
        qstring_ignore: Set(f.qstring_ignore),
        range_request_handling: Set(f.range_request_handling),
        range_slice_block_size: Set(f.range_slice_block_size),
        regional_geo_blocking: Set(f.regional_geo_blocking),
        remap_text: Set(f.remap_text),
        routing_name: Set(f.routing_name),
        topology: Set(f.topology),
        edge_header_rewrite: Set(f.edge_header_rewrite),
        mid_header_rewrite: Set(f.mid_header_rewrite),
        first_header_rewrite: Set(f.first_header_rewrite),
        inner_header_rewrite: Set(f.inner_header_rewrite),
        last_header_rewrite: Set(f.last_header_rewrite),
        long_desc: Set(f.long_desc),
        long_desc1: Set(f.long_desc1),
        long_desc2: Set(f.long_desc2),
        long_desc3: Set(f.long_desc3),
        tls_versions: Set(models::join_list(&f.tls_versions)),
        required_capabilities: Set(models::join_list(&f.required_capabilities)),
        consistent_hash_regex: Set(f.consistent_hash_regex),
        consistent_hash_query_params: Set(models::join_list(&f.consistent_hash_query_params)),
        fq_pacing_rate: Set(f.fq_pacing_rate),
        signing_algorithm: Set(f.signing_algorithm),
        tr_request_headers: Set(f.tr_request_headers),
        tr_response_headers: Set(f.tr_response_headers),
        last_updated: Set(last_updated.into()),
    }
}

/// Unique violations mean the `xml_id` is taken; everything else is a generic DB failure.
fn write_err(e: DbErr, xml_id: &str) -> ServiceError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(format!("xmlId '{xml_id}' already exists")),
        _ => ServiceError::Db(e.to_string()),
    }
}

async fn servers_by_id<C: sea_orm::ConnectionTrait>(conn: &C, ids: Vec<i32>) -> Result<Vec<Server>, ServiceError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = server::Entity::find()
        .filter(server::Column::Id.is_in(ids))
        .order_by_asc(server::Column::Id)
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(Server::from).collect())
}

async fn assigned_in<C: sea_orm::ConnectionTrait>(conn: &C, ds_id: i32) -> Result<Vec<Server>, ServiceError> {
    let ids: Vec<i32> = dss::Entity::find()
        .filter(dss::Column::Deliveryservice.eq(ds_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|a| a.server)
        .collect();
    servers_by_id(conn, ids).await
}

#[async_trait::async_trait]
impl DeliveryServiceRepository for SeaOrmDeliveryServiceRepository {
    async fn tenants(&self) -> Result<Vec<Tenant>, ServiceError> {
        let rows = tenant::Entity::find().all(&self.db).await?;
        Ok(rows.into_iter().map(Tenant::from).collect())
    }

    async fn find_ds_kind(&self, type_id: i32) -> Result<Option<DsKind>, ServiceError> {
        let row = ds_type::Entity::find_by_id(type_id)
            .filter(ds_type::Column::UseInTable.eq(ds_type::USE_IN_DELIVERYSERVICE))
            .one(&self.db)
            .await?;
        Ok(row.and_then(|t| DsKind::from_name(&t.name)))
    }

    async fn cdn_exists(&self, cdn_id: i32) -> Result<bool, ServiceError> {
        Ok(cdn::Entity::find_by_id(cdn_id).one(&self.db).await?.is_some())
    }

    async fn find_topology(&self, name: &str) -> Result<Option<Topology>, ServiceError> {
        let Some(top) = topology::Entity::find_by_id(name.to_string()).one(&self.db).await? else {
            return Ok(None);
        };
        let cache_groups = topology_cachegroup::Entity::find()
            .filter(topology_cachegroup::Column::Topology.eq(top.name.clone()))
            .order_by_asc(topology_cachegroup::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| m.cachegroup)
            .collect();
        Ok(Some(Topology { name: top.name, cache_groups }))
    }

    async fn servers_in_cache_groups(&self, cache_groups: &[String]) -> Result<Vec<Server>, ServiceError> {
        if cache_groups.is_empty() {
            return Ok(Vec::new());
        }
        let rows = server::Entity::find()
            .filter(server::Column::Cachegroup.is_in(cache_groups.iter().cloned()))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Server::from).collect())
    }

    async fn assigned_servers(&self, ds_id: i32) -> Result<Vec<Server>, ServiceError> {
        assigned_in(&self.db, ds_id).await
    }

    async fn list(&self, filter: &DeliveryServiceFilter) -> Result<Vec<DeliveryService>, ServiceError> {
        let rows = ds::Entity::find()
            .apply_if(filter.id, |q, v| q.filter(ds::Column::Id.eq(v)))
            .apply_if(filter.active, |q, v| q.filter(ds::Column::Active.eq(v)))
            .apply_if(filter.cdn_id, |q, v| q.filter(ds::Column::CdnId.eq(v)))
            .apply_if(filter.logs_enabled, |q, v| q.filter(ds::Column::LogsEnabled.eq(v)))
            .apply_if(filter.profile_id, |q, v| q.filter(ds::Column::ProfileId.eq(v)))
            .apply_if(filter.service_category.clone(), |q, v| q.filter(ds::Column::ServiceCategory.eq(v)))
            .apply_if(filter.tenant_id, |q, v| q.filter(ds::Column::TenantId.eq(v)))
            .apply_if(filter.topology.clone(), |q, v| q.filter(ds::Column::Topology.eq(v)))
            .apply_if(filter.type_id, |q, v| q.filter(ds::Column::TypeId.eq(v)))
            .apply_if(filter.xml_id.clone(), |q, v| q.filter(ds::Column::XmlId.eq(v)))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(to_domain).collect())
    }

    async fn get(&self, id: i32) -> Result<Option<DeliveryService>, ServiceError> {
        Ok(ds::Entity::find_by_id(id).one(&self.db).await?.map(to_domain))
    }

    async fn find_by_xml_id(&self, xml_id: &str) -> Result<Option<DeliveryService>, ServiceError> {
        let row = ds::Entity::find()
            .filter(ds::Column::XmlId.eq(xml_id.to_string()))
            .one(&self.db)
            .await?;
        Ok(row.map(to_domain))
    }

    async fn insert(&self, fields: DeliveryServiceFields) -> Result<DeliveryService, ServiceError> {
        let xml_id = fields.xml_id.clone();
        let created = to_active(fields, next_timestamp(None))
            .insert(&self.db)
            .await
            .map_err(|e| write_err(e, &xml_id))?;
        Ok(to_domain(created))
    }

    async fn update(&self, id: i32, fields: DeliveryServiceFields, expected: DateTime<Utc>) -> Result<Option<DeliveryService>, ServiceError> {
        let xml_id = fields.xml_id.clone();
        let stamp = next_timestamp(Some(expected));
        let res = ds::Entity::update_many()
            .set(to_active(fields, stamp))
            .filter(ds::Column::Id.eq(id))
            .filter(ds::Column::LastUpdated.eq(expected.fixed_offset()))
            .exec(&self.db)
            .await
            .map_err(|e| write_err(e, &xml_id))?;
        if res.rows_affected == 0 {
            debug!(ds_id = id, "update lost compare-and-swap on last_updated");
            return Ok(None);
        }
        self.get(id).await
    }

    async fn delete(&self, id: i32, expected: DateTime<Utc>) -> Result<bool, ServiceError> {
        let txn = self.db.begin().await?;
        dss::Entity::delete_many()
            .filter(dss::Column::Deliveryservice.eq(id))
            .exec(&txn)
            .await?;
        let res = ds::Entity::delete_many()
            .filter(ds::Column::Id.eq(id))
            .filter(ds::Column::LastUpdated.eq(expected.fixed_offset()))
            .exec(&txn)
            .await?;
        if res.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }
        txn.commit().await?;
        Ok(true)
    }

    async fn unassign_server(&self, ds_id: i32, server_id: i32, guard: AssignmentGuard<'_>) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        // row lock keeps concurrent removals for the same delivery service serialized
        ds::Entity::find_by_id(ds_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("delivery service"))?;
        let assigned = assigned_in(&txn, ds_id).await?;
        guard(&assigned)?;
        let res = dss::Entity::delete_many()
            .filter(dss::Column::Deliveryservice.eq(ds_id))
            .filter(dss::Column::Server.eq(server_id))
            .exec(&txn)
            .await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::not_found("delivery service server assignment"));
        }
        txn.commit().await?;
        Ok(())
    }
}
