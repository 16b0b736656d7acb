//! Seeded fixtures shared by unit tests, doc tests and the HTTP tests.
//!
//! Tenant tree: root(1) -> tenant1(2) -> tenant2(3, inactive) -> tenant3(4); root -> tenant4(5).

use std::sync::Arc;

use configs::RulesConfig;

use crate::delivery_service::defaults::fill_for_create;
use crate::delivery_service::domain::{DeliveryServiceFields, DeliveryServiceInput, Server, Topology};
use crate::delivery_service::repository::memory::InMemoryDeliveryServiceRepository;
use crate::delivery_service::repository::DeliveryServiceRepository;
use crate::delivery_service::DeliveryServiceService;
use crate::tenancy::Tenant;

pub const TENANT_ROOT: i32 = 1;
pub const TENANT_1: i32 = 2;
pub const TENANT_2: i32 = 3;
pub const TENANT_3: i32 = 4;
pub const TENANT_4: i32 = 5;

pub const TYPE_HTTP: i32 = 1;
pub const TYPE_DNS: i32 = 2;
pub const TYPE_STEERING: i32 = 3;
pub const TYPE_CLIENT_STEERING: i32 = 4;
pub const TYPE_ANY_MAP: i32 = 5;

pub const CDN_1: i32 = 1;
pub const CDN_2: i32 = 2;

pub const SERVER_EDGE_ATL: i32 = 1;
pub const SERVER_MID_ATL: i32 = 2;
pub const SERVER_ORG_DENVER_1: i32 = 3;
pub const SERVER_ORG_DENVER_2: i32 = 4;
pub const SERVER_EDGE_CDN2: i32 = 5;
pub const SERVER_EDGE_NOCAP: i32 = 6;
pub const SERVER_ASSIGNMENT_EDGE: i32 = 7;
pub const SERVER_ASSIGNMENT_ORG: i32 = 8;

pub const DS_1: i32 = 1;
pub const DS_2: i32 = 2;
pub const DS_3: i32 = 3;
pub const DS_TOP: i32 = 4;
pub const DS_CLIENT_STEERING: i32 = 5;
pub const DS_TOP_CDN2: i32 = 6;
pub const DS_TOP_NO_MIDS: i32 = 7;
pub const DS_SERVER_ASSIGNMENTS: i32 = 8;
pub const DS_ROOT: i32 = 9;

/// Defaulted record with an HTTP origin, as a client would create it.
pub fn fixture_fields(xml_id: &str, tenant_id: i32, cdn_id: i32, type_id: i32) -> DeliveryServiceFields {
    let input = DeliveryServiceInput {
        xml_id: Some(xml_id.to_string()),
        tenant_id: Some(tenant_id),
        cdn_id: Some(cdn_id),
        type_id: Some(type_id),
        display_name: Some(xml_id.to_string()),
        org_server_fqdn: Some(Some("http://origin.example.net".into())),
        ..Default::default()
    };
    fill_for_create(input, &RulesConfig::default()).complete().expect("fixture fields are complete")
}

fn tenant(id: i32, name: &str, active: bool, parent_id: Option<i32>) -> Tenant {
    Tenant { id, name: name.into(), active, parent_id }
}

fn server(id: i32, host: &str, cdn_id: i32, cg: &str, ty: &str, caps: &[&str]) -> Server {
    Server {
        id,
        host_name: host.into(),
        cdn_id,
        cache_group: cg.into(),
        type_name: ty.into(),
        capabilities: caps.iter().map(|c| c.to_string()).collect(),
    }
}

fn topology(name: &str, cgs: &[&str]) -> Topology {
    Topology { name: name.into(), cache_groups: cgs.iter().map(|c| c.to_string()).collect() }
}

pub async fn seeded_repository() -> Arc<InMemoryDeliveryServiceRepository> {
    let repo = Arc::new(InMemoryDeliveryServiceRepository::new());
    for t in [
        tenant(TENANT_ROOT, "root", true, None),
        tenant(TENANT_1, "tenant1", true, Some(TENANT_ROOT)),
        tenant(TENANT_2, "tenant2", false, Some(TENANT_1)),
        tenant(TENANT_3, "tenant3", true, Some(TENANT_2)),
        tenant(TENANT_4, "tenant4", true, Some(TENANT_ROOT)),
    ] {
        repo.add_tenant(t).await;
    }
    for (id, name) in [
        (TYPE_HTTP, "HTTP"),
        (TYPE_DNS, "DNS"),
        (TYPE_STEERING, "STEERING"),
        (TYPE_CLIENT_STEERING, "CLIENT_STEERING"),
        (TYPE_ANY_MAP, "ANY_MAP"),
    ] {
        repo.add_ds_type(id, name).await;
    }
    repo.add_cdn(CDN_1).await;
    repo.add_cdn(CDN_2).await;
    for t in [
        topology("mso-topology", &["cg-edge-atl", "cg-mid", "cg-org-denver"]),
        topology("another-topology", &["cg-edge-atl", "cg-org-denver"]),
        topology("top-for-ds-req", &["cg-nocap"]),
        topology("top-with-caches-in-cdn1", &["cg-edge-atl"]),
        topology("top-only-cdn2", &["cg-edge-cdn2"]),
    ] {
        repo.add_topology(t).await;
    }
    for s in [
        server(SERVER_EDGE_ATL, "atlanta-edge-01", CDN_1, "cg-edge-atl", "EDGE", &["bar"]),
        server(SERVER_MID_ATL, "atlanta-mid-01", CDN_1, "cg-mid", "MID", &[]),
        server(SERVER_ORG_DENVER_1, "denver-mso-org-01", CDN_1, "cg-org-denver", "ORG", &[]),
        server(SERVER_ORG_DENVER_2, "denver-mso-org-02", CDN_1, "cg-org-denver", "ORG", &[]),
        server(SERVER_EDGE_CDN2, "cdn2-edge-01", CDN_2, "cg-edge-cdn2", "EDGE", &[]),
        server(SERVER_EDGE_NOCAP, "nocap-edge-01", CDN_1, "cg-nocap", "EDGE", &[]),
        server(SERVER_ASSIGNMENT_EDGE, "test-ds-server-assignments", CDN_1, "cg-edge-atl", "EDGE", &[]),
        server(SERVER_ASSIGNMENT_ORG, "test-mso-org-01", CDN_1, "cg-org-denver", "ORG", &[]),
    ] {
        repo.add_server(s).await;
    }

    let mut ds1 = fixture_fields("ds1", TENANT_1, CDN_1, TYPE_HTTP);
    ds1.required_capabilities = vec!["bar".into()];
    let mut ds_top = fixture_fields("ds-top", TENANT_1, CDN_1, TYPE_HTTP);
    ds_top.topology = Some("mso-topology".into());
    let mut steering = fixture_fields("ds-client-steering", TENANT_1, CDN_1, TYPE_CLIENT_STEERING);
    steering.org_server_fqdn = None;
    let mut top_cdn2 = fixture_fields("top-ds-in-cdn2", TENANT_1, CDN_2, TYPE_HTTP);
    top_cdn2.topology = Some("top-only-cdn2".into());
    let mut no_mids = fixture_fields("ds-based-top-with-no-mids", TENANT_1, CDN_1, TYPE_HTTP);
    no_mids.topology = Some("another-topology".into());

    // insertion order fixes the DS_* ids
    for fields in [
        ds1,
        fixture_fields("ds2", TENANT_2, CDN_1, TYPE_HTTP),
        fixture_fields("ds3", TENANT_3, CDN_1, TYPE_HTTP),
        ds_top,
        steering,
        top_cdn2,
        no_mids,
        fixture_fields("test-ds-server-assignments", TENANT_4, CDN_1, TYPE_HTTP),
        fixture_fields("ds-root", TENANT_ROOT, CDN_1, TYPE_HTTP),
    ] {
        repo.insert(fields).await.expect("fixture xml ids are unique");
    }

    repo.assign(DS_1, SERVER_EDGE_ATL).await;
    repo.assign(DS_TOP, SERVER_ORG_DENVER_1).await;
    repo.assign(DS_SERVER_ASSIGNMENTS, SERVER_ASSIGNMENT_EDGE).await;
    repo.assign(DS_SERVER_ASSIGNMENTS, SERVER_ASSIGNMENT_ORG).await;
    repo
}

pub async fn seeded_service() -> (Arc<InMemoryDeliveryServiceRepository>, DeliveryServiceService<InMemoryDeliveryServiceRepository>) {
    let repo = seeded_repository().await;
    let svc = DeliveryServiceService::new(repo.clone(), Arc::new(RulesConfig::default()));
    (repo, svc)
}

#[cfg(test)]
pub use db::get_db;
