use std::sync::Arc;

use chrono::{DateTime, Utc};
use configs::RulesConfig;
use tracing::{debug, info, instrument, warn};

use crate::conditional::{Decision, Preconditions};
use crate::errors::{FieldError, ServiceError};
use crate::tenancy::TenancyGraph;

use super::assignment_guard::check_unassign;
use super::defaults::{fill_for_create, Defaulted};
use super::domain::{DeliveryService, DeliveryServiceFields, DeliveryServiceInput, Server};
use super::filter::ListQuery;
use super::repository::DeliveryServiceRepository;
use super::validation::{topology_check_needed, validate, TopologyLookup, ValidationContext};

/// Result of a `list` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOutcome {
    pub items: Vec<DeliveryService>,
    /// `If-Modified-Since` matched; `items` is empty.
    pub not_modified: bool,
    /// Newest `last_updated` among the visible records.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Delivery service business service independent of web framework.
pub struct DeliveryServiceService<R: DeliveryServiceRepository + ?Sized> {
    repo: Arc<R>,
    rules: Arc<RulesConfig>,
}

impl<R: DeliveryServiceRepository + ?Sized> Clone for DeliveryServiceService<R> {
    fn clone(&self) -> Self { Self { repo: self.repo.clone(), rules: self.rules.clone() } }
}

fn precondition(decision: Decision) -> Result<(), ServiceError> {
    match decision {
        Decision::PreconditionFailed(msg) => Err(ServiceError::PreconditionFailed(msg)),
        Decision::Proceed | Decision::NotModified => Ok(()),
    }
}

/// A write lost the compare-and-swap: report it as a failed precondition when
/// the caller asked for one, otherwise as a plain conflict.
fn lost_race(pre: &Preconditions) -> ServiceError {
    if pre.is_empty() {
        ServiceError::Conflict("delivery service was modified concurrently; retry".into())
    } else {
        ServiceError::PreconditionFailed("delivery service was modified concurrently".into())
    }
}

impl<R: DeliveryServiceRepository + ?Sized> DeliveryServiceService<R> {
    pub fn new(repo: Arc<R>, rules: Arc<RulesConfig>) -> Self { Self { repo, rules } }

    async fn tenancy(&self) -> Result<TenancyGraph, ServiceError> {
        Ok(TenancyGraph::new(self.repo.tenants().await?))
    }

    /// Fetch a record the acting tenant may write to.
    async fn load_writable(&self, graph: &TenancyGraph, acting_tenant: i32, id: i32) -> Result<DeliveryService, ServiceError> {
        let ds = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("delivery service"))?;
        if !graph.can_act(acting_tenant, ds.fields.tenant_id) {
            warn!(ds_id = id, tenant_id = acting_tenant, "write outside tenancy");
            return Err(ServiceError::Forbidden("not authorized for this delivery service's tenant".into()));
        }
        Ok(ds)
    }

    async fn check(
        &self,
        graph: &TenancyGraph,
        acting_tenant: i32,
        candidate: &DeliveryServiceFields,
        existing: Option<&DeliveryService>,
        assigned: &[Server],
        missing: Vec<FieldError>,
    ) -> Result<(), ServiceError> {
        let kind = self.repo.find_ds_kind(candidate.type_id).await?;
        let cdn_exists = self.repo.cdn_exists(candidate.cdn_id).await?;
        let xml_id_taken = match self.repo.find_by_xml_id(&candidate.xml_id).await? {
            Some(other) => existing.map_or(true, |e| e.id != other.id),
            None => false,
        };
        let topology = match candidate.topology.as_deref() {
            Some(name) if topology_check_needed(candidate, existing) => match self.repo.find_topology(name).await? {
                Some(topology) => {
                    let caches = self.repo.servers_in_cache_groups(&topology.cache_groups).await?;
                    TopologyLookup::Found { topology, caches }
                }
                None => TopologyLookup::Missing,
            },
            _ => TopologyLookup::NotRequested,
        };
        let ctx = ValidationContext {
            rules: &self.rules,
            kind,
            cdn_exists,
            xml_id_taken,
            tenant_permitted: graph.can_act(acting_tenant, candidate.tenant_id),
            topology,
            assigned,
        };
        // a missing required field stands in for every rule about that field
        let mut errs = missing;
        let reported: Vec<String> = errs.iter().map(|e| e.field.clone()).collect();
        errs.extend(validate(candidate, existing, &ctx).into_iter().filter(|e| !reported.contains(&e.field)));
        if errs.is_empty() {
            return Ok(());
        }
        debug!(count = errs.len(), xml_id = %candidate.xml_id, "delivery service rejected by validation");
        Err(ServiceError::from_field_errors(errs))
    }

    /// List delivery services visible to `acting_tenant`.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use configs::RulesConfig;
    /// use service::DeliveryServiceService;
    /// use service::conditional::Preconditions;
    /// use service::delivery_service::{ListQuery, repository::memory::InMemoryDeliveryServiceRepository};
    /// use service::tenancy::Tenant;
    /// let repo = Arc::new(InMemoryDeliveryServiceRepository::new());
    /// tokio_test::block_on(repo.add_tenant(Tenant { id: 1, name: "root".into(), active: true, parent_id: None }));
    /// let svc = DeliveryServiceService::new(repo, Arc::new(RulesConfig::default()));
    /// let out = tokio_test::block_on(svc.list(1, &ListQuery::default(), &Preconditions::default())).unwrap();
    /// assert!(out.items.is_empty() && !out.not_modified);
    /// ```
    #[instrument(skip(self, query, pre), fields(tenant_id = acting_tenant))]
    pub async fn list(&self, acting_tenant: i32, query: &ListQuery, pre: &Preconditions) -> Result<ListOutcome, ServiceError> {
        let graph = self.tenancy().await?;
        let mut visible = graph.visible_tenants(acting_tenant);
        if let Some(other) = query.filter.accessible_to {
            let accessible = graph.visible_tenants(other);
            visible.retain(|t| accessible.contains(t));
        }
        let items: Vec<DeliveryService> = self
            .repo
            .list(&query.filter)
            .await?
            .into_iter()
            .filter(|d| visible.contains(&d.fields.tenant_id))
            .collect();

        let last_modified = items.iter().map(|d| d.last_updated).max();
        if pre.evaluate_read(last_modified) == Decision::NotModified {
            debug!("list not modified");
            return Ok(ListOutcome { items: Vec::new(), not_modified: true, last_modified });
        }
        let items = query.page.apply(items);
        debug!(count = items.len(), "listed delivery services");
        Ok(ListOutcome { items, not_modified: false, last_modified })
    }

    /// Create a delivery service after defaulting and validating the body.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use configs::RulesConfig;
    /// use service::DeliveryServiceService;
    /// use service::conditional::Preconditions;
    /// use service::delivery_service::{DeliveryServiceInput, repository::memory::InMemoryDeliveryServiceRepository};
    /// use service::tenancy::Tenant;
    /// let repo = Arc::new(InMemoryDeliveryServiceRepository::new());
    /// tokio_test::block_on(async {
    ///     repo.add_tenant(Tenant { id: 1, name: "root".into(), active: true, parent_id: None }).await;
    ///     repo.add_cdn(1).await;
    ///     repo.add_ds_type(2, "DNS").await;
    /// });
    /// let svc = DeliveryServiceService::new(repo, Arc::new(RulesConfig::default()));
    /// let input = DeliveryServiceInput {
    ///     xml_id: Some("doc-ds".into()), tenant_id: Some(1), cdn_id: Some(1),
    ///     type_id: Some(2), display_name: Some("doc".into()), ..Default::default()
    /// };
    /// let ds = tokio_test::block_on(svc.create(1, input, &Preconditions::default())).unwrap();
    /// assert_eq!(ds.fields.xml_id, "doc-ds");
    /// assert!(ds.fields.active);
    /// ```
    #[instrument(skip(self, input, pre), fields(tenant_id = acting_tenant, xml_id = ?input.xml_id))]
    pub async fn create(&self, acting_tenant: i32, input: DeliveryServiceInput, pre: &Preconditions) -> Result<DeliveryService, ServiceError> {
        precondition(pre.evaluate_write(None))?;
        let Defaulted { fields: candidate, missing } = fill_for_create(input, &self.rules);
        let graph = self.tenancy().await?;
        self.check(&graph, acting_tenant, &candidate, None, &[], missing).await?;
        let created = self.repo.insert(candidate).await?;
        info!(ds_id = created.id, xml_id = %created.fields.xml_id, "delivery_service_created");
        Ok(created)
    }

    /// Merge `patch` onto the stored record, validate and write it.
    #[instrument(skip(self, patch, pre), fields(tenant_id = acting_tenant, ds_id = id))]
    pub async fn update(&self, acting_tenant: i32, id: i32, patch: DeliveryServiceInput, pre: &Preconditions) -> Result<DeliveryService, ServiceError> {
        let graph = self.tenancy().await?;
        let existing = self.load_writable(&graph, acting_tenant, id).await?;
        precondition(pre.evaluate_write(Some(existing.last_updated)))?;

        let candidate = patch.merge_into(existing.fields.clone());
        let assigned = self.repo.assigned_servers(id).await?;
        self.check(&graph, acting_tenant, &candidate, Some(&existing), &assigned, Vec::new()).await?;

        let updated = self
            .repo
            .update(id, candidate, existing.last_updated)
            .await?
            .ok_or_else(|| lost_race(pre))?;
        info!(ds_id = id, xml_id = %updated.fields.xml_id, "delivery_service_updated");
        Ok(updated)
    }

    /// Delete a delivery service together with its server assignments.
    #[instrument(skip(self, pre), fields(tenant_id = acting_tenant, ds_id = id))]
    pub async fn delete(&self, acting_tenant: i32, id: i32, pre: &Preconditions) -> Result<DeliveryService, ServiceError> {
        let graph = self.tenancy().await?;
        let existing = self.load_writable(&graph, acting_tenant, id).await?;
        precondition(pre.evaluate_write(Some(existing.last_updated)))?;
        if !self.repo.delete(id, existing.last_updated).await? {
            return Err(lost_race(pre));
        }
        info!(ds_id = id, xml_id = %existing.fields.xml_id, "delivery_service_deleted");
        Ok(existing)
    }

    /// Remove one server assignment, keeping the last edge/origin of non-topology services.
    #[instrument(skip(self), fields(tenant_id = acting_tenant))]
    pub async fn unassign_server(&self, acting_tenant: i32, ds_id: i32, server_id: i32) -> Result<(), ServiceError> {
        let graph = self.tenancy().await?;
        let ds = self.load_writable(&graph, acting_tenant, ds_id).await?;
        let guard = |assigned: &[Server]| check_unassign(&ds, assigned, server_id);
        self.repo.unassign_server(ds_id, server_id, &guard).await?;
        info!(ds_id, server_id, "delivery_service_server_unassigned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use chrono::Duration;
    use serde_json::json;
    use std::collections::HashMap;

    fn query(pairs: &[(&str, &str)]) -> ListQuery {
        let params: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ListQuery::from_params(&params).unwrap()
    }

    fn input(v: serde_json::Value) -> DeliveryServiceInput { serde_json::from_value(v).unwrap() }

    fn xml_ids(items: &[DeliveryService]) -> Vec<&str> { items.iter().map(|d| d.fields.xml_id.as_str()).collect() }

    fn none() -> Preconditions { Preconditions::default() }

    #[tokio::test]
    async fn list_is_scoped_to_tenancy() -> Result<(), anyhow::Error> {
        let (_, svc) = seeded_service().await;
        assert_eq!(svc.list(TENANT_ROOT, &query(&[]), &none()).await?.items.len(), 9);

        let t1 = svc.list(TENANT_1, &query(&[("orderby", "id")]), &none()).await?;
        assert_eq!(
            xml_ids(&t1.items),
            vec!["ds1", "ds2", "ds3", "ds-top", "ds-client-steering", "top-ds-in-cdn2", "ds-based-top-with-no-mids"]
        );

        let t4 = svc.list(TENANT_4, &query(&[]), &none()).await?;
        assert_eq!(xml_ids(&t4.items), vec!["test-ds-server-assignments"]);

        // inactive tenant and the active tenant beneath it see nothing
        assert!(svc.list(TENANT_2, &query(&[]), &none()).await?.items.is_empty());
        assert!(svc.list(TENANT_3, &query(&[]), &none()).await?.items.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn list_filters_and_accessible_to() -> Result<(), anyhow::Error> {
        let (_, svc) = seeded_service().await;
        let acc = svc.list(TENANT_ROOT, &query(&[("accessibleTo", "5")]), &none()).await?;
        assert_eq!(xml_ids(&acc.items), vec!["test-ds-server-assignments"]);

        let cdn2 = svc.list(TENANT_ROOT, &query(&[("cdn", "2")]), &none()).await?;
        assert_eq!(xml_ids(&cdn2.items), vec!["top-ds-in-cdn2"]);

        let topo = svc.list(TENANT_ROOT, &query(&[("topology", "mso-topology")]), &none()).await?;
        assert_eq!(xml_ids(&topo.items), vec!["ds-top"]);

        let unknown = svc.list(TENANT_ROOT, &query(&[("xmlId", "no-such-ds")]), &none()).await?;
        assert!(unknown.items.is_empty());
        assert!(!unknown.not_modified);

        // outside the caller's tenancy the filter still yields nothing
        let hidden = svc.list(TENANT_4, &query(&[("xmlId", "ds1")]), &none()).await?;
        assert!(hidden.items.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn list_pagination_offset_matches_page() -> Result<(), anyhow::Error> {
        let (_, svc) = seeded_service().await;
        let by_offset = svc.list(TENANT_ROOT, &query(&[("orderby", "id"), ("limit", "1"), ("offset", "1")]), &none()).await?;
        let by_page = svc.list(TENANT_ROOT, &query(&[("orderby", "id"), ("limit", "1"), ("page", "2")]), &none()).await?;
        assert_eq!(by_offset.items, by_page.items);
        assert_eq!(by_offset.items[0].id, DS_2);

        let asc = svc.list(TENANT_ROOT, &query(&[("orderby", "xmlId")]), &none()).await?;
        let mut desc = svc.list(TENANT_ROOT, &query(&[("orderby", "xmlId"), ("sortOrder", "desc")]), &none()).await?;
        desc.items.reverse();
        assert_eq!(asc.items, desc.items);
        Ok(())
    }

    #[tokio::test]
    async fn list_honours_if_modified_since() -> Result<(), anyhow::Error> {
        let (_, svc) = seeded_service().await;
        let future = Preconditions { if_modified_since: Some(Utc::now() + Duration::hours(1)), ..Default::default() };
        let out = svc.list(TENANT_ROOT, &query(&[]), &future).await?;
        assert!(out.not_modified);
        assert!(out.items.is_empty());

        let past = Preconditions { if_modified_since: Some(Utc::now() - Duration::hours(1)), ..Default::default() };
        assert_eq!(svc.list(TENANT_ROOT, &query(&[]), &past).await?.items.len(), 9);
        Ok(())
    }

    #[tokio::test]
    async fn create_tls_versions_depend_on_type() -> Result<(), anyhow::Error> {
        let (_, svc) = seeded_service().await;
        let body = |xml: &str, ty: i32| {
            input(json!({
                "xmlId": xml, "tenantId": TENANT_1, "cdnId": CDN_1, "typeId": ty, "displayName": xml,
                "orgServerFqdn": "http://origin.example.net", "tlsVersions": ["1.1", "1.2"]
            }))
        };
        let err = svc.create(TENANT_1, body("steer-tls", TYPE_STEERING), &none()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e[0].field == "tlsVersions"));
        let ok = svc.create(TENANT_1, body("http-tls", TYPE_HTTP), &none()).await?;
        assert_eq!(ok.fields.tls_versions, vec!["1.1".to_string(), "1.2".to_string()]);
        assert!(ok.fields.active);
        assert_eq!(ok.fields.routing_name, "cdn");
        Ok(())
    }

    #[tokio::test]
    async fn create_rejects_bad_country_codes() -> Result<(), anyhow::Error> {
        let (_, svc) = seeded_service().await;
        let body = input(json!({
            "xmlId": "geo", "tenantId": TENANT_1, "cdnId": CDN_1, "typeId": TYPE_DNS, "displayName": "geo",
            "geoLimit": 1, "geoLimitCountries": ["US", 1]
        }));
        let err = svc.create(TENANT_1, body, &none()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e[0].field == "geoLimitCountries"));

        let body = input(json!({
            "xmlId": "geo", "tenantId": TENANT_1, "cdnId": CDN_1, "typeId": TYPE_DNS, "displayName": "geo",
            "geoLimit": 1, "geoLimitCountries": "US,CA"
        }));
        assert_eq!(svc.create(TENANT_1, body, &none()).await?.fields.geo_limit_countries.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn create_conflicts_forbidden_and_missing_fields() -> Result<(), anyhow::Error> {
        let (_, svc) = seeded_service().await;
        let dup = input(json!({
            "xmlId": "ds1", "tenantId": TENANT_1, "cdnId": CDN_1, "typeId": TYPE_DNS, "displayName": "again"
        }));
        assert!(matches!(svc.create(TENANT_1, dup, &none()).await, Err(ServiceError::Conflict(_))));

        let foreign = input(json!({
            "xmlId": "foreign", "tenantId": TENANT_1, "cdnId": CDN_1, "typeId": TYPE_DNS, "displayName": "f"
        }));
        assert!(matches!(svc.create(TENANT_4, foreign, &none()).await, Err(ServiceError::Forbidden(_))));

        match svc.create(TENANT_1, input(json!({"cdnId": CDN_1})), &none()).await {
            Err(ServiceError::Validation(errs)) => assert_eq!(errs.len(), 4),
            other => panic!("unexpected {other:?}"),
        }

        let if_match = Preconditions { if_match: Some(vec!["*".into()]), ..Default::default() };
        let body = input(json!({
            "xmlId": "cond", "tenantId": TENANT_1, "cdnId": CDN_1, "typeId": TYPE_DNS, "displayName": "c"
        }));
        assert!(matches!(svc.create(TENANT_1, body, &if_match).await, Err(ServiceError::PreconditionFailed(_))));
        Ok(())
    }

    #[tokio::test]
    async fn create_reports_missing_fields_with_rule_violations() -> Result<(), anyhow::Error> {
        let (_, svc) = seeded_service().await;
        let body = input(json!({
            "tenantId": TENANT_1, "cdnId": CDN_1, "typeId": TYPE_STEERING, "displayName": "no-xml",
            "tlsVersions": ["1.2"], "geoLimit": 1, "geoLimitCountries": ["US", 12], "rangeRequestHandling": 3
        }));
        let errs = match svc.create(TENANT_1, body, &none()).await {
            Err(ServiceError::Validation(errs)) => errs,
            other => panic!("unexpected {other:?}"),
        };
        let fields: Vec<&str> = errs.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields[0], "xmlId");
        assert_eq!(errs[0].message, "required");
        // the empty xmlId is reported once, as missing
        assert_eq!(fields.iter().filter(|f| **f == "xmlId").count(), 1);
        for expected in ["tlsVersions", "geoLimitCountries", "rangeSliceBlockSize"] {
            assert!(fields.contains(&expected), "{expected} not reported in {fields:?}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn create_topology_rules()-> Result<(), anyhow::Error> {
        let (_, svc) = seeded_service().await;
        let body = |xml: &str, cdn: i32, top: &str| {
            input(json!({
                "xmlId": xml, "tenantId": TENANT_1, "cdnId": cdn, "typeId": TYPE_HTTP, "displayName": xml,
                "orgServerFqdn": "http://origin.example.net", "topology": top, "requiredCapabilities": ["bar"]
            }))
        };
        let lacking = svc.create(TENANT_1, body("req-nocap", CDN_1, "top-for-ds-req"), &none()).await.unwrap_err();
        assert!(matches!(lacking, ServiceError::Validation(ref e) if e[0].message.contains("bar")));

        let wrong_cdn = svc.create(TENANT_1, body("req-cdn2", CDN_2, "mso-topology"), &none()).await.unwrap_err();
        assert!(matches!(wrong_cdn, ServiceError::Validation(ref e) if e[0].field == "topology"));

        let missing = svc.create(TENANT_1, body("req-missing", CDN_1, "no-such-topology"), &none()).await.unwrap_err();
        assert!(matches!(missing, ServiceError::Validation(_)));

        let ok = svc.create(TENANT_1, body("req-ok", CDN_1, "top-with-caches-in-cdn1"), &none()).await?;
        assert_eq!(ok.fields.topology.as_deref(), Some("top-with-caches-in-cdn1"));
        Ok(())
    }

    #[tokio::test]
    async fn update_preconditions() -> Result<(), anyhow::Error> {
        let (repo, svc) = seeded_service().await;
        let current = repo.get(DS_1).await?.unwrap();
        let patch = || input(json!({"displayName": "renamed"}));

        let before = Preconditions { if_unmodified_since: Some(current.last_updated - Duration::hours(1)), ..Default::default() };
        assert!(matches!(svc.update(TENANT_1, DS_1, patch(), &before).await, Err(ServiceError::PreconditionFailed(_))));

        let stale_tag = Preconditions { if_match: Some(vec!["\"v1-stale\"".into()]), ..Default::default() };
        assert!(matches!(svc.update(TENANT_1, DS_1, patch(), &stale_tag).await, Err(ServiceError::PreconditionFailed(_))));

        let after = Preconditions { if_unmodified_since: Some(current.last_updated + Duration::hours(1)), ..Default::default() };
        let updated = svc.update(TENANT_1, DS_1, patch(), &after).await?;
        assert_eq!(updated.fields.display_name, "renamed");
        assert!(updated.last_updated > current.last_updated);

        let tagged = Preconditions { if_match: Some(vec![updated.etag()]), ..Default::default() };
        let again = svc.update(TENANT_1, DS_1, input(json!({"dscp": 10})), &tagged).await?;
        assert_eq!(again.fields.dscp, 10);
        assert_eq!(again.fields.display_name, "renamed");
        Ok(())
    }

    #[tokio::test]
    async fn update_scope_and_existence() -> Result<(), anyhow::Error> {
        let (_, svc) = seeded_service().await;
        let patch = || input(json!({"displayName": "x"}));
        assert!(matches!(svc.update(TENANT_4, DS_1, patch(), &none()).await, Err(ServiceError::Forbidden(_))));
        assert!(matches!(svc.update(TENANT_1, 999, patch(), &none()).await, Err(ServiceError::NotFound(_))));
        // moving a record into a tenant outside the caller's tenancy
        let moved = input(json!({"tenantId": TENANT_4}));
        assert!(matches!(svc.update(TENANT_1, DS_1, moved, &none()).await, Err(ServiceError::Forbidden(_))));
        let renamed = input(json!({"xmlId": "ds1-renamed"}));
        assert!(matches!(svc.update(TENANT_1, DS_1, renamed, &none()).await, Err(ServiceError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn update_topology_rules() -> Result<(), anyhow::Error> {
        let (_, svc) = seeded_service().await;
        // origins are assigned to ds-top, so its topology is pinned
        let change = input(json!({"topology": "another-topology"}));
        assert!(matches!(svc.update(TENANT_1, DS_TOP, change, &none()).await, Err(ServiceError::Validation(_))));
        let same = input(json!({"topology": "mso-topology", "lastHeaderRewrite": "set-header X-Edge 1"}));
        assert!(svc.update(TENANT_1, DS_TOP, same, &none()).await.is_ok());

        let steering = input(json!({"topology": "mso-topology"}));
        assert!(matches!(
            svc.update(TENANT_1, DS_CLIENT_STEERING, steering, &none()).await,
            Err(ServiceError::Validation(_))
        ));

        // ds1 requires "bar"; the nocap topology cannot satisfy it
        let nocap = input(json!({"topology": "top-for-ds-req"}));
        assert!(matches!(svc.update(TENANT_1, DS_1, nocap, &none()).await, Err(ServiceError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn update_header_rewrite_and_slice_rules() -> Result<(), anyhow::Error> {
        let (_, svc) = seeded_service().await;
        let topo_rw = input(json!({"firstHeaderRewrite": "rw"}));
        assert!(matches!(svc.update(TENANT_1, DS_1, topo_rw, &none()).await, Err(ServiceError::Validation(_))));
        let legacy = input(json!({"edgeHeaderRewrite": "rw", "midHeaderRewrite": "rw"}));
        assert!(svc.update(TENANT_1, DS_1, legacy, &none()).await.is_ok());
        let legacy_on_topo = input(json!({"midHeaderRewrite": "rw"}));
        assert!(matches!(svc.update(TENANT_1, DS_TOP, legacy_on_topo, &none()).await, Err(ServiceError::Validation(_))));

        let slice = input(json!({"rangeRequestHandling": 3, "rangeSliceBlockSize": 262144}));
        assert!(svc.update(TENANT_1, DS_1, slice, &none()).await.is_ok());
        let no_size = input(json!({"rangeSliceBlockSize": null}));
        assert!(matches!(svc.update(TENANT_1, DS_1, no_size, &none()).await, Err(ServiceError::Validation(_))));
        let back = input(json!({"rangeRequestHandling": 0}));
        assert!(matches!(svc.update(TENANT_1, DS_1, back, &none()).await, Err(ServiceError::Validation(_))));
        let cleared = input(json!({"rangeRequestHandling": 0, "rangeSliceBlockSize": null}));
        assert!(svc.update(TENANT_1, DS_1, cleared, &none()).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn delete_checks_tenancy_and_preconditions() -> Result<(), anyhow::Error> {
        let (repo, svc) = seeded_service().await;
        assert!(matches!(svc.delete(TENANT_4, DS_1, &none()).await, Err(ServiceError::Forbidden(_))));

        let current = repo.get(DS_SERVER_ASSIGNMENTS).await?.unwrap();
        let stale = Preconditions { if_unmodified_since: Some(current.last_updated - Duration::days(1)), ..Default::default() };
        assert!(matches!(
            svc.delete(TENANT_4, DS_SERVER_ASSIGNMENTS, &stale).await,
            Err(ServiceError::PreconditionFailed(_))
        ));

        let deleted = svc.delete(TENANT_4, DS_SERVER_ASSIGNMENTS, &none()).await?;
        assert_eq!(deleted.id, DS_SERVER_ASSIGNMENTS);
        assert!(repo.get(DS_SERVER_ASSIGNMENTS).await?.is_none());
        assert!(repo.assigned_servers(DS_SERVER_ASSIGNMENTS).await?.is_empty());
        assert!(matches!(svc.delete(TENANT_4, DS_SERVER_ASSIGNMENTS, &none()).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn unassign_keeps_last_edge_and_origin() -> Result<(), anyhow::Error> {
        let (repo, svc) = seeded_service().await;
        assert!(matches!(
            svc.unassign_server(TENANT_1, DS_1, SERVER_EDGE_ATL).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            svc.unassign_server(TENANT_4, DS_SERVER_ASSIGNMENTS, SERVER_ASSIGNMENT_ORG).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            svc.unassign_server(TENANT_1, DS_1, SERVER_EDGE_CDN2).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            svc.unassign_server(TENANT_4, DS_1, SERVER_EDGE_ATL).await,
            Err(ServiceError::Forbidden(_))
        ));

        // topology-based: the sole origin may go
        svc.unassign_server(TENANT_1, DS_TOP, SERVER_ORG_DENVER_1).await?;
        assert!(repo.assigned_servers(DS_TOP).await?.is_empty());

        // a non-sole edge may go
        repo.assign(DS_1, SERVER_EDGE_NOCAP).await;
        svc.unassign_server(TENANT_1, DS_1, SERVER_EDGE_NOCAP).await?;
        assert_eq!(repo.assigned_servers(DS_1).await?.len(), 1);
        Ok(())
    }
}
