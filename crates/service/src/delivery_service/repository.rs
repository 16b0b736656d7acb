use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::ServiceError;
use crate::tenancy::Tenant;

use super::domain::{DeliveryService, DeliveryServiceFields, DsKind, Server, Topology};
use super::filter::DeliveryServiceFilter;

/// Check run against the current assignments while the repository holds them stable.
pub type AssignmentGuard<'a> = &'a (dyn Fn(&[Server]) -> Result<(), ServiceError> + Send + Sync);

/// Persistence seen by the delivery service rules.
///
/// Writes compare-and-swap on `last_updated` so a precondition check and the
/// write that follows it cannot interleave with another writer.
#[async_trait]
pub trait DeliveryServiceRepository: Send + Sync {
    async fn tenants(&self) -> Result<Vec<Tenant>, ServiceError>;
    async fn find_ds_kind(&self, type_id: i32) -> Result<Option<DsKind>, ServiceError>;
    async fn cdn_exists(&self, cdn_id: i32) -> Result<bool, ServiceError>;
    async fn find_topology(&self, name: &str) -> Result<Option<Topology>, ServiceError>;
    async fn servers_in_cache_groups(&self, cache_groups: &[String]) -> Result<Vec<Server>, ServiceError>;
    async fn assigned_servers(&self, ds_id: i32) -> Result<Vec<Server>, ServiceError>;

    async fn list(&self, filter: &DeliveryServiceFilter) -> Result<Vec<DeliveryService>, ServiceError>;
    async fn get(&self, id: i32) -> Result<Option<DeliveryService>, ServiceError>;
    async fn find_by_xml_id(&self, xml_id: &str) -> Result<Option<DeliveryService>, ServiceError>;
    /// Fails with `Conflict` when `xml_id` is taken.
    async fn insert(&self, fields: DeliveryServiceFields) -> Result<DeliveryService, ServiceError>;
    /// `Ok(None)` when the row is gone or its `last_updated` no longer equals `expected`.
    async fn update(&self, id: i32, fields: DeliveryServiceFields, expected: DateTime<Utc>) -> Result<Option<DeliveryService>, ServiceError>;
    /// Removes the row and its server assignments; `false` on a lost race.
    async fn delete(&self, id: i32, expected: DateTime<Utc>) -> Result<bool, ServiceError>;
    /// Remove one assignment after `guard` accepted the current assignment set.
    async fn unassign_server(&self, ds_id: i32, server_id: i32, guard: AssignmentGuard<'_>) -> Result<(), ServiceError>;
}

/// Timestamp for a new write: now at microsecond precision, strictly after `prev`.
pub(crate) fn next_timestamp(prev: Option<DateTime<Utc>>) -> DateTime<Utc> {
    use chrono::SubsecRound;
    let now = Utc::now().trunc_subsecs(6);
    match prev {
        Some(p) if now <= p => p + chrono::Duration::microseconds(1),
        _ => now,
    }
}

/// In-memory repository for tests and local runs without a database.
pub mod memory {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct State {
        tenants: BTreeMap<i32, Tenant>,
        ds_types: HashMap<i32, String>,
        cdns: HashSet<i32>,
        topologies: HashMap<String, Topology>,
        servers: BTreeMap<i32, Server>,
        services: BTreeMap<i32, DeliveryService>,
        assignments: BTreeSet<(i32, i32)>,
        next_id: i32,
        last_write: Option<DateTime<Utc>>,
    }

    impl State {
        fn xml_id_taken(&self, xml_id: &str, except: Option<i32>) -> bool {
            self.services.values().any(|d| d.fields.xml_id == xml_id && Some(d.id) != except)
        }

        fn assigned(&self, ds_id: i32) -> Vec<Server> {
            self.assignments
                .range((ds_id, i32::MIN)..=(ds_id, i32::MAX))
                .filter_map(|(_, sid)| self.servers.get(sid).cloned())
                .collect()
        }

        fn stamp(&mut self) -> DateTime<Utc> {
            let ts = next_timestamp(self.last_write);
            self.last_write = Some(ts);
            ts
        }
    }

    #[derive(Default)]
    pub struct InMemoryDeliveryServiceRepository {
        state: RwLock<State>,
    }

    impl InMemoryDeliveryServiceRepository {
        pub fn new() -> Self { Self::default() }

        pub async fn add_tenant(&self, tenant: Tenant) {
            self.state.write().await.tenants.insert(tenant.id, tenant);
        }

        pub async fn add_ds_type(&self, id: i32, name: &str) {
            self.state.write().await.ds_types.insert(id, name.to_string());
        }

        pub async fn add_cdn(&self, id: i32) {
            self.state.write().await.cdns.insert(id);
        }

        pub async fn add_topology(&self, topology: Topology) {
            self.state.write().await.topologies.insert(topology.name.clone(), topology);
        }

        pub async fn add_server(&self, server: Server) {
            self.state.write().await.servers.insert(server.id, server);
        }

        pub async fn assign(&self, ds_id: i32, server_id: i32) {
            self.state.write().await.assignments.insert((ds_id, server_id));
        }
    }

    #[async_trait]
    impl DeliveryServiceRepository for InMemoryDeliveryServiceRepository {
        async fn tenants(&self) -> Result<Vec<Tenant>, ServiceError> {
            Ok(self.state.read().await.tenants.values().cloned().collect())
        }

        async fn find_ds_kind(&self, type_id: i32) -> Result<Option<DsKind>, ServiceError> {
            Ok(self.state.read().await.ds_types.get(&type_id).and_then(|n| DsKind::from_name(n)))
        }

        async fn cdn_exists(&self, cdn_id: i32) -> Result<bool, ServiceError> {
            Ok(self.state.read().await.cdns.contains(&cdn_id))
        }

        async fn find_topology(&self, name: &str) -> Result<Option<Topology>, ServiceError> {
            Ok(self.state.read().await.topologies.get(name).cloned())
        }

        async fn servers_in_cache_groups(&self, cache_groups: &[String]) -> Result<Vec<Server>, ServiceError> {
            let st = self.state.read().await;
            Ok(st.servers.values().filter(|s| cache_groups.contains(&s.cache_group)).cloned().collect())
        }

        async fn assigned_servers(&self, ds_id: i32) -> Result<Vec<Server>, ServiceError> {
            Ok(self.state.read().await.assigned(ds_id))
        }

        async fn list(&self, filter: &DeliveryServiceFilter) -> Result<Vec<DeliveryService>, ServiceError> {
            let st = self.state.read().await;
            Ok(st.services.values().filter(|d| filter.matches(d)).cloned().collect())
        }

        async fn get(&self, id: i32) -> Result<Option<DeliveryService>, ServiceError> {
            Ok(self.state.read().await.services.get(&id).cloned())
        }

        async fn find_by_xml_id(&self, xml_id: &str) -> Result<Option<DeliveryService>, ServiceError> {
            let st = self.state.read().await;
            Ok(st.services.values().find(|d| d.fields.xml_id == xml_id).cloned())
        }

        async fn insert(&self, fields: DeliveryServiceFields) -> Result<DeliveryService, ServiceError> {
            let mut st = self.state.write().await;
            if st.xml_id_taken(&fields.xml_id, None) {
                return Err(ServiceError::Conflict(format!("xmlId '{}' already exists", fields.xml_id)));
            }
            st.next_id += 1;
            let id = st.next_id;
            let ds = DeliveryService { id, last_updated: st.stamp(), fields };
            st.services.insert(id, ds.clone());
            Ok(ds)
        }

        async fn update(&self, id: i32, fields: DeliveryServiceFields, expected: DateTime<Utc>) -> Result<Option<DeliveryService>, ServiceError> {
            let mut st = self.state.write().await;
            match st.services.get(&id) {
                Some(cur) if cur.last_updated == expected => {}
                _ => return Ok(None),
            }
            if st.xml_id_taken(&fields.xml_id, Some(id)) {
                return Err(ServiceError::Conflict(format!("xmlId '{}' already exists", fields.xml_id)));
            }
            let ds = DeliveryService { id, last_updated: st.stamp(), fields };
            st.services.insert(id, ds.clone());
            Ok(Some(ds))
        }

        async fn delete(&self, id: i32, expected: DateTime<Utc>) -> Result<bool, ServiceError> {
            let mut st = self.state.write().await;
            match st.services.get(&id) {
                Some(cur) if cur.last_updated == expected => {}
                _ => return Ok(false),
            }
            st.services.remove(&id);
            st.assignments.retain(|(ds, _)| *ds != id);
            Ok(true)
        }

        async fn unassign_server(&self, ds_id: i32, server_id: i32, guard: AssignmentGuard<'_>) -> Result<(), ServiceError> {
            let mut st = self.state.write().await;
            guard(&st.assigned(ds_id))?;
            if !st.assignments.remove(&(ds_id, server_id)) {
                return Err(ServiceError::not_found("delivery service server assignment"));
            }
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::test_support::fixture_fields;

        #[tokio::test]
        async fn update_is_compare_and_swap() -> Result<(), anyhow::Error> {
            let repo = InMemoryDeliveryServiceRepository::new();
            let created = repo.insert(fixture_fields("cas", 1, 1, 1)).await?;
            let mut f = created.fields.clone();
            f.display_name = "first".into();
            let first = repo.update(created.id, f.clone(), created.last_updated).await?.unwrap();
            assert!(first.last_updated > created.last_updated);

            f.display_name = "second".into();
            assert!(repo.update(created.id, f, created.last_updated).await?.is_none());
            assert!(!repo.delete(created.id, created.last_updated).await?);
            assert!(repo.delete(created.id, first.last_updated).await?);
            assert!(repo.get(created.id).await?.is_none());
            Ok(())
        }

        #[tokio::test]
        async fn insert_rejects_duplicate_xml_id() -> Result<(), anyhow::Error> {
            let repo = InMemoryDeliveryServiceRepository::new();
            repo.insert(fixture_fields("dup", 1, 1, 1)).await?;
            let err = repo.insert(fixture_fields("dup", 1, 1, 1)).await.unwrap_err();
            assert!(matches!(err, ServiceError::Conflict(_)));
            Ok(())
        }
    }
}
