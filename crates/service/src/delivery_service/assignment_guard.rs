//! Cardinality rules for removing a server from a delivery service.

use crate::errors::ServiceError;

use super::domain::{DeliveryService, Server, ServerRole};

/// Check that `server_id` may be removed from `ds`, given its current `assigned` servers.
///
/// A delivery service without a topology must keep at least one edge, and at
/// least one origin if it had any. Topology-based delivery services pick caches
/// from the topology, so their direct assignments are unconstrained.
pub fn check_unassign(ds: &DeliveryService, assigned: &[Server], server_id: i32) -> Result<(), ServiceError> {
    let Some(target) = assigned.iter().find(|s| s.id == server_id) else {
        return Err(ServiceError::NotFound(format!(
            "server {server_id} is not assigned to delivery service {}",
            ds.fields.xml_id
        )));
    };
    if ds.fields.topology.is_some() {
        return Ok(());
    }
    let role = target.role();
    let label = match role {
        ServerRole::Edge => "EDGE",
        ServerRole::Origin => "ORG",
        ServerRole::Mid | ServerRole::Other => return Ok(()),
    };
    let remaining = assigned.iter().filter(|s| s.id != server_id && s.role() == role).count();
    if remaining == 0 {
        return Err(ServiceError::Conflict(format!(
            "cannot remove the last {label} server from delivery service {} without a topology",
            ds.fields.xml_id
        )));
    }
    Ok(())
}

pub fn can_unassign(ds: &DeliveryService, assigned: &[Server], server_id: i32) -> bool {
    check_unassign(ds, assigned, server_id).is_ok()
}
