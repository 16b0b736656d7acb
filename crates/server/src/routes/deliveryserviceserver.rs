use axum::{
    extract::{rejection::PathRejection, Path, State},
    Extension, Json,
};
use common::types::{Alert, Envelope};

use crate::auth::{ActingIdentity, ServerState};
use crate::errors::ApiError;
use crate::metrics;

/// DELETE /deliveryserviceserver/:dsid/:serverid
pub async fn unassign(
    State(state): State<ServerState>,
    Extension(identity): Extension<ActingIdentity>,
    ids: Result<Path<(i32, i32)>, PathRejection>,
) -> Result<Json<Envelope<()>>, ApiError> {
    let res = async {
        let Path((ds_id, server_id)) = ids.map_err(|r| ApiError::bad_request(r.body_text()))?;
        state
            .delivery_services
            .unassign_server(identity.tenant_id, ds_id, server_id)
            .await?;
        Ok::<_, ApiError>(Json(Envelope::alerts(vec![Alert::success(format!(
            "Server {server_id} unlinked from delivery service {ds_id}"
        ))])))
    }
    .await;
    metrics::observe("unassign_server", &res);
    res
}
