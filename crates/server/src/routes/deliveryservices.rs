use std::collections::HashMap;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::{header::LAST_MODIFIED, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use common::types::{Alert, Envelope};
use serde_json::Value;
use service::delivery_service::{DeliveryServiceInput, ListQuery};

use crate::auth::{ActingIdentity, ServerState};
use crate::errors::ApiError;
use crate::{headers, metrics};

fn set_last_modified(resp: &mut Response, t: Option<DateTime<Utc>>) {
    if let Some(v) = t.and_then(|t| HeaderValue::from_str(&headers::http_date(t)).ok()) {
        resp.headers_mut().insert(LAST_MODIFIED, v);
    }
}

/// Bodies are read as raw JSON first so that type errors surface as 400, not 422.
fn parse_body(body: Result<Json<Value>, JsonRejection>) -> Result<DeliveryServiceInput, ApiError> {
    let Json(value) = body.map_err(|r| ApiError::bad_request(r.body_text()))?;
    serde_json::from_value(value).map_err(|e| ApiError::bad_request(format!("invalid delivery service: {e}")))
}

fn parse_id(id: Result<Path<i32>, PathRejection>) -> Result<i32, ApiError> {
    id.map(|Path(id)| id).map_err(|r| ApiError::bad_request(r.body_text()))
}

/// GET /deliveryservices
pub async fn list(
    State(state): State<ServerState>,
    Extension(identity): Extension<ActingIdentity>,
    Query(params): Query<HashMap<String, String>>,
    header_map: HeaderMap,
) -> Result<Response, ApiError> {
    let res = async {
        let query = ListQuery::from_params(&params)?;
        let pre = headers::preconditions(&header_map)?;
        let out = state.delivery_services.list(identity.tenant_id, &query, &pre).await?;
        let mut resp = if out.not_modified {
            StatusCode::NOT_MODIFIED.into_response()
        } else {
            Json(Envelope::response(out.items)).into_response()
        };
        set_last_modified(&mut resp, out.last_modified);
        Ok::<_, ApiError>(resp)
    }
    .await;
    metrics::observe("list", &res);
    res
}

/// POST /deliveryservices
pub async fn create(
    State(state): State<ServerState>,
    Extension(identity): Extension<ActingIdentity>,
    header_map: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let res = async {
        let input = parse_body(body)?;
        let pre = headers::preconditions(&header_map)?;
        let ds = state.delivery_services.create(identity.tenant_id, input, &pre).await?;
        let validators = headers::validators(&ds);
        let env = Envelope::response(vec![ds]).with_alert(Alert::success("Delivery Service creation was successful"));
        Ok::<_, ApiError>((StatusCode::CREATED, validators, Json(env)).into_response())
    }
    .await;
    metrics::observe("create", &res);
    res
}

/// PUT /deliveryservices/:id
pub async fn update(
    State(state): State<ServerState>,
    Extension(identity): Extension<ActingIdentity>,
    id: Result<Path<i32>, PathRejection>,
    header_map: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let res = async {
        let id = parse_id(id)?;
        let patch = parse_body(body)?;
        let pre = headers::preconditions(&header_map)?;
        let ds = state.delivery_services.update(identity.tenant_id, id, patch, &pre).await?;
        let validators = headers::validators(&ds);
        let env = Envelope::response(vec![ds]).with_alert(Alert::success("Delivery Service update was successful"));
        Ok::<_, ApiError>((StatusCode::OK, validators, Json(env)).into_response())
    }
    .await;
    metrics::observe("update", &res);
    res
}

/// DELETE /deliveryservices/:id
pub async fn delete(
    State(state): State<ServerState>,
    Extension(identity): Extension<ActingIdentity>,
    id: Result<Path<i32>, PathRejection>,
    header_map: HeaderMap,
) -> Result<Response, ApiError> {
    let res = async {
        let id = parse_id(id)?;
        let pre = headers::preconditions(&header_map)?;
        let ds = state.delivery_services.delete(identity.tenant_id, id, &pre).await?;
        let msg = format!("Delivery Service '{}' was deleted", ds.fields.xml_id);
        Ok::<_, ApiError>(Json(Envelope::alerts(vec![Alert::success(msg)])).into_response())
    }
    .await;
    metrics::observe("delete", &res);
    res
}
