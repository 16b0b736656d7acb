use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{TraceLayer, DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, DefaultOnFailure},
};
use tracing::Level;

use common::types::Health;

use crate::auth::{self, ServerState};
use crate::metrics;

pub mod deliveryservices;
pub mod deliveryserviceserver;

/// API version prefix for every authenticated route.
pub const API_PREFIX: &str = "/api/4.0";

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics_text() -> (StatusCode, String) {
    metrics::encode_metrics()
}

/// Build the full application router: public probes plus the versioned, token-protected API.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    // Public routes
    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_text));

    // Protected API routes
    let api = Router::new()
        .route(
            "/deliveryservices",
            get(deliveryservices::list).post(deliveryservices::create),
        )
        .route(
            "/deliveryservices/:id",
            put(deliveryservices::update).delete(deliveryservices::delete),
        )
        .route(
            "/deliveryserviceserver/:dsid/:serverid",
            delete(deliveryserviceserver::unassign),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer_token_state,
        ));

    // Compose
    public
        .nest(API_PREFIX, api)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // 每次请求创建 span，包含方法和路径等，日志级别为 INFO
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                // 请求到达时打点
                .on_request(
                    DefaultOnRequest::new()
                        .level(Level::INFO),
                )
                // 响应返回时打点，包含状态码与耗时
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                // 失败（5xx 等）时以 ERROR 记录
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR),
                )
        )
}
