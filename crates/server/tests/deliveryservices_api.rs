use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use configs::RulesConfig;
use serde_json::{json, Value};
use tower::ServiceExt;

use server::auth::{issue_token, ServerState};
use server::routes;
use service::test_support::*;
use service::DeliveryServiceRepository;

const SECRET: &str = "test-secret";

async fn app() -> Router {
    let repo: Arc<dyn DeliveryServiceRepository> = seeded_repository().await;
    let state = ServerState::new(repo, RulesConfig::default(), SECRET.into());
    routes::build_router(state, tower_http::cors::CorsLayer::very_permissive())
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    tenant: Option<i32>,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> anyhow::Result<Reply> {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(tid) = tenant {
        req = req.header("authorization", format!("Bearer {}", issue_token(SECRET, "tester", tid, 3600)?));
    }
    for (k, v) in headers {
        req = req.header(*k, *v);
    }
    let req = match body {
        Some(b) => req.header("content-type", "application/json").body(Body::from(serde_json::to_vec(&b)?))?,
        None => req.body(Body::empty())?,
    };
    let resp = app.clone().oneshot(req).await?;
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok(Reply { status, headers, body })
}

fn xml_ids(body: &Value) -> Vec<String> {
    body["response"]
        .as_array()
        .map(|items| items.iter().filter_map(|d| d["xmlId"].as_str().map(String::from)).collect())
        .unwrap_or_default()
}

fn http_ds(xml: &str, tenant: i32) -> Value {
    json!({
        "xmlId": xml, "tenantId": tenant, "cdnId": CDN_1, "typeId": TYPE_HTTP, "displayName": xml,
        "orgServerFqdn": "http://origin.example.net"
    })
}

#[tokio::test]
async fn health_and_metrics_are_public() -> anyhow::Result<()> {
    let app = app().await;
    let r = send(&app, "GET", "/health", None, &[], None).await?;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["status"], "ok");

    send(&app, "GET", "/api/4.0/deliveryservices", Some(TENANT_ROOT), &[], None).await?;
    // plain text exposition, read without the JSON helper
    let resp = app.clone().oneshot(Request::builder().uri("/metrics").body(Body::empty())?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    let text = String::from_utf8(bytes.to_vec())?;
    assert!(text.contains("delivery_service_operations_total"));
    Ok(())
}

#[tokio::test]
async fn api_requires_a_valid_token() -> anyhow::Result<()> {
    let app = app().await;
    let r = send(&app, "GET", "/api/4.0/deliveryservices", None, &[], None).await?;
    assert_eq!(r.status, StatusCode::UNAUTHORIZED);
    assert_eq!(r.body["alerts"][0]["level"], "error");

    let r = send(&app, "GET", "/api/4.0/deliveryservices", None, &[("authorization", "Bearer not.a.jwt")], None).await?;
    assert_eq!(r.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn list_is_scoped_sorted_and_paged() -> anyhow::Result<()> {
    let app = app().await;
    let r = send(&app, "GET", "/api/4.0/deliveryservices", Some(TENANT_1), &[], None).await?;
    assert_eq!(r.status, StatusCode::OK);
    let ids = xml_ids(&r.body);
    assert!(ids.contains(&"ds1".to_string()));
    assert!(!ids.contains(&"ds-root".to_string()));
    assert!(!ids.contains(&"test-ds-server-assignments".to_string()));
    assert!(r.headers.contains_key("last-modified"));

    let uri = "/api/4.0/deliveryservices?orderby=xmlId&sortOrder=desc&limit=2";
    let r = send(&app, "GET", uri, Some(TENANT_ROOT), &[], None).await?;
    assert_eq!(xml_ids(&r.body), vec!["top-ds-in-cdn2", "test-ds-server-assignments"]);

    let r = send(&app, "GET", "/api/4.0/deliveryservices?sortOrder=sideways", Some(TENANT_ROOT), &[], None).await?;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    let r = send(&app, "GET", "/api/4.0/deliveryservices?offset=1", Some(TENANT_ROOT), &[], None).await?;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn list_answers_not_modified() -> anyhow::Result<()> {
    let app = app().await;
    let future = [("if-modified-since", "Fri, 01 Jan 2100 00:00:00 GMT")];
    let r = send(&app, "GET", "/api/4.0/deliveryservices", Some(TENANT_ROOT), &future, None).await?;
    assert_eq!(r.status, StatusCode::NOT_MODIFIED);
    assert_eq!(r.body, Value::Null);

    let garbage = [("if-modified-since", "last tuesday")];
    let r = send(&app, "GET", "/api/4.0/deliveryservices", Some(TENANT_ROOT), &garbage, None).await?;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn create_returns_201_with_validators() -> anyhow::Result<()> {
    let app = app().await;
    let r = send(&app, "POST", "/api/4.0/deliveryservices", Some(TENANT_1), &[], Some(http_ds("api-new", TENANT_1))).await?;
    assert_eq!(r.status, StatusCode::CREATED);
    assert_eq!(r.body["response"][0]["xmlId"], "api-new");
    assert_eq!(r.body["response"][0]["routingName"], "cdn");
    assert_eq!(r.body["alerts"][0]["level"], "success");
    let etag = r.headers.get("etag").and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert!(etag.starts_with("\"v1-"));
    assert!(r.headers.contains_key("last-modified"));
    Ok(())
}

#[tokio::test]
async fn create_error_statuses() -> anyhow::Result<()> {
    let app = app().await;
    let uri = "/api/4.0/deliveryservices";

    let mut steering = http_ds("steer-tls", TENANT_1);
    steering["typeId"] = json!(TYPE_STEERING);
    steering["tlsVersions"] = json!(["1.2"]);
    let r = send(&app, "POST", uri, Some(TENANT_1), &[], Some(steering)).await?;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert!(r.body["alerts"][0]["text"].as_str().unwrap_or_default().starts_with("tlsVersions"));

    let r = send(&app, "POST", uri, Some(TENANT_1), &[], Some(http_ds("ds1", TENANT_1))).await?;
    assert_eq!(r.status, StatusCode::CONFLICT);

    let r = send(&app, "POST", uri, Some(TENANT_4), &[], Some(http_ds("elsewhere", TENANT_1))).await?;
    assert_eq!(r.status, StatusCode::FORBIDDEN);

    let r = send(&app, "POST", uri, Some(TENANT_1), &[], Some(json!({"xmlId": "x", "tenantId": "abc"}))).await?;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);

    let r = send(&app, "POST", uri, Some(TENANT_1), &[("if-match", "*")], Some(http_ds("cond", TENANT_1))).await?;
    assert_eq!(r.status, StatusCode::PRECONDITION_FAILED);
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_bad_request() -> anyhow::Result<()> {
    let app = app().await;
    let req = Request::builder()
        .method("POST")
        .uri("/api/4.0/deliveryservices")
        .header("authorization", format!("Bearer {}", issue_token(SECRET, "tester", TENANT_1, 3600)?))
        .header("content-type", "application/json")
        .body(Body::from("{\"xmlId\": "))?;
    let resp = app.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn update_honours_conditional_headers() -> anyhow::Result<()> {
    let app = app().await;
    let uri = format!("/api/4.0/deliveryservices/{DS_1}");

    let stale = [("if-unmodified-since", "Mon, 01 Jan 2001 00:00:00 GMT")];
    let r = send(&app, "PUT", &uri, Some(TENANT_1), &stale, Some(json!({"displayName": "renamed"}))).await?;
    assert_eq!(r.status, StatusCode::PRECONDITION_FAILED);

    let r = send(&app, "PUT", &uri, Some(TENANT_1), &[], Some(json!({"displayName": "renamed"}))).await?;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["response"][0]["displayName"], "renamed");
    let etag = r.headers.get("etag").and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();

    let r = send(&app, "PUT", &uri, Some(TENANT_1), &[("if-match", etag.as_str())], Some(json!({"dscp": 8}))).await?;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["response"][0]["dscp"], 8);

    // the etag moved on with the last write
    let r = send(&app, "PUT", &uri, Some(TENANT_1), &[("if-match", etag.as_str())], Some(json!({"dscp": 9}))).await?;
    assert_eq!(r.status, StatusCode::PRECONDITION_FAILED);

    let r = send(&app, "PUT", &uri, Some(TENANT_4), &[], Some(json!({"dscp": 9}))).await?;
    assert_eq!(r.status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn delete_paths() -> anyhow::Result<()> {
    let app = app().await;
    let r = send(&app, "DELETE", "/api/4.0/deliveryservices/abc", Some(TENANT_ROOT), &[], None).await?;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    let r = send(&app, "DELETE", "/api/4.0/deliveryservices/999", Some(TENANT_ROOT), &[], None).await?;
    assert_eq!(r.status, StatusCode::NOT_FOUND);

    let uri = format!("/api/4.0/deliveryservices/{DS_SERVER_ASSIGNMENTS}");
    let r = send(&app, "DELETE", &uri, Some(TENANT_4), &[], None).await?;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["alerts"][0]["level"], "success");
    let r = send(&app, "GET", "/api/4.0/deliveryservices", Some(TENANT_4), &[], None).await?;
    assert!(xml_ids(&r.body).is_empty());
    Ok(())
}

#[tokio::test]
async fn unassign_guards_last_edge_and_origin() -> anyhow::Result<()> {
    let app = app().await;
    let last_edge = format!("/api/4.0/deliveryserviceserver/{DS_SERVER_ASSIGNMENTS}/{SERVER_ASSIGNMENT_EDGE}");
    let r = send(&app, "DELETE", &last_edge, Some(TENANT_4), &[], None).await?;
    assert_eq!(r.status, StatusCode::CONFLICT);

    let last_org = format!("/api/4.0/deliveryserviceserver/{DS_SERVER_ASSIGNMENTS}/{SERVER_ASSIGNMENT_ORG}");
    let r = send(&app, "DELETE", &last_org, Some(TENANT_4), &[], None).await?;
    assert_eq!(r.status, StatusCode::CONFLICT);

    let not_assigned = format!("/api/4.0/deliveryserviceserver/{DS_1}/{SERVER_EDGE_CDN2}");
    let r = send(&app, "DELETE", &not_assigned, Some(TENANT_1), &[], None).await?;
    assert_eq!(r.status, StatusCode::NOT_FOUND);

    let topology_origin = format!("/api/4.0/deliveryserviceserver/{DS_TOP}/{SERVER_ORG_DENVER_1}");
    let r = send(&app, "DELETE", &topology_origin, Some(TENANT_1), &[], None).await?;
    assert_eq!(r.status, StatusCode::OK);
    Ok(())
}
