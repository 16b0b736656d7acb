use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use configs::RulesConfig;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use service::{DeliveryServiceRepository, DeliveryServiceService};

use crate::errors::ApiError;

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub jwt_secret: String,
}

#[derive(Clone)]
pub struct ServerState {
    pub auth: ServerAuthConfig,
    pub delivery_services: DeliveryServiceService<dyn DeliveryServiceRepository>,
}

impl ServerState {
    pub fn new(repo: Arc<dyn DeliveryServiceRepository>, rules: RulesConfig, jwt_secret: String) -> Self {
        Self {
            auth: ServerAuthConfig { jwt_secret },
            delivery_services: DeliveryServiceService::new(repo, Arc::new(rules)),
        }
    }
}

/// Who is making the request; injected into request extensions by [`require_bearer_token_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingIdentity {
    pub tenant_id: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    /// Tenant the user belongs to.
    pub tid: i32,
    pub exp: usize,
}

/// Sign an HS256 token for `sub` in tenant `tid`, valid for `ttl_secs`.
///
/// This service has no login endpoint; tokens are minted by whatever holds the
/// shared `auth.jwt_secret`. This is the minting side of the claims
/// [`require_bearer_token_state`] accepts, for operator tooling and the API tests.
pub fn issue_token(secret: &str, sub: &str, tid: i32, ttl_secs: i64) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (chrono::Utc::now().timestamp() + ttl_secs).max(0) as usize;
    let claims = Claims { sub: sub.to_string(), tid, exp };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

/// 校验 Authorization: Bearer <token>，并把 token 中的租户写入请求扩展
/// 缺失或格式错误、非法或过期均返回 401；失败记录日志
pub async fn require_bearer_token_state(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = req.uri().path().to_string();

    let token = match req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(h) => match h.strip_prefix("Bearer ") {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => {
                tracing::warn!(path = %path, "invalid Authorization format (expect Bearer)");
                return Err(ApiError::unauthorized("invalid Authorization header"));
            }
        },
        None => {
            tracing::warn!(path = %path, "missing Authorization header");
            return Err(ApiError::unauthorized("missing bearer token"));
        }
    };

    let key = DecodingKey::from_secret(state.auth.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    match decode::<Claims>(&token, &key, &validation) {
        Ok(data) => {
            req.extensions_mut().insert(ActingIdentity { tenant_id: data.claims.tid });
            Ok(next.run(req).await)
        }
        Err(e) => {
            tracing::error!(path = %path, err = %e, "token validation failed");
            Err(ApiError::unauthorized("invalid or expired token"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips_tenant() {
        let token = issue_token("s3cret", "alice", 7, 60).unwrap();
        let data = decode::<Claims>(&token, &DecodingKey::from_secret(b"s3cret"), &Validation::new(Algorithm::HS256)).unwrap();
        assert_eq!(data.claims.tid, 7);
        assert_eq!(data.claims.sub, "alice");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("s3cret", "alice", 7, 60).unwrap();
        assert!(decode::<Claims>(&token, &DecodingKey::from_secret(b"other"), &Validation::new(Algorithm::HS256)).is_err());
    }
}
