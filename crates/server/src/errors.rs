use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::{Alert, Envelope};
use service::ServiceError;
use thiserror::Error;
use tracing::error;

/// Error returned by handlers; rendered as an alerts-only envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub alerts: Vec<Alert>,
}

impl ApiError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self { status, alerts: vec![Alert::error(msg)] }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self { Self::new(StatusCode::BAD_REQUEST, msg) }

    pub fn unauthorized(msg: impl Into<String>) -> Self { Self::new(StatusCode::UNAUTHORIZED, msg) }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(errs) => Self {
                status: StatusCode::BAD_REQUEST,
                alerts: errs.iter().map(|f| Alert::error(f.to_string())).collect(),
            },
            ServiceError::BadRequest(msg) => Self::new(StatusCode::BAD_REQUEST, msg),
            ServiceError::Forbidden(msg) => Self::new(StatusCode::FORBIDDEN, msg),
            ServiceError::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, msg),
            ServiceError::Conflict(msg) => Self::new(StatusCode::CONFLICT, msg),
            ServiceError::PreconditionFailed(msg) => Self::new(StatusCode::PRECONDITION_FAILED, msg),
            ServiceError::Db(_) | ServiceError::Model(_) => {
                // 内部错误细节只写日志，不返回给客户端
                error!(code = e.code(), error = %e, "internal error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(Envelope::alerts(self.alerts))).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}
