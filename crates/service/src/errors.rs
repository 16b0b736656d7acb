use std::fmt;

use thiserror::Error;

/// What kind of rule a single field failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    Invalid,
    Duplicate,
    Forbidden,
}

/// One field-level violation reported by the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub kind: FieldErrorKind,
}

impl FieldError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self { field: field.to_string(), message: message.into(), kind: FieldErrorKind::Invalid }
    }

    pub fn duplicate(field: &str, message: impl Into<String>) -> Self {
        Self { field: field.to_string(), message: message.into(), kind: FieldErrorKind::Duplicate }
    }

    pub fn forbidden(field: &str, message: impl Into<String>) -> Self {
        Self { field: field.to_string(), message: message.into(), kind: FieldErrorKind::Forbidden }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_errors(errs: &[FieldError]) -> String {
    errs.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {}", join_errors(.0))]
    Validation(Vec<FieldError>),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("database error: {0}")]
    Db(String),
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    /// Collapse validator output into a single error.
    ///
    /// Any forbidden field wins; a list made only of duplicates is a conflict;
    /// everything else is reported as a validation failure listing every field.
    pub fn from_field_errors(errs: Vec<FieldError>) -> Self {
        if let Some(f) = errs.iter().find(|e| e.kind == FieldErrorKind::Forbidden) {
            return Self::Forbidden(f.message.clone());
        }
        if !errs.is_empty() && errs.iter().all(|e| e.kind == FieldErrorKind::Duplicate) {
            return Self::Conflict(join_errors(&errs));
        }
        Self::Validation(errs)
    }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 2001,
            ServiceError::BadRequest(_) => 2002,
            ServiceError::Forbidden(_) => 2003,
            ServiceError::NotFound(_) => 2004,
            ServiceError::Conflict(_) => 2005,
            ServiceError::PreconditionFailed(_) => 2006,
            ServiceError::Db(_) => 2100,
            ServiceError::Model(_) => 2101,
        }
    }
}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(e: sea_orm::DbErr) -> Self { ServiceError::Db(e.to_string()) }
}
