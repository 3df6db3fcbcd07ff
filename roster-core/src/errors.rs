//! # Errors (Feathers-style)
//!
//! Roster reports every request-facing failure as a structured [`RosterError`].
//! Core goals:
//! - one kind per failure class, each with a status code and class name
//! - callers can tell retryable failures from ones they must fix
//! - can be carried through `anyhow::Error` by collaborators
//! - never carries another tenant's data or storage diagnostics to a client

use std::fmt;
use std::time::Duration;

use anyhow::Error as AnyError;
use serde_json::{json, Value};

use crate::filters::ValidationError;

/// A convenience result type for directory operations.
pub type RosterResult<T> = std::result::Result<T, RosterError>;

/// Failure classes of the directory core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,         // 400
    NotFound,           // 404
    TenantViolation,    // 404
    RateLimited,        // 429
    Internal,           // 500
    StorageUnavailable, // 503
    StorageTimeout,     // 504
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound | ErrorKind::TenantViolation => 404,
            ErrorKind::RateLimited => 429,
            ErrorKind::Internal => 500,
            ErrorKind::StorageUnavailable => 503,
            ErrorKind::StorageTimeout => 504,
        }
    }

    /// Error `name` (e.g. "TooManyRequests")
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "BadRequest",
            ErrorKind::NotFound | ErrorKind::TenantViolation => "NotFound",
            ErrorKind::RateLimited => "TooManyRequests",
            ErrorKind::Internal => "GeneralError",
            ErrorKind::StorageUnavailable => "Unavailable",
            ErrorKind::StorageTimeout => "GatewayTimeout",
        }
    }

    /// Error `className` (kebab-cased)
    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "bad-request",
            ErrorKind::NotFound | ErrorKind::TenantViolation => "not-found",
            ErrorKind::RateLimited => "too-many-requests",
            ErrorKind::Internal => "general-error",
            ErrorKind::StorageUnavailable => "unavailable",
            ErrorKind::StorageTimeout => "gateway-timeout",
        }
    }

    /// Whether a client may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited | ErrorKind::StorageUnavailable | ErrorKind::StorageTimeout
        )
    }
}

/// A structured Roster error.
///
/// Mirrors Feathers-style fields:
/// - name
/// - message
/// - code (HTTP status)
/// - class_name
/// - data (optional)
/// - errors (optional)
#[derive(Debug)]
pub struct RosterError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<Value>,
    pub errors: Option<Value>,
    pub retry_after: Option<Duration>,
    pub source: Option<AnyError>,
}

impl RosterError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            errors: None,
            retry_after: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_errors(mut self, errors: Value) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Convert into `anyhow::Error`.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Turn any error into a RosterError:
    /// - if it's already a RosterError, keep it (lossless)
    /// - otherwise wrap as Internal
    pub fn normalize(err: AnyError) -> RosterError {
        match err.downcast::<RosterError>() {
            Ok(roster) => roster,
            Err(other) => RosterError::internal("Internal server error").with_source(other),
        }
    }

    /// A "safe" version suitable for returning to clients:
    /// keeps kind/message/data/errors/retry_after and drops the inner `source`.
    pub fn sanitize_for_client(&self) -> RosterError {
        RosterError {
            kind: self.kind,
            message: self.message.clone(),
            data: self.data.clone(),
            errors: self.errors.clone(),
            retry_after: self.retry_after,
            source: None,
        }
    }

    /// Client-facing JSON payload.
    pub fn to_json(&self) -> Value {
        let mut base = json!({
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
            "retryable": self.is_retryable(),
        });

        if let Some(d) = &self.data {
            base["data"] = d.clone();
        }
        if let Some(e) = &self.errors {
            base["errors"] = e.clone();
        }
        base
    }

    // ---- Constructors ----

    pub fn rate_limited(retry_after: Duration) -> Self {
        let mut err = Self::new(ErrorKind::RateLimited, "Rate limit exceeded")
            .with_data(json!({ "retryAfter": retry_after.as_secs_f64() }));
        err.retry_after = Some(retry_after);
        err
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let message = message.into();
        Self::new(ErrorKind::Validation, format!("Invalid parameter '{field}': {message}"))
            .with_errors(json!({ field: [message] }))
    }

    /// Never says which tenant or row was involved.
    pub fn tenant_violation() -> Self {
        Self::new(ErrorKind::TenantViolation, "Not found")
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }

    pub fn storage_unavailable(source: AnyError) -> Self {
        Self::new(ErrorKind::StorageUnavailable, "Employee storage is unavailable, retry later")
            .with_source(source)
    }

    pub fn storage_timeout(after: Duration) -> Self {
        Self::new(
            ErrorKind::StorageTimeout,
            format!("Search did not complete within {} ms, retry later", after.as_millis()),
        )
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, msg)
    }
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for RosterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<ValidationError> for RosterError {
    fn from(err: ValidationError) -> Self {
        RosterError::validation(err.field, err.message)
    }
}
