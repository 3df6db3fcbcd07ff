use std::time::Duration;

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use roster_core::RosterError;
use tracing::error;

#[derive(Debug)]
pub struct RosterAxumError(pub RosterError);

impl From<RosterError> for RosterAxumError {
    fn from(e: RosterError) -> Self {
        Self(e)
    }
}

impl From<anyhow::Error> for RosterAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(RosterError::normalize(e))
    }
}

impl IntoResponse for RosterAxumError {
    fn into_response(self) -> Response {
        let err = self.0;
        if err.code() >= 500 {
            error!(error = %err, source = ?err.source, "request failed");
        }

        let safe = err.sanitize_for_client();
        let status =
            StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut res = (status, Json(safe.to_json())).into_response();

        if let Some(after) = safe.retry_after {
            res.headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs(after)));
        }
        res
    }
}

/// Whole seconds, rounded up, never below one.
pub fn retry_after_secs(after: Duration) -> u64 {
    let secs = after.as_secs() + u64::from(after.subsec_nanos() > 0);
    secs.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_rounds_up_to_whole_seconds() {
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(1)), 1);
        assert_eq!(retry_after_secs(Duration::from_secs(1)), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(1_001)), 2);
    }
}
