//! Request inputs: tenant, client identity and raw search parameters.

use std::net::SocketAddr;

use axum::http::HeaderMap;
use roster_core::{ClientId, OrgId, RosterError};
use serde_json::Value;

pub const ORG_HEADER: &str = "x-org-id";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Requesting organization. Missing or blank is a validation error.
pub fn org_from_headers(headers: &HeaderMap) -> Result<OrgId, RosterError> {
    headers
        .get(ORG_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(OrgId::new)
        .ok_or_else(|| RosterError::validation(ORG_HEADER, "organization header is required"))
}

/// Rate-limit key: the first forwarded hop when trusted, else the peer IP.
pub fn client_from_parts(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> ClientId {
    if trust_forwarded_for {
        let forwarded = headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(first) = forwarded {
            return ClientId::new(first);
        }
    }

    peer.map(|addr| ClientId::new(addr.ip().to_string()))
        .unwrap_or_else(|| ClientId::new("unknown"))
}

/// Flatten a JSON object body into `(key, value)` pairs.
///
/// Scalars become one pair, arrays one pair per element, `null` is absent.
pub fn flatten_json_body(body: &Value) -> Result<Vec<(String, String)>, RosterError> {
    let Value::Object(map) = body else {
        return Err(RosterError::validation("body", "must be a JSON object"));
    };

    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    pairs.push((key.clone(), scalar(key, item)?));
                }
            }
            other => pairs.push((key.clone(), scalar(key, other)?)),
        }
    }
    Ok(pairs)
}

fn scalar(key: &str, value: &Value) -> Result<String, RosterError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(RosterError::validation(
            key,
            "must be a string, number, boolean or an array of those",
        )),
    }
}
