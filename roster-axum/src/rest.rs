use std::net::SocketAddr;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{ConnectInfo, Query, State},
    http::{Extensions, HeaderMap},
    routing, Json, Router,
};
use roster_core::{RosterError, SearchPage, TenantContext};
use serde_json::{json, Value};

use crate::params::{client_from_parts, flatten_json_body, org_from_headers};
use crate::{RosterAxumError, RosterAxumState};

type Pairs = Vec<(String, String)>;

fn map_json_rejection(rejection: JsonRejection) -> RosterError {
    RosterError::validation("body", "Failed to parse the request body as JSON")
        .with_errors(json!({"body": [rejection.body_text()]}))
}

fn map_query_rejection(rejection: QueryRejection) -> RosterError {
    RosterError::validation("query", rejection.body_text())
}

fn peer_addr(extensions: &Extensions) -> Option<SocketAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// `GET` and `POST` on `/` run the same search.
pub fn search_router(state: RosterAxumState) -> Router<()> {
    Router::new()
        .route("/", routing::get(search_query).post(search_body))
        .with_state(state)
}

async fn search_query(
    State(state): State<RosterAxumState>,
    headers: HeaderMap,
    extensions: Extensions,
    query: Result<Query<Pairs>, QueryRejection>,
) -> Result<Json<SearchPage>, RosterAxumError> {
    let pairs = query
        .map(|Query(pairs)| pairs)
        .map_err(map_query_rejection);
    run_search(&state, &headers, peer_addr(&extensions), pairs).await
}

async fn search_body(
    State(state): State<RosterAxumState>,
    headers: HeaderMap,
    extensions: Extensions,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SearchPage>, RosterAxumError> {
    let pairs = body
        .map_err(map_json_rejection)
        .and_then(|Json(body)| flatten_json_body(&body));
    run_search(&state, &headers, peer_addr(&extensions), pairs).await
}

async fn run_search(
    state: &RosterAxumState,
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    pairs: Result<Pairs, RosterError>,
) -> Result<Json<SearchPage>, RosterAxumError> {
    let client_id = client_from_parts(headers, peer, state.trust_forwarded_for);

    let request = org_from_headers(headers).and_then(|org| pairs.map(|p| (org, p)));
    let (org_id, params) = match request {
        Ok(request) => request,
        Err(err) => {
            // Malformed requests still spend a token.
            state.directory.admit(&client_id)?;
            return Err(err.into());
        }
    };

    let ctx = TenantContext { org_id, client_id };
    let page = state.directory.search(&ctx, &params).await?;
    Ok(Json(page))
}
