//! roster-axum: Axum adapter for the Roster employee directory.
//!
//! Mounts the search route, extracts the tenant and client identity from
//! each request, and turns [`roster_core::RosterError`] into Feathers-style
//! JSON responses.

pub mod app;
pub mod params;
pub mod rest;
pub mod state;
mod error;
pub use error::{retry_after_secs, RosterAxumError};
pub use state::RosterAxumState;

pub use app::{axum, AxumApp, SEARCH_PATH};
