//! Tenant and caller identities for Roster.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An organization identifier: the tenant boundary.
///
/// Every employee row belongs to exactly one organization and every search
/// is rooted in one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(pub String);

impl OrgId {
    pub fn new<S: Into<String>>(org: S) -> Self {
        Self(org.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque caller identity, used only as the rate limiter's bucket key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn new<S: Into<String>>(client: S) -> Self {
        Self(client.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Context carried with every directory call.
///
/// Transports build one per request; the core never derives the tenant from
/// anything else.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub org_id: OrgId,
    pub client_id: ClientId,
}

impl TenantContext {
    /// Convenience constructor from strings.
    pub fn new<O: Into<String>, C: Into<String>>(org: O, client: C) -> Self {
        Self {
            org_id: OrgId::new(org),
            client_id: ClientId::new(client),
        }
    }
}
