use std::sync::Arc;

use tracing::instrument;

use crate::columns::{ColumnConfigSource, ColumnResolver};
use crate::config::SearchSettings;
use crate::engine::{SearchEngine, SearchPage};
use crate::errors::{RosterError, RosterResult};
use crate::filters::{FilterValidator, RawParams};
use crate::rate_limit::RateLimiter;
use crate::store::EmployeeStore;
use crate::tenant::{ClientId, TenantContext};

/// The employee search request sequence, transport-independent:
/// admit, validate, resolve columns, search.
#[derive(Clone)]
pub struct EmployeeDirectory {
    limiter: Arc<RateLimiter>,
    validator: FilterValidator,
    resolver: ColumnResolver,
    engine: SearchEngine,
}

impl EmployeeDirectory {
    pub fn new(
        limiter: Arc<RateLimiter>,
        validator: FilterValidator,
        resolver: ColumnResolver,
        engine: SearchEngine,
    ) -> Self {
        Self {
            limiter,
            validator,
            resolver,
            engine,
        }
    }

    /// Wire the components from settings and collaborators.
    pub fn from_parts(
        settings: &SearchSettings,
        limiter: Arc<RateLimiter>,
        store: Arc<dyn EmployeeStore>,
        columns: Arc<dyn ColumnConfigSource>,
    ) -> Self {
        Self::new(
            limiter,
            FilterValidator::new(settings.clone()),
            ColumnResolver::new(columns),
            SearchEngine::new(store, settings.query_timeout),
        )
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Charge one request to `client`. Transports call this directly only
    /// for requests that fail before a [`TenantContext`] exists.
    pub fn admit(&self, client: &ClientId) -> RosterResult<()> {
        let admission = self.limiter.admit(client);
        if admission.allowed {
            return Ok(());
        }
        Err(RosterError::rate_limited(
            admission.retry_after.unwrap_or_default(),
        ))
    }

    #[instrument(
        name = "employees.search",
        skip_all,
        fields(org_id = %ctx.org_id, client_id = %ctx.client_id)
    )]
    pub async fn search(&self, ctx: &TenantContext, raw: &RawParams) -> RosterResult<SearchPage> {
        self.admit(&ctx.client_id)?;
        let filters = self.validator.validate(raw)?;
        let columns = self.resolver.resolve(&ctx.org_id).await;
        self.engine.search(&ctx.org_id, &filters, &columns).await
    }
}
