//! Admission control: one token bucket per client.
//!
//! ```text
//!     admit(client)
//!          │
//!          ▼
//!     ┌─────────────┐
//!     │ RateLimiter │ ◄── policy + clock
//!     └──────┬──────┘
//!            ▼
//!     ┌─────────────┐
//!     │ BucketStore │ ◄── atomic refill-and-take per client
//!     └─────────────┘
//! ```

mod bucket;
mod clock;
mod store;

use std::sync::Arc;

use tracing::debug;

pub use bucket::{Admission, LimiterPolicy, PolicyError, TokenBucket};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use store::{BucketStore, MemoryBucketStore};

use crate::config::LimiterSettings;
use crate::tenant::ClientId;

/// Per-client token-bucket rate limiter.
///
/// Never fails: an unseen client gets a fresh, full bucket.
pub struct RateLimiter {
    policy: LimiterPolicy,
    store: Arc<dyn BucketStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// In-process limiter with the default bucket bound.
    pub fn new(policy: LimiterPolicy) -> Self {
        Self::with_store(
            policy,
            Arc::new(MemoryBucketStore::default()),
            Arc::new(MonotonicClock),
        )
    }

    pub fn with_store(
        policy: LimiterPolicy,
        store: Arc<dyn BucketStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            policy,
            store,
            clock,
        }
    }

    pub fn from_settings(settings: &LimiterSettings) -> Result<Self, PolicyError> {
        let policy = LimiterPolicy::new(settings.capacity, settings.refill_per_sec)?;
        Ok(Self::with_store(
            policy,
            Arc::new(MemoryBucketStore::new(settings.max_clients)),
            Arc::new(MonotonicClock),
        ))
    }

    pub fn policy(&self) -> &LimiterPolicy {
        &self.policy
    }

    /// Admit or deny one request from `client`.
    pub fn admit(&self, client: &ClientId) -> Admission {
        let admission = self.store.admit(client, &self.policy, self.clock.now());
        if let Some(retry_after) = admission.retry_after {
            debug!(client = %client, retry_after_ms = retry_after.as_millis() as u64, "request denied by rate limiter");
        }
        admission
    }

    /// Drop buckets that have fully refilled.
    pub fn purge_idle(&self) -> usize {
        self.store.purge_idle(self.clock.now())
    }

    pub fn tracked_clients(&self) -> usize {
        self.store.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(LimiterPolicy::default())
    }
}
