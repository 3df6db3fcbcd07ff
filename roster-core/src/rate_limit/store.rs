use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use super::bucket::{Admission, LimiterPolicy, TokenBucket};
use crate::tenant::ClientId;

/// Key/value home of the token buckets.
///
/// `admit` is one atomic read-modify-write of a single client's bucket; a
/// shared store (Redis script, SQL row lock) implements the same contract.
pub trait BucketStore: Send + Sync {
    /// Refill and try to take one token from `client`'s bucket, creating a
    /// full bucket on first sight.
    fn admit(&self, client: &ClientId, policy: &LimiterPolicy, now: Instant) -> Admission;

    /// Drop buckets that have refilled to capacity. Returns how many went.
    fn purge_idle(&self, now: Instant) -> usize;

    /// Number of buckets currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local bucket store.
///
/// Buckets live in a sharded map, each behind its own mutex, so clients on
/// different buckets never wait on one another. Holds at most `max_clients`
/// buckets: fully-refilled buckets are evicted first, then the least
/// recently seen.
pub struct MemoryBucketStore {
    buckets: DashMap<ClientId, Mutex<TokenBucket>>,
    max_clients: usize,
}

impl MemoryBucketStore {
    pub fn new(max_clients: usize) -> Self {
        Self {
            buckets: DashMap::new(),
            max_clients: max_clients.max(1),
        }
    }

    fn enforce_bound(&self, now: Instant) {
        if self.buckets.len() <= self.max_clients {
            return;
        }

        let purged = self.purge_idle(now);
        let len = self.buckets.len();
        if len <= self.max_clients {
            debug!(purged, "bucket bound restored by dropping idle buckets");
            return;
        }

        // Evict a little past the bound so the next few new clients do not
        // each pay for a full scan.
        let target = self.max_clients - self.max_clients / 16;
        let excess = len.saturating_sub(target);

        let mut by_age: Vec<(Instant, ClientId)> = self
            .buckets
            .iter()
            .map(|entry| (entry.value().lock().last_seen(), entry.key().clone()))
            .collect();
        by_age.sort_by(|a, b| a.0.cmp(&b.0));

        for (_, client) in by_age.into_iter().take(excess) {
            self.buckets.remove(&client);
        }
        debug!(purged, evicted = excess, "bucket bound restored by evicting least recently seen");
    }
}

impl Default for MemoryBucketStore {
    fn default() -> Self {
        Self::new(100_000)
    }
}

impl BucketStore for MemoryBucketStore {
    fn admit(&self, client: &ClientId, policy: &LimiterPolicy, now: Instant) -> Admission {
        if let Some(bucket) = self.buckets.get(client) {
            return bucket.lock().try_acquire(now);
        }

        let admission = {
            let bucket = self
                .buckets
                .entry(client.clone())
                .or_insert_with(|| Mutex::new(TokenBucket::full(*policy, now)));
            let admission = bucket.lock().try_acquire(now);
            admission
        };

        self.enforce_bound(now);
        admission
    }

    fn purge_idle(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| !bucket.get_mut().is_full(now));
        before.saturating_sub(self.buckets.len())
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }
}
