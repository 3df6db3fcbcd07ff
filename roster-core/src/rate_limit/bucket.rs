use std::time::{Duration, Instant};

use thiserror::Error;

/// Tokens are tracked in millionths so refill arithmetic stays integral.
pub(crate) const MICROS_PER_TOKEN: u64 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("Bucket capacity must be at least 1")]
    ZeroCapacity,

    #[error("Refill rate must be a positive, finite number of tokens per second (got {0})")]
    InvalidRefillRate(f64),
}

/// Capacity and refill rate shared by every bucket of a limiter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterPolicy {
    capacity: u32,
    refill_per_sec: f64,
    refill_micros_per_sec: u64,
}

impl LimiterPolicy {
    pub fn new(capacity: u32, refill_per_sec: f64) -> Result<Self, PolicyError> {
        if capacity == 0 {
            return Err(PolicyError::ZeroCapacity);
        }
        if !refill_per_sec.is_finite() || refill_per_sec <= 0.0 {
            return Err(PolicyError::InvalidRefillRate(refill_per_sec));
        }
        let refill_micros_per_sec = (refill_per_sec * MICROS_PER_TOKEN as f64).floor() as u64;
        if refill_micros_per_sec == 0 {
            return Err(PolicyError::InvalidRefillRate(refill_per_sec));
        }

        Ok(Self {
            capacity,
            refill_per_sec,
            refill_micros_per_sec,
        })
    }

    /// 60 requests per minute steady state, bursts of 60.
    pub fn per_minute(requests: u32) -> Result<Self, PolicyError> {
        Self::new(requests, requests as f64 / 60.0)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn refill_per_sec(&self) -> f64 {
        self.refill_per_sec
    }

    fn capacity_micros(&self) -> u64 {
        self.capacity as u64 * MICROS_PER_TOKEN
    }

    /// Micro-tokens earned over `elapsed`, rounded down.
    fn credit(&self, elapsed: Duration) -> u64 {
        let earned = elapsed.as_nanos() * self.refill_micros_per_sec as u128 / NANOS_PER_SEC;
        u64::try_from(earned).unwrap_or(u64::MAX)
    }

    /// Shortest wait after which `credit` covers `micros`, rounded up.
    fn time_to_earn(&self, micros: u64) -> Duration {
        let rate = self.refill_micros_per_sec as u128;
        let nanos = (micros as u128 * NANOS_PER_SEC).div_ceil(rate);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

impl Default for LimiterPolicy {
    fn default() -> Self {
        Self {
            capacity: 60,
            refill_per_sec: 1.0,
            refill_micros_per_sec: MICROS_PER_TOKEN,
        }
    }
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    pub retry_after: Option<Duration>,
}

impl Admission {
    pub fn admitted() -> Self {
        Self {
            allowed: true,
            retry_after: None,
        }
    }

    pub fn denied(retry_after: Duration) -> Self {
        Self {
            allowed: false,
            retry_after: Some(retry_after),
        }
    }
}

/// Per-client token bucket.
///
/// Invariant: `0 <= tokens <= capacity`.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    policy: LimiterPolicy,
    tokens: u64,
    last_refill: Instant,
    last_seen: Instant,
}

impl TokenBucket {
    /// A bucket at full capacity.
    pub fn full(policy: LimiterPolicy, now: Instant) -> Self {
        Self {
            policy,
            tokens: policy.capacity_micros(),
            last_refill: now,
            last_seen: now,
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens as f64 / MICROS_PER_TOKEN as f64
    }

    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    fn refill(&mut self, now: Instant) {
        let cap = self.policy.capacity_micros();
        if self.tokens >= cap {
            self.tokens = cap;
            self.last_refill = now;
            return;
        }

        let elapsed = now.saturating_duration_since(self.last_refill);
        let credit = self.policy.credit(elapsed);
        // Sub-micro-token intervals keep accruing from the old mark.
        if credit == 0 {
            return;
        }
        self.tokens = self.tokens.saturating_add(credit).min(cap);
        self.last_refill = now;
    }

    /// Refill, then take one token if one is available.
    pub fn try_acquire(&mut self, now: Instant) -> Admission {
        self.refill(now);
        self.last_seen = self.last_seen.max(now);

        if self.tokens >= MICROS_PER_TOKEN {
            self.tokens -= MICROS_PER_TOKEN;
            return Admission::admitted();
        }

        let needed = self.policy.time_to_earn(MICROS_PER_TOKEN - self.tokens);
        let pending = now.saturating_duration_since(self.last_refill);
        Admission::denied(needed.saturating_sub(pending))
    }

    /// Whether the bucket would be back at capacity at `now`.
    ///
    /// Dropping such a bucket loses nothing: a fresh one starts full.
    pub fn is_full(&self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens.saturating_add(self.policy.credit(elapsed)) >= self.policy.capacity_micros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_rejects_degenerate_values() {
        assert_eq!(LimiterPolicy::new(0, 1.0), Err(PolicyError::ZeroCapacity));
        assert!(matches!(
            LimiterPolicy::new(10, 0.0),
            Err(PolicyError::InvalidRefillRate(_))
        ));
        assert!(matches!(
            LimiterPolicy::new(10, f64::NAN),
            Err(PolicyError::InvalidRefillRate(_))
        ));
    }

    #[test]
    fn fractional_rates_never_over_credit() {
        let policy = LimiterPolicy::new(1, 1.0 / 60.0).unwrap();
        assert!(policy.credit(Duration::from_secs(60)) <= MICROS_PER_TOKEN);
        assert!(policy.credit(Duration::from_secs(3600)) <= 60 * MICROS_PER_TOKEN);

        let start = Instant::now();
        let mut bucket = TokenBucket::full(policy, start);
        assert!(bucket.try_acquire(start).allowed);
        assert!(!bucket.try_acquire(start + Duration::from_secs(60)).allowed);
    }

    #[test]
    fn drains_then_denies_with_exact_retry_after() {
        let policy = LimiterPolicy::new(3, 2.0).unwrap();
        let now = Instant::now();
        let mut bucket = TokenBucket::full(policy, now);

        for _ in 0..3 {
            assert!(bucket.try_acquire(now).allowed);
        }
        let denied = bucket.try_acquire(now);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after, Some(Duration::from_millis(500)));
        assert_eq!(bucket.tokens(), 0.0);
    }

    #[test]
    fn waiting_retry_after_is_always_enough() {
        let policy = LimiterPolicy::new(1, 3.0).unwrap();
        let start = Instant::now();
        let mut bucket = TokenBucket::full(policy, start);
        assert!(bucket.try_acquire(start).allowed);

        let later = start + Duration::from_millis(100);
        let denied = bucket.try_acquire(later);
        let wait = denied.retry_after.unwrap();
        assert!(bucket.try_acquire(later + wait).allowed);
    }

    #[test]
    fn refill_is_capped_at_capacity() {
        let policy = LimiterPolicy::new(5, 1.0).unwrap();
        let start = Instant::now();
        let mut bucket = TokenBucket::full(policy, start);
        assert!(bucket.try_acquire(start).allowed);

        let much_later = start + Duration::from_secs(3_600);
        assert!(bucket.is_full(much_later));
        assert!(bucket.try_acquire(much_later).allowed);
        assert_eq!(bucket.tokens(), 4.0);
    }

    #[test]
    fn per_minute_matches_requests_per_minute() {
        let policy = LimiterPolicy::per_minute(60).unwrap();
        assert_eq!(policy.capacity(), 60);
        assert_eq!(policy.refill_per_sec(), 1.0);
    }
}
