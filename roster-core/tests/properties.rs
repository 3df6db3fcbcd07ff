use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use roster_core::{
    ClientId, FilterValidator, LimiterPolicy, ManualClock, MemoryBucketStore, RateLimiter,
};

const KEYS: &[&str] = &[
    "q",
    "status",
    "statuses",
    "locations",
    "company_ids",
    "department_ids",
    "position_ids",
    "page",
    "page_size",
    "limit",
    "bogus",
];

fn raw_params() -> impl Strategy<Value = Vec<(String, String)>> {
    let pair = (
        prop::sample::select(KEYS),
        prop_oneof![
            "[0-9]{1,4}",
            "-?[0-9,]{0,12}",
            "(active|Not_started|TERMINATED|retired)(,(active|terminated))?",
            "[ a-zA-Z%_']{0,30}",
        ],
    )
        .prop_map(|(k, v)| (k.to_string(), v));
    prop::collection::vec(pair, 0..8)
}

proptest! {
    #[test]
    fn validation_is_pure(raw in raw_params()) {
        let validator = FilterValidator::default();
        let first = validator.validate(&raw);
        let second = validator.validate(&raw);
        prop_assert_eq!(&first, &second);

        if let Ok(filters) = first {
            prop_assert!(filters.page >= 1);
            prop_assert!((1..=validator.max_page_size()).contains(&filters.page_size));
            prop_assert!(filters.companies.iter().all(|c| c.0 >= 1));
        }
    }

    /// Admitted requests in any window of length `T` never exceed
    /// `capacity + floor(rate * T)`.
    #[test]
    fn admissions_stay_inside_every_window(
        capacity in 1u32..20,
        rate_milli in prop::sample::select(vec![250u64, 500, 1_000, 2_000, 5_000]),
        gaps_ms in prop::collection::vec(0u64..1_500, 1..200),
        window_ms in 0u64..10_000,
    ) {
        let clock = Arc::new(ManualClock::new());
        let policy = LimiterPolicy::new(capacity, rate_milli as f64 / 1_000.0).unwrap();
        let limiter = RateLimiter::with_store(policy, Arc::new(MemoryBucketStore::default()), clock.clone());
        let client = ClientId::new("prop");

        let mut admitted_at = Vec::new();
        for gap in gaps_ms {
            clock.advance(Duration::from_millis(gap));
            if limiter.admit(&client).allowed {
                admitted_at.push(clock.elapsed().as_millis() as u64);
            }
        }

        let allowance = capacity as u64 + rate_milli * window_ms / 1_000_000;
        for (i, start) in admitted_at.iter().enumerate() {
            let in_window = admitted_at[i..]
                .iter()
                .take_while(|t| **t <= start + window_ms)
                .count() as u64;
            prop_assert!(
                in_window <= allowance,
                "{} admitted in {}ms starting at {}ms, allowance {}",
                in_window, window_ms, start, allowance
            );
        }
    }
}
