//! # Roster Configuration
//!
//! Roster keeps configuration as a flat string key/value store, the same
//! `set()` / `get()` style the HTTP layer and server use, and builds typed
//! settings from an immutable snapshot.
//!
//! ## Setting and reading values
//! ```rust
//! use roster_core::RosterConfig;
//! let mut config = RosterConfig::new();
//!
//! config.set("rate_limit.capacity", "120");
//! config.set("search.max_page_size", "50");
//!
//! assert_eq!(config.get("rate_limit.capacity"), Some("120"));
//! ```
//!
//! ## Environment overrides
//! ```bash
//! export ROSTER__RATE_LIMIT__CAPACITY=120   # -> rate_limit.capacity
//! ```
//!
//! Unparseable values fall back to the documented default for that key.

use std::collections::HashMap;
use std::time::Duration;

pub const ENV_PREFIX: &str = "ROSTER__";

#[derive(Debug, Default)]
pub struct RosterConfig {
    values: HashMap<String, String>,
}

impl RosterConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Layer variables carrying `prefix` on top of the current values.
    ///
    /// `ROSTER__SEARCH__MAX_PAGE_SIZE` becomes `search.max_page_size`.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    pub fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
            }
        }
    }

    pub fn snapshot(&self) -> RosterConfigSnapshot {
        RosterConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RosterConfigSnapshot {
    map: HashMap<String, String>,
}

impl RosterConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.trim().parse::<u32>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.trim().parse::<f64>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }
}

/// Admission control settings (`rate_limit.*`).
#[derive(Debug, Clone, PartialEq)]
pub struct LimiterSettings {
    pub capacity: u32,
    pub refill_per_sec: f64,
    pub max_clients: usize,
    pub sweep_interval: Duration,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            capacity: 60,
            refill_per_sec: 1.0,
            max_clients: 100_000,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl LimiterSettings {
    pub fn from_snapshot(cfg: &RosterConfigSnapshot) -> Self {
        let d = Self::default();
        Self {
            capacity: cfg.get_u32("rate_limit.capacity").unwrap_or(d.capacity),
            refill_per_sec: cfg
                .get_f64("rate_limit.refill_per_sec")
                .unwrap_or(d.refill_per_sec),
            max_clients: cfg
                .get_usize("rate_limit.max_clients")
                .unwrap_or(d.max_clients),
            sweep_interval: cfg
                .get_u64("rate_limit.sweep_interval_secs")
                .map(Duration::from_secs)
                .unwrap_or(d.sweep_interval),
        }
    }
}

/// Search settings (`search.*`).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub max_query_len: usize,
    pub max_filter_values: usize,
    pub query_timeout: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 100,
            max_query_len: 100,
            max_filter_values: 100,
            query_timeout: Duration::from_millis(5_000),
        }
    }
}

impl SearchSettings {
    pub fn from_snapshot(cfg: &RosterConfigSnapshot) -> Self {
        let d = Self::default();
        let max_page_size = cfg
            .get_u32("search.max_page_size")
            .filter(|v| *v >= 1)
            .unwrap_or(d.max_page_size);
        let default_page_size = cfg
            .get_u32("search.default_page_size")
            .filter(|v| *v >= 1)
            .unwrap_or(d.default_page_size)
            .min(max_page_size);

        Self {
            default_page_size,
            max_page_size,
            max_query_len: cfg
                .get_usize("search.max_query_len")
                .unwrap_or(d.max_query_len),
            max_filter_values: cfg
                .get_usize("search.max_filter_values")
                .unwrap_or(d.max_filter_values),
            query_timeout: cfg
                .get_u64("search.query_timeout_ms")
                .map(Duration::from_millis)
                .unwrap_or(d.query_timeout),
        }
    }
}
