mod app;
pub mod seed;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use roster_axum::{axum, AxumApp, SEARCH_PATH};
use roster_core::{
    ColumnConfigSource, EmployeeDirectory, EmployeeStore, LimiterSettings, MemoryColumnConfig,
    MemoryEmployeeStore, RateLimiter, RosterConfig, SearchSettings,
};
use roster_sqlite::{SqliteColumnConfig, SqliteEmployeeStore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

pub use app::{listen_addr, roster_config};

/// Build the HTTP app from `config`: storage, directory, routes and layers.
///
/// `storage.url` is `memory` for the in-process store, anything else is a
/// SQLite url.
pub async fn build(config: &RosterConfig) -> Result<AxumApp> {
    let snapshot = config.snapshot();
    let limiter = Arc::new(RateLimiter::from_settings(&LimiterSettings::from_snapshot(
        &snapshot,
    ))?);
    let search = SearchSettings::from_snapshot(&snapshot);
    let seed = snapshot.get_bool("storage.seed_sample_data").unwrap_or(false);
    let url = snapshot
        .get_string("storage.url")
        .unwrap_or_else(|| "memory".to_string());

    let (store, columns): (Arc<dyn EmployeeStore>, Arc<dyn ColumnConfigSource>) =
        if url == "memory" {
            let store = MemoryEmployeeStore::new();
            let columns = MemoryColumnConfig::new();
            if seed {
                seed::seed_memory(&store, &columns);
            }
            (Arc::new(store), Arc::new(columns))
        } else {
            let store = SqliteEmployeeStore::connect(&url).await?;
            let columns = SqliteColumnConfig::new(store.pool().clone());
            if seed {
                seed::seed_sqlite(&store, &columns).await?;
            }
            (Arc::new(store), Arc::new(columns))
        };
    info!(storage = %url, "employee directory ready");

    let directory = EmployeeDirectory::from_parts(&search, limiter, store, columns);
    let trust = snapshot.get_bool("http.trust_forwarded_for").unwrap_or(false);

    Ok(axum(directory)
        .trust_forwarded_for(trust)
        .use_search(SEARCH_PATH)
        .use_get("/health", || async { "ok" })
        .with_http_layers())
}

/// Periodically drop fully-refilled buckets from `limiter`.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, every: Duration) -> JoinHandle<()> {
    let every = every.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = limiter.purge_idle();
            if purged > 0 {
                debug!(
                    purged,
                    remaining = limiter.tracked_clients(),
                    "idle rate-limit buckets purged"
                );
            }
        }
    })
}
