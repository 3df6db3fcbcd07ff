use roster_core::{RosterConfig, ENV_PREFIX};

/// Server defaults with `ROSTER__*` environment overrides layered on top.
pub fn roster_config() -> RosterConfig {
    let mut config = defaults();
    config.load_env(ENV_PREFIX);
    config
}

pub(crate) fn defaults() -> RosterConfig {
    let mut config = RosterConfig::new();
    config.set("http.host", "127.0.0.1");
    config.set("http.port", "3030");
    config.set("http.trust_forwarded_for", "false");
    config.set("storage.url", "memory");
    config.set("storage.seed_sample_data", "true");
    config
}

/// `host:port` to bind.
pub fn listen_addr(config: &RosterConfig) -> String {
    let host = config.get("http.host").unwrap_or("127.0.0.1");
    let port = config.get("http.port").unwrap_or("3030");
    format!("{host}:{port}")
}
