use std::sync::Arc;

use anyhow::Result;
use roster_core::LimiterSettings;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = roster_server::roster_config();
    let ax = roster_server::build(&config).await?;

    let sweep = LimiterSettings::from_snapshot(&config.snapshot()).sweep_interval;
    let _sweeper = roster_server::spawn_sweeper(Arc::clone(ax.state.directory.limiter()), sweep);

    let addr = roster_server::listen_addr(&config);
    info!("listening on http://{addr}");

    ax.listen(addr).await?;

    Ok(())
}
