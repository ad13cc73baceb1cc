//! Hackline Game Server
//!
//! Serves one hacker/spy session over WebSocket until Ctrl-C.

use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hackline::{GameServer, ServerConfig, VERSION};

#[cfg(feature = "debug-tracing")]
const DEFAULT_LOG_FILTER: &str = "debug";
#[cfg(not(feature = "debug-tracing"))]
const DEFAULT_LOG_FILTER: &str = "info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Hackline Server v{}", VERSION);

    let config = ServerConfig::from_env()?;
    info!(
        "Time budget: {}s, lives: {}, puzzle delay: {:?}",
        config.session.rules.time_budget_secs,
        config.session.rules.initial_lives,
        config.session.puzzle_delay,
    );

    let server = GameServer::new(config)?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            server.shutdown();
        }
    }

    Ok(())
}
