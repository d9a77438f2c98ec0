//! cescout - A censorship-signal aggregator.
//!
//! # API Endpoints
//!
//! - `GET /report` - Combined IODA, OONI and RIPEstat report for a country
//! - `GET /report/:source` - A single source's outcome
//! - `GET /health` - Health check
//!
//! See [`cescout::config`] for the environment variables.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cescout::aggregation::Aggregator;
use cescout::api::{AppState, router};
use cescout::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("cescout=info".parse()?))
        .init();

    let config = Config::from_env();

    info!(
        port = config.port,
        ooni_configured = config.ooni_database_url.is_some(),
        failure_policy = ?config.failure_policy,
        "Starting cescout server"
    );

    let state = AppState {
        aggregator: Aggregator::from_config(&config),
    };
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "cescout is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
