//! expeditor-server: the order pipeline as a single HTTP process.
//!
//! Wires sqlite storage, the configured cache, and the in-process event
//! bus (optionally outbox-wrapped) behind the HTTP API.

use tracing::info;

use expeditor::config::Config;
use expeditor::standalone;
use expeditor::utils::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load()?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let app = standalone::build(&config).await?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "expeditor listening");
    axum::serve(listener, app.router).await?;

    if let Some(recovery) = app.outbox_recovery {
        recovery.stop();
    }

    Ok(())
}
