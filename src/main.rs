use std::env;

use poolwatch::AgentBuilder;
use poolwatch::ClientConfig;
use poolwatch::Result;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    init_observability();

    let mut config = ClientConfig::new()?;
    if let Some(path) = env::args().nth(1) {
        info!("with_override_config from: {}", path);
        config = config.with_override_config(&path)?;
    }
    let config = config.validate()?;
    info!("{:?}", config);

    let agent = AgentBuilder::new(config.clone()).build().await?;
    for tp_id in &config.application.watched_pools {
        match agent.watch_pool(tp_id).await {
            Ok(pool) => info!(tp_id, parameters = ?pool.parameters(), "watching pool"),
            Err(e) => error!(tp_id, "failed to watch pool: {}", e),
        }
    }
    if config.application.watched_pools.is_empty() {
        warn!("application.watched_pools is empty, nothing to watch");
    }
    agent.notify_application_complete();

    info!("Agent started. Waiting for CTRL+C signal...");
    wait_for_shutdown_signal().await?;

    if !agent.shutdown().await {
        warn!("some background tasks did not stop in time");
    }
    info!("Exiting program.");
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }
    Ok(())
}

fn init_observability() {
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    tracing_subscriber::registry().with(base_subscriber).init();
}
