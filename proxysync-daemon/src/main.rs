use anyhow::Result;
use clap::Parser;

use proxysync_daemon::cli::DaemonCli;
use proxysync_daemon::orchestrator::{self, Orchestrator};
use proxysync_daemon::{logging, metrics_server};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let config = orchestrator::load_config(&cli).await?;

    if cli.validate {
        println!("configuration is valid");
        return Ok(());
    }

    logging::init_tracing(&config.general)?;

    tracing::info!(
        proxy_container = %config.sync.proxy_container,
        trigger = %config.sync.trigger,
        "proxysync-daemon starting"
    );

    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
    }

    let daemon = Orchestrator::build(&config).await.inspect_err(|e| {
        tracing::error!(error = %format!("{e:#}"), "startup failed");
    })?;

    if cli.once {
        return daemon.run_once().await;
    }

    daemon.run().await.inspect_err(|e| {
        tracing::error!(error = %format!("{e:#}"), "proxysync-daemon terminated");
    })?;

    tracing::info!("proxysync-daemon shut down");
    Ok(())
}
