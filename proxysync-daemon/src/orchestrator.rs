//! Daemon startup wiring.
//!
//! Loads configuration, connects to Docker, resolves the proxy container and
//! drives [`ProxySyncer`] until a shutdown signal or a fatal error.
//!
//! # Startup sequence
//!
//! ```text
//! load_config ──> Orchestrator::build ──> run / run_once
//!                     |
//!   connect socket + negotiate api version -> ping -> resolve proxy by name
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};

use proxysync_core::config::ProxySyncConfig;
use proxysync_network_sync::{
    BollardDockerClient, DockerClient, NetworkSyncConfig, ProxySyncer, ProxySyncerBuilder,
    resolve_proxy_container,
};

use crate::cli::DaemonCli;

/// Load configuration from the CLI-selected file (or defaults) and apply CLI overrides.
///
/// Precedence: CLI flags, then `PROXYSYNC_*` environment variables, then the
/// file, then built-in defaults. A missing file is an error only when a path was given.
pub async fn load_config(cli: &DaemonCli) -> Result<ProxySyncConfig> {
    let mut config = match &cli.config {
        Some(path) => ProxySyncConfig::load(path)
            .await
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ProxySyncConfig::from_env().context("invalid configuration")?,
    };

    apply_cli_overrides(&mut config, cli);
    config
        .validate()
        .context("invalid configuration after CLI overrides")?;
    Ok(config)
}

/// Apply command-line overrides on top of a loaded configuration.
pub fn apply_cli_overrides(config: &mut ProxySyncConfig, cli: &DaemonCli) {
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format = format.clone();
    }
}

/// Connected daemon, ready to reconcile.
pub struct Orchestrator<D: DockerClient> {
    syncer: ProxySyncer<D>,
}

impl Orchestrator<BollardDockerClient> {
    /// Connect to the Docker socket from `config`, negotiate the API version, ping it and
    /// resolve the proxy container.
    ///
    /// # Errors
    ///
    /// Fails when the socket cannot be opened or pinged, or when the proxy name
    /// does not match exactly one container.
    pub async fn build(config: &ProxySyncConfig) -> Result<Self> {
        let docker = BollardDockerClient::connect_with_socket(
            &config.docker.socket,
            config.docker.timeout_secs,
        )
        .await
        .context("failed to create docker client")?;
        Self::with_client(config, Arc::new(docker)).await
    }
}

impl<D: DockerClient> Orchestrator<D> {
    /// Same as [`Orchestrator::build`] with an already constructed client.
    pub async fn with_client(config: &ProxySyncConfig, docker: Arc<D>) -> Result<Self> {
        let sync_config =
            NetworkSyncConfig::from_core(&config.sync).context("invalid [sync] configuration")?;

        docker.ping().await.context("docker daemon is not reachable")?;
        tracing::info!(socket = %config.docker.socket, "connected to docker daemon");

        let proxy_id = resolve_proxy_container(docker.as_ref(), &sync_config.proxy_container)
            .await
            .context("failed to resolve proxy container")?;

        let syncer = ProxySyncerBuilder::new()
            .config(sync_config)
            .docker_client(docker)
            .proxy_id(proxy_id)
            .build()
            .context("failed to build proxy syncer")?;

        Ok(Self { syncer })
    }

    /// The resolved proxy container ID.
    pub fn proxy_id(&self) -> &str {
        self.syncer.proxy_id()
    }

    /// Run one reconciliation cycle and return.
    pub async fn run_once(&self) -> Result<()> {
        let plan = self
            .syncer
            .sync_once()
            .await
            .context("reconciliation failed")?;
        tracing::info!(
            joined = plan.to_join.len(),
            left = plan.to_leave.len(),
            "single reconciliation complete"
        );
        Ok(())
    }

    /// Run the sync loop until SIGINT/SIGTERM (returns `Ok`) or a fatal error.
    pub async fn run(mut self) -> Result<()> {
        tokio::select! {
            outcome = self.syncer.run() => {
                match outcome {
                    Err(e) => Err(anyhow::Error::new(e).context("proxy sync loop terminated")),
                    Ok(never) => match never {},
                }
            }
            signal = wait_for_shutdown_signal() => {
                let signal = signal?;
                tracing::info!(signal = signal, "shutdown signal received");
                Ok(())
            }
        }
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}
