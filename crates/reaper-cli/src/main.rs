use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use reaper_core::config::{
    DEFAULT_POLL_INTERVAL_SECONDS, DEFAULT_REQUEST_TIMEOUT_SECONDS, DEFAULT_THRESHOLD_SECONDS,
};
use reaper_core::impls::{DEFAULT_ENDPOINT, RestControlPlane, TokenSource};
use reaper_core::{LogFormat, ReaperBuilder, ReaperConfig, init_tracing};

/// Find sessions older than a threshold on every Spanner database of a
/// project and delete them.
#[derive(Debug, Parser)]
#[command(name = "spanner-reaper", version)]
struct Cli {
    /// Project whose instances are swept.
    project: String,

    /// Minimum session age (seconds) that triggers eviction; inclusive.
    #[arg(long, env = "REAPER_THRESHOLD_SECONDS", default_value_t = DEFAULT_THRESHOLD_SECONDS)]
    threshold_seconds: u64,

    /// Delay between sweeps (seconds).
    #[arg(long, env = "REAPER_POLL_INTERVAL_SECONDS", default_value_t = DEFAULT_POLL_INTERVAL_SECONDS)]
    poll_interval_seconds: u64,

    /// Timeout for each control-plane request (seconds).
    #[arg(long, env = "REAPER_REQUEST_TIMEOUT_SECONDS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECONDS)]
    request_timeout_seconds: u64,

    /// Static bearer token. Without it, tokens come from `gcloud auth print-access-token`.
    #[arg(long, env = "SPANNER_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// REST endpoint.
    #[arg(long, env = "SPANNER_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Emulator `host:port`; overrides the endpoint and disables auth.
    #[arg(long, env = "SPANNER_EMULATOR_HOST")]
    emulator_host: Option<String>,

    /// Run a single sweep and exit.
    #[arg(long)]
    once: bool,

    /// Log output format (pretty or json).
    #[arg(long, env = "REAPER_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Log level filter; RUST_LOG takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn config(&self) -> ReaperConfig {
        ReaperConfig {
            project: self.project.clone(),
            threshold_seconds: self.threshold_seconds,
            poll_interval_seconds: self.poll_interval_seconds,
            request_timeout_seconds: self.request_timeout_seconds,
        }
    }

    fn control_plane(&self, config: &ReaperConfig) -> anyhow::Result<RestControlPlane> {
        let timeout = config.request_timeout()?;
        let plane = match (&self.emulator_host, &self.access_token) {
            (Some(host), _) => RestControlPlane::for_emulator(host, timeout)?,
            (None, Some(token)) => RestControlPlane::new(
                self.endpoint.clone(),
                TokenSource::Static(token.clone()),
                timeout,
            )?,
            (None, None) => {
                RestControlPlane::new(self.endpoint.clone(), TokenSource::gcloud(), timeout)?
            }
        };
        Ok(plane)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format, &cli.log_level).context("initializing logging")?;

    let config = cli.config();
    config.validate().context("invalid configuration")?;
    let control_plane = cli.control_plane(&config)?;
    info!(
        project = %config.project,
        endpoint = control_plane.endpoint(),
        threshold_secs = config.threshold_seconds,
        poll_interval_secs = config.poll_interval_seconds,
        once = cli.once,
        "starting spanner reaper"
    );

    let mut builder = ReaperBuilder::new(config).control_plane(Arc::new(control_plane));
    if cli.once {
        builder = builder.max_sweeps(1);
    }
    let handle = builder.build()?.spawn();
    let mut status = handle.status();

    tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown requested; finishing the current sweep");
            handle.request_shutdown();
        }
        _ = status.wait_for(|s| s.state.is_stopped()) => {}
    }

    let summary = handle.join().await.context("reaper stopped with an error")?;
    info!(sweeps = summary.sweeps, evicted = summary.evicted, "bye");
    Ok(())
}
