//! pulsewatchd — the pulsewatch daemon.
//!
//! Single binary that assembles:
//! - Service registry (from pulsewatch.toml)
//! - Health prober
//! - Discord REST client + gateway
//! - Status reporter
//! - Monitor loop and `!status` command dispatch
//!
//! # Usage
//!
//! ```text
//! pulsewatchd run --config /etc/pulsewatch/pulsewatch.toml
//! pulsewatchd check --config pulsewatch.toml
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use pulsewatch_core::{PulseConfig, ServiceRegistry};
use pulsewatch_health::HealthProber;
use pulsewatch_notify::{
    ChannelId, DiscordClient, DiscordGateway, GatewayEvent, StatusReporter, StdoutClient,
};
use pulsewatch_scheduler::{CommandHandler, Monitor};

#[derive(Parser)]
#[command(name = "pulsewatchd", about = "Service health monitor with Discord reporting")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Monitor services and report to Discord until interrupted.
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        /// Discord bot token.
        #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Channel that receives the periodic summary.
        #[arg(long, env = "MONITOR_CHANNEL_ID")]
        monitor_channel: Option<u64>,

        /// Channel that receives alerts for unhealthy services.
        #[arg(long, env = "ALERT_CHANNEL_ID")]
        alert_channel: Option<u64>,

        /// Minutes between scheduled checks.
        #[arg(long, env = "UPDATE_INTERVAL")]
        update_interval: Option<u64>,
    },
    /// Probe every service once and print the summary.
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// Path to pulsewatch.toml. Built-in services are used if it is missing.
    #[arg(long, short, default_value = "pulsewatch.toml")]
    config: PathBuf,

    /// Per-request probe timeout in seconds.
    #[arg(long, env = "TIMEOUT")]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run {
            config,
            token,
            monitor_channel,
            alert_channel,
            update_interval,
        } => {
            let mut cfg = load_config(&config.config)?;
            if let Some(token) = token {
                cfg.discord.token = token;
            }
            if let Some(id) = monitor_channel {
                cfg.discord.monitor_channel_id = id;
            }
            if let Some(id) = alert_channel {
                cfg.discord.alert_channel_id = Some(id);
            }
            if let Some(minutes) = update_interval {
                cfg.monitor.update_interval = minutes;
            }
            if let Some(secs) = config.timeout {
                cfg.monitor.timeout = secs;
            }
            run_daemon(cfg).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { config } => {
            let mut cfg = load_config(&config.config)?;
            if let Some(secs) = config.timeout {
                cfg.monitor.timeout = secs;
            }
            run_check(cfg).await
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,pulsewatchd=debug,pulsewatch=debug".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: &Path) -> anyhow::Result<PulseConfig> {
    if path.exists() {
        let cfg = PulseConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
        info!(path = %path.display(), services = cfg.services.len(), "config loaded");
        return Ok(cfg);
    }
    warn!(path = %path.display(), "config file not found, using built-in services");
    Ok(PulseConfig {
        services: PulseConfig::builtin_services(|var| std::env::var(var).ok()),
        ..PulseConfig::default()
    })
}

async fn run_daemon(cfg: PulseConfig) -> anyhow::Result<()> {
    cfg.validate().context("invalid configuration")?;
    info!("pulsewatch daemon starting");

    // ── Initialize subsystems ──────────────────────────────────

    let registry = Arc::new(ServiceRegistry::from_config(&cfg.services));
    let prober = Arc::new(
        HealthProber::new(registry.clone(), cfg.monitor.probe_timeout())
            .context("building probe client")?,
    );
    info!(services = registry.len(), timeout_secs = cfg.monitor.timeout, "health prober initialized");

    let client = Arc::new(DiscordClient::new(cfg.discord.token.clone())?);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Gateway and readiness gate ─────────────────────────────

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let gateway = DiscordGateway::new(cfg.discord.token.clone());
    let gateway_handle = tokio::spawn(gateway.run(event_tx, shutdown_rx.clone()));

    let user = loop {
        match event_rx.recv().await {
            Some(GatewayEvent::Ready { user }) => break user,
            Some(_) => continue,
            None => {
                let err = match gateway_handle.await {
                    Ok(Err(e)) => anyhow::Error::from(e),
                    Ok(Ok(())) => anyhow!("gateway stopped before it was ready"),
                    Err(e) => e.into(),
                };
                error!(error = %err, "failed to connect to Discord");
                return Err(err.context("connecting to the Discord gateway"));
            }
        }
    };
    info!(%user, "connected to Discord");

    let reporter = Arc::new(
        StatusReporter::connect(
            client,
            Some(ChannelId(cfg.discord.monitor_channel_id)),
            cfg.discord.alert_channel().map(ChannelId),
        )
        .await
        .context("resolving notification channels")?,
    );

    // ── Start background tasks ─────────────────────────────────

    let monitor = Monitor::new(prober.clone(), reporter.clone(), cfg.monitor.update_interval());
    let monitor_shutdown = shutdown_rx.clone();
    let monitor_handle = tokio::spawn(async move {
        monitor.run(monitor_shutdown).await;
    });

    let commands = CommandHandler::new(prober, reporter, cfg.discord.command_prefix.clone());
    let command_shutdown = shutdown_rx.clone();
    let command_handle = tokio::spawn(async move {
        commands.run(event_rx, command_shutdown).await;
    });

    info!(
        interval_minutes = cfg.monitor.update_interval,
        "monitoring started"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    // Wait for background tasks.
    let _ = monitor_handle.await;
    let _ = command_handle.await;
    match gateway_handle.await {
        Ok(Err(e)) => warn!(error = %e, "gateway ended with error"),
        Err(e) => warn!(error = %e, "gateway task failed"),
        Ok(Ok(())) => {}
    }

    info!("pulsewatch daemon stopped");
    Ok(())
}

/// Probe once and print the summary. Exits non-zero if anything is
/// unhealthy.
async fn run_check(cfg: PulseConfig) -> anyhow::Result<ExitCode> {
    cfg.validate_services().context("invalid configuration")?;

    let registry = Arc::new(ServiceRegistry::from_config(&cfg.services));
    let prober = Arc::new(HealthProber::new(registry, cfg.monitor.probe_timeout())?);
    let reporter = Arc::new(
        StatusReporter::connect(Arc::new(StdoutClient), Some(ChannelId(0)), None).await?,
    );

    let report = Monitor::new(prober, reporter, cfg.monitor.update_interval())
        .run_cycle()
        .await;
    info!(checked = report.checked, unhealthy = report.unhealthy, "check complete");

    Ok(if report.unhealthy == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
