//! setlist-hass - publishes setlist.fm concert history to Home Assistant.
//!
//! Subcommands:
//! - `run`: initial refresh, then per-user timers until Ctrl+C / SIGTERM
//!   (SIGHUP forces a refresh of every user)
//! - `once`: refresh every user a single time
//! - `check`: validate the config file and every user's credentials

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use setlist_client::SetlistClient;
use setlist_core::SetlistConfig;
use setlist_hass::bridge;
use setlist_hass::{ConcertSource, HassRestSink, MemorySink, RefreshHandle, Scheduler, StateSink, UserCoordinator};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "setlist_hass=info,setlist_client=info";

/// Command-line arguments for setlist-hass
#[derive(Parser, Debug)]
#[command(name = "setlist-hass")]
#[command(about = "Publish setlist.fm concert history to Home Assistant")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = "setlist-hass.toml", env = "SETLIST_HASS_CONFIG")]
    config: PathBuf,

    /// Home Assistant base URL, overrides `[host] url`
    #[arg(long, global = true, env = "SETLIST_HASS_URL")]
    hass_url: Option<String>,

    /// Home Assistant long-lived access token, overrides `[host] token`
    #[arg(long, global = true, env = "SETLIST_HASS_TOKEN", hide_env_values = true)]
    hass_token: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the refresh daemon
    Run,
    /// Refresh every user once and exit
    Once {
        /// Print states instead of sending them to Home Assistant
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate the configuration and each user's API credentials
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = SetlistConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    if let Some(url) = cli.hass_url.clone() {
        config.host.url = url;
    }
    if let Some(token) = cli.hass_token.clone() {
        config.host.token = Some(token);
    }
    info!(
        config = %cli.config.display(),
        users = config.users.len(),
        "Loaded configuration"
    );

    match cli.command {
        Command::Run => run(&config).await,
        Command::Once { dry_run } => once(&config, dry_run).await,
        Command::Check => check(&config).await,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(config: &SetlistConfig) -> Result<()> {
    let sink = hass_sink(config)?;
    let scheduler = Scheduler::new(coordinators(config, sink)?);

    #[cfg(unix)]
    tokio::spawn(force_refresh_on_hangup(scheduler.handle()));

    for coordinator in scheduler.coordinators() {
        info!(
            user = %coordinator.user().name,
            entity_id = %coordinator.entities().concerts,
            period_hours = coordinator.user().refresh_period,
            "Scheduling user"
        );
    }
    info!(host = %config.host.url, "Starting refresh daemon");
    scheduler.run(shutdown_signal()).await;
    info!("Shutdown complete");
    Ok(())
}

async fn once(config: &SetlistConfig, dry_run: bool) -> Result<()> {
    let memory = Arc::new(MemorySink::new());
    let sink: Arc<dyn StateSink> = if dry_run {
        Arc::clone(&memory) as Arc<dyn StateSink>
    } else {
        hass_sink(config)?
    };

    let scheduler = Scheduler::new(coordinators(config, sink)?);
    let results = scheduler.refresh_all().await;

    if dry_run {
        for update in memory.states() {
            let rendered = serde_json::to_string_pretty(&update).context("Failed to render state")?;
            println!("{}: {rendered}", update.entity_id);
        }
    }

    let failed = results.iter().filter(|r| r.is_err()).count();
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        error!(error = %err, "Refresh failed");
    }
    if failed > 0 {
        bail!("{failed} of {} users failed to refresh", results.len());
    }
    Ok(())
}

async fn check(config: &SetlistConfig) -> Result<()> {
    let mut failed = 0usize;
    for user in &config.users {
        let client = SetlistClient::new(&user.api_key, &config.api)
            .with_context(|| format!("Invalid API settings for '{}'", user.name))?;
        match client.fetch_user(&user.userid).await {
            Ok(profile) => {
                let display = profile.display_name().unwrap_or(&user.userid);
                println!("{}: ok ({display}); {}", user.name, bridge::describe_user(user));
            }
            Err(err) => {
                failed += 1;
                println!("{}: {err}", user.name);
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} users failed validation", config.users.len());
    }
    Ok(())
}

fn hass_sink(config: &SetlistConfig) -> Result<Arc<dyn StateSink>> {
    let Some(token) = config.host.token.as_deref() else {
        bail!("No Home Assistant token: set [host] token, --hass-token or SETLIST_HASS_TOKEN");
    };
    let sink = HassRestSink::new(&config.host.url, token).context("Failed to configure Home Assistant sink")?;
    Ok(Arc::new(sink))
}

fn coordinators(config: &SetlistConfig, sink: Arc<dyn StateSink>) -> Result<Vec<Arc<UserCoordinator>>> {
    config
        .users
        .iter()
        .map(|user| {
            let client = SetlistClient::new(&user.api_key, &config.api)
                .with_context(|| format!("Failed to create setlist.fm client for '{}'", user.name))?;
            let source: Arc<dyn ConcertSource> = Arc::new(client);
            Ok(Arc::new(UserCoordinator::new(
                user.clone(),
                config.vocabulary.clone(),
                source,
                Arc::clone(&sink),
            )))
        })
        .collect()
}

#[cfg(unix)]
async fn force_refresh_on_hangup(handle: RefreshHandle) {
    let mut hangup = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(err) => {
            warn!(error = %err, "Failed to install SIGHUP handler, forced refresh unavailable");
            return;
        }
    };
    while hangup.recv().await.is_some() {
        let notified = handle.force_refresh();
        info!(tasks = notified, "Received SIGHUP, forcing refresh");
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        () = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
