mod scheduler;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use stockwatch_core::{AppConfig, KeywordMatcher, SinkKind};
use stockwatch_engine::{EngineSettings, Watcher};
use stockwatch_notify::{ConfiguredSink, DiscordSink, LogSink, NotificationSink, Renderer};
use stockwatch_scraper::{CatalogDiscovery, DiscoveryOptions, StorefrontClient};
use stockwatch_store::{JsonFileStore, KeyValueStore, MemoryStore, StateStore};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "stockwatch")]
#[command(about = "Storefront restock monitor")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sweep every target on the configured interval until interrupted.
    Run {
        /// Log notifications instead of sending them; state is kept in memory.
        #[arg(long)]
        dry_run: bool,
    },
    /// Run a single sweep and exit.
    Once {
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate configuration and print it with secrets redacted.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = stockwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let (dry_run, once) = match cli.command {
        Some(Commands::CheckConfig) => {
            config.validate_credentials()?;
            println!("{config:#?}");
            return Ok(());
        }
        Some(Commands::Once { dry_run }) => (dry_run, true),
        Some(Commands::Run { dry_run }) => (dry_run, false),
        None => (false, false),
    };

    if dry_run {
        config.sink = SinkKind::Log;
    }
    config.validate_credentials()?;

    tracing::info!(
        targets = config.targets.len(),
        sink = %config.sink,
        dry_run,
        "stockwatch starting"
    );

    if dry_run {
        execute(MemoryStore::new(), &config, once).await
    } else {
        execute(JsonFileStore::new(&config.state_path), &config, once).await
    }
}

/// Wires the engine around `store` and runs it.
async fn execute<S: KeyValueStore + 'static>(
    store: S,
    config: &AppConfig,
    once: bool,
) -> anyhow::Result<()> {
    let store = StateStore::new(store);
    store
        .load()
        .await
        .with_context(|| format!("failed to load state from {}", config.state_path.display()))?;

    let watcher = Arc::new(Watcher::new(
        build_discovery(config)?,
        store,
        build_sink(config)?,
        Renderer::new(config.display.clone()),
        KeywordMatcher::new(&config.keywords),
        config.targets.clone(),
        EngineSettings::from_config(config),
    ));

    if once {
        let summary = watcher.run_once().await;
        if summary.failed > 0 {
            anyhow::bail!("{} of {} targets failed", summary.failed, summary.targets);
        }
        return Ok(());
    }

    run_until_shutdown(watcher, config.poll_interval_secs).await
}

async fn run_until_shutdown<S, N>(
    watcher: Arc<Watcher<S, N>>,
    interval_secs: u64,
) -> anyhow::Result<()>
where
    S: KeyValueStore + 'static,
    N: NotificationSink + 'static,
{
    let mut scheduler = scheduler::build_scheduler(Arc::clone(&watcher), interval_secs).await?;

    let first = Arc::clone(&watcher);
    tokio::spawn(async move {
        first.run_once().await;
    });

    shutdown_signal().await;

    scheduler.shutdown().await?;
    if let Err(e) = watcher.store().flush().await {
        tracing::warn!(error = %e, "final state flush failed");
    }
    Ok(())
}

fn build_discovery(config: &AppConfig) -> anyhow::Result<CatalogDiscovery> {
    let client = StorefrontClient::new(
        config.scraper_request_timeout_secs,
        &config.scraper_user_agent,
        config.scraper_max_retries,
        config.scraper_retry_backoff_base_ms,
    )
    .context("failed to build storefront client")?;

    Ok(CatalogDiscovery::new(
        client,
        DiscoveryOptions {
            bulk_page_size: config.scraper_bulk_page_size,
            max_concurrent_fetches: config.scraper_max_concurrent_fetches.max(1),
            keywords: config.keywords.clone(),
        },
    ))
}

fn build_sink(config: &AppConfig) -> anyhow::Result<ConfiguredSink> {
    match config.sink {
        SinkKind::Log => Ok(ConfiguredSink::Log(LogSink::new())),
        SinkKind::Discord => {
            let token = config
                .discord_token
                .as_deref()
                .context("DISCORD_TOKEN is required for the discord sink")?;
            let sink = DiscordSink::new(
                &config.discord_api_base,
                token,
                config.scraper_request_timeout_secs,
            )
            .context("failed to build discord client")?;
            Ok(ConfiguredSink::Discord(sink))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping scheduler");
}

#[cfg(test)]
mod tests;
