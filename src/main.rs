//! EntroPick - Main Entry Point
//!
//! A Slack bot that picks code reviewers at random from configured pools.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use entropick::commands::CommandHandler;
use entropick::config::{BotSettings, PoolsConfig, SlackConfig};
use entropick::dispatch::{DispatchMessage, TriggerDispatcher};
use entropick::pool::{PoolRegistry, Selector};
use entropick::slack::{BotOptions, SlackBot};

/// Slack bot that picks code reviewers at random.
#[derive(Parser, Debug)]
#[command(name = "entropick")]
#[command(about = "Pick code reviewers at random from Slack")]
#[command(version)]
struct Args {
    /// Path to the pools JSON file (overrides ENTROPICK_POOLS_PATH).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Generate an example pools file and exit.
    #[arg(long)]
    generate_config: bool,

    /// Fixed RNG seed for reproducible picks (overrides ENTROPICK_SEED).
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    if args.generate_config {
        return generate_example_config();
    }

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let slack_config =
        SlackConfig::from_env().context("Failed to load Slack configuration from environment")?;

    let mut settings = BotSettings::from_env_with_defaults();
    if let Some(path) = args.config {
        settings.pools_path = path;
    }
    if args.seed.is_some() {
        settings.seed = args.seed;
    }

    let pools = PoolsConfig::load_from_file(&settings.pools_path).with_context(|| {
        format!(
            "Failed to load pools configuration from {}",
            settings.pools_path.display()
        )
    })?;
    pools
        .validate()
        .context("Pools configuration validation failed")?;

    info!(
        "Loaded {} pools with {} reviewers (default: {})",
        pools.len(),
        pools.reviewer_count(),
        pools.default_pool
    );

    let selector = Selector::new(settings.seed);
    if let Some(seed) = selector.seed() {
        info!("Using fixed RNG seed {}", seed);
    }

    let registry = Arc::new(RwLock::new(PoolRegistry::from_config(&pools)));
    let handler = Arc::new(CommandHandler::new(
        settings.command_prefix.clone(),
        registry,
        selector,
        settings.history_size,
        settings.pools_path.clone(),
    ));

    let bot = SlackBot::connect(
        slack_config,
        BotOptions::default(),
        settings.min_post_interval_ms,
    )
    .await
    .context("Failed to connect to Slack")?;
    let bot = Arc::new(bot);

    let (dispatch_tx, dispatch_rx) = mpsc::channel::<DispatchMessage>(32);
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

    let dispatcher = TriggerDispatcher::new(handler, Arc::clone(&bot));
    let dispatcher_handle = tokio::spawn(async move {
        dispatcher.run(dispatch_rx).await;
    });

    let socket_bot = Arc::clone(&bot);
    let socket_tx = dispatch_tx.clone();
    let mut socket_handle = tokio::spawn(async move {
        socket_bot.run_socket_mode(socket_tx, shutdown_rx).await
    });

    info!("EntroPick is running. Use Ctrl+C to stop.");
    info!("Command prefix: {}", settings.command_prefix);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        result = &mut socket_handle => {
            match result {
                Ok(Ok(())) => info!("Slack connection closed"),
                Ok(Err(e)) => error!("Slack connection failed: {}", e),
                Err(e) => error!("Slack connection task panicked: {}", e),
            }
        }
    }

    info!("Shutting down...");
    let _ = shutdown_tx.send(());
    let _ = dispatch_tx.send(DispatchMessage::Shutdown).await;
    if !socket_handle.is_finished() {
        let _ = socket_handle.await;
    }
    let _ = dispatcher_handle.await;

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Generates an example pools file.
fn generate_example_config() -> Result<()> {
    let example = PoolsConfig::example();
    example.save_to_file("pools.example.json")?;

    println!("✓ Example configuration written to: pools.example.json");
    println!("\nTo use this bot:");
    println!("1. Copy pools.example.json to pools.json");
    println!("2. Replace the example reviewers with your team's Slack user IDs");
    println!("3. Create a .env file with SLACK_BOT_TOKEN and SLACK_APP_TOKEN");
    println!("4. Run: entropick");

    Ok(())
}
