use anyhow::{Context, Result};
use clap::Parser;
use offerdesk::api::BotClient;
use offerdesk::batch::PollConfig;
use offerdesk::config::{Config, LoggingConfig};
use offerdesk::ui::state::lock;
use offerdesk::ui::{run_tui, ActionContext, ActionOptions, AppState, Command};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Toast expiry and batch block hiding.
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(name = "offerdesk")]
#[command(about = "Terminal dashboard for an eBay offer negotiation bot")]
#[command(version)]
struct Args {
    /// Config file (default: offerdesk.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bot backend URL, overrides the config file
    #[arg(short, long)]
    base_url: Option<String>,

    /// Stats refresh interval in milliseconds
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(500..=60000))]
    refresh: Option<u64>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok().filter(|v| !v.is_empty());
    let mut builder = env_logger::Builder::new();

    match (&logging.file, &rust_log) {
        (Some(path), _) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
            builder.parse_filters(rust_log.as_deref().unwrap_or(&logging.level));
        }
        // Stderr would draw over the TUI, so only log there on request
        (None, Some(filters)) => {
            builder.target(env_logger::Target::Stderr);
            builder.parse_filters(filters);
        }
        (None, None) => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }

    builder.try_init().context("Failed to initialize logging")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = args.base_url {
        config.api.base_url = url;
    }
    if let Some(refresh) = args.refresh {
        config.ui.refresh_ms = refresh;
    }
    if let Some(path) = args.log_file {
        config.logging.file = Some(path);
    }
    config.validate().context("Invalid configuration")?;

    init_logging(&config.logging)?;

    let client = BotClient::new(&config.api.base_url, config.timeout())
        .with_context(|| format!("Invalid backend URL {}", config.api.base_url))?;
    log::info!("Using bot backend at {}", client.base_url());

    // Create shared application state
    let app_state = Arc::new(Mutex::new(AppState::new(
        client.base_url().as_str().trim_end_matches('/'),
        config.toast_ttl(),
    )));

    let shutdown = CancellationToken::new();
    let ctx = ActionContext {
        client,
        state: Arc::clone(&app_state),
        options: ActionOptions {
            poll: PollConfig {
                interval: config.poll_interval(),
                max_polls: config.sync.max_polls,
            },
            progress_linger: config.progress_linger(),
            export_dir: config.export.dir.clone(),
        },
        shutdown: shutdown.clone(),
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<Command>();

    // The TUI blocks on terminal events, keep it off the runtime workers
    let tui_state = Arc::clone(&app_state);
    let tui_tx = tx.clone();
    let mut tui_handle = tokio::task::spawn_blocking(move || run_tui(tui_state, tui_tx));

    for command in [Command::RefreshStats, Command::CheckHealth, Command::LoadOffers] {
        let _ = tx.send(command);
    }
    lock(&app_state).offers.loading = true;

    let mut refresh = tokio::time::interval(config.refresh_interval());
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The initial commands above already cover the first tick
    refresh.tick().await;
    let mut housekeeping = tokio::time::interval(HOUSEKEEPING_INTERVAL);

    let tui_result = loop {
        tokio::select! {
            Some(command) = rx.recv() => {
                log::debug!("Executing {:?}", command);
                let ctx = ctx.clone();
                tokio::spawn(async move { ctx.execute(command).await });
            }
            _ = refresh.tick() => {
                for command in [Command::RefreshStats, Command::CheckHealth] {
                    let _ = tx.send(command);
                }
            }
            _ = housekeeping.tick() => {
                lock(&app_state).expire(Instant::now());
            }
            result = &mut tui_handle => {
                break result;
            }
        }
    };

    // Stop batch pollers and anything else waiting on shutdown
    shutdown.cancel();
    log::info!("Shutting down");

    tui_result.context("TUI task panicked")??;

    Ok(())
}
