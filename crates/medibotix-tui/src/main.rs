use anyhow::{anyhow, Context, Result};
use clap::Parser;
use medibotix_core::{Config, HttpTransport};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser, Debug)]
#[command(name = "medibotix")]
#[command(about = "Ask questions about your medical reports from the terminal")]
#[command(version)]
struct Args {
    /// Base URL of the MediBotix backend (overrides config and MEDIBOTIX_BACKEND)
    #[arg(long)]
    backend: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Write the effective backend settings to the config file
    #[arg(long, default_value_t = false)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Ignoring config file: {}", e);
        let mut config = Config::new();
        config.apply_env();
        config
    });
    if let Some(backend) = args.backend {
        config.backend_url = backend;
    }
    if let Some(timeout) = args.timeout {
        config.request_timeout_secs = timeout;
    }

    let log_path = init_logging(&config)?;
    tracing::info!(backend = %config.backend_url, "Starting MediBotix");

    if args.save_config {
        config.save()?;
        println!("Saved config to {}", Config::get_config_path()?.display());
    }

    let transport = Arc::new(HttpTransport::from_config(&config)?);
    let backend_url = transport.base_url().to_string();
    let mut app = App::new(transport, backend_url);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    if let Err(e) = &result {
        eprintln!("Error: {:#}. Log file: {}", e, log_path.display());
    }
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}

/// Log to a file; the terminal belongs to the UI. `RUST_LOG` wins over the
/// configured level.
fn init_logging(config: &Config) -> Result<PathBuf> {
    let log_dir = dirs::cache_dir()
        .ok_or_else(|| anyhow!("Could not determine cache directory"))?
        .join("medibotix");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {:?}", log_dir))?;

    let log_path = log_dir.join("medibotix.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(log_path)
}
