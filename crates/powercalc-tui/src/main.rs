//! PowerCalc - electrical engineering calculators in the terminal.
//!
//! This application provides a keyboard-driven form over the calculator
//! registry in `powercalc-core`, and keeps an offline copy of the web
//! front-end's static assets current in the background.

mod app;
mod ui;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{build_asset_manager, App, AppState};
use powercalc_core::config::Config;
use powercalc_core::utils::age_display;
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file written inside the cache directory
const LOG_FILE: &str = "powercalc.log";

fn env_filter() -> EnvFilter {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Initialize tracing for the TUI.
///
/// The terminal belongs to the UI, so logs go to a file in the cache
/// directory. The returned guard flushes the writer on drop.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let log_dir = config.cache_dir().ok()?;
    std::fs::create_dir_all(&log_dir).ok()?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        log_dir, LOG_FILE,
    ));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter())
        .init();

    Some(guard)
}

/// Initialize tracing to stderr for headless commands
fn init_stderr_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "--sync-assets" {
        init_stderr_tracing();
        return sync_assets().await;
    }

    let (config, config_error) = match Config::load_or_init() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    // Initialize logging
    let _log_guard = init_tracing(&config);
    info!("PowerCalc starting");
    if let Some(e) = config_error {
        warn!(error = %e, "Using default configuration");
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app and start keeping the offline assets current
    let mut app = App::new(config);
    app.start_asset_worker().await;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("PowerCalc shutting down");
    Ok(())
}

/// Run one full asset lifecycle without the UI and report the outcome
async fn sync_assets() -> Result<()> {
    let config = Config::load()?;
    eprintln!("Syncing assets from {}...", config.asset_origin());

    let mut manager = build_asset_manager(&config)?;

    if let Some(previous) = manager.restore().await? {
        match previous.cached_at {
            Some(cached_at) => eprintln!(
                "Current version: {} (cached {})",
                previous.version,
                age_display(cached_at)
            ),
            None => eprintln!("Current version: {}", previous.version),
        }
    }

    let installed = manager.install().await.context("Asset install failed")?;
    eprintln!(
        "Installed {} ({} assets)",
        installed.version, installed.cached
    );

    let activated = manager.activate().await?;
    eprintln!("Activated {}", activated.version);
    for name in &activated.purged {
        eprintln!("  removed {}", name);
    }

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                // Handle input
                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Check for completed background tasks
        app.check_background_tasks().await;

        // Check if we should quit
        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
