//! cpiwatch - Turkey CPI dashboard
//!
//! A terminal UI application that displays the year-over-year CPI series, its
//! 10-year forecast and the raw data behind both.

use std::fs::{self, OpenOptions};
use std::io;
use std::panic;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use cpiwatch::app::{App, AppState};
use cpiwatch::config::Config;
use cpiwatch::data::TcmbClient;
use cpiwatch::forecast::{ArForecaster, LazyModel, DEFAULT_HORIZON};
use cpiwatch::refresh::{forecast_in_progress, Orchestrator};
use cpiwatch::store::Stores;
use cpiwatch::ui;

/// Log file written next to the artifacts
const LOG_FILE: &str = "cpiwatch.log";

/// Sends logs to a file so they do not corrupt the terminal UI.
///
/// Logging stays disabled if the file cannot be opened.
fn init_logging(data_dir: &Path) {
    let file = fs::create_dir_all(data_dir).and_then(|_| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(data_dir.join(LOG_FILE))
    });
    let Ok(file) = file else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
}

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the application panics.
///
/// Panics raised inside the forecast model are contained by the orchestrator, so the
/// hook only logs them and leaves the terminal alone.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        if forecast_in_progress() {
            tracing::error!("forecast model panicked: {}", panic_info);
            return;
        }
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

/// Renders the UI based on the current application state
fn render_ui(frame: &mut ratatui::Frame, app: &App) {
    match app.state {
        AppState::Loading => {
            render_loading(frame);
        }
        AppState::Dashboard => {
            ui::render_dashboard(frame, app);
        }
    }

    if app.show_help {
        ui::render_help_overlay(frame);
    }
}

/// Renders a loading message while data is being fetched
fn render_loading(frame: &mut ratatui::Frame) {
    use ratatui::{
        layout::{Alignment, Constraint, Direction, Layout},
        style::{Color, Style},
        widgets::Paragraph,
    };

    let area = frame.area();

    // Center the loading message vertically
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(3),
            Constraint::Percentage(45),
        ])
        .split(area);

    let loading_text = Paragraph::new("Loading CPI data...")
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center);

    frame.render_widget(loading_text, chunks[1]);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration errors are reported before the terminal is taken over
    let config = Config::from_env()?;
    init_logging(&config.data_dir);
    tracing::info!(data_dir = %config.data_dir.display(), "cpiwatch starting");

    let stores = Stores::open(&config.data_dir);
    let source = TcmbClient::new(config.source_url.clone(), config.fetch_timeout)?;
    let order = config.ar_order;
    let model = LazyModel::new(move || Ok(ArForecaster::with_order(order)));
    let orchestrator = Orchestrator::new(&source, &model, &stores);

    // Set up panic hook to restore terminal on crash
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new();

    // Initial render to show loading state
    terminal.draw(|f| render_ui(f, &app))?;

    app.load(&orchestrator, DEFAULT_HORIZON).await;

    // Main event loop
    loop {
        terminal.draw(|f| render_ui(f, &app))?;

        // Poll for keyboard events with 100ms timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    tracing::info!("cpiwatch exiting");
    Ok(())
}
