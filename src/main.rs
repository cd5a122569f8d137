mod app;
mod config;
mod form;
mod predict;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, Popup, PredictionResult};
use config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "examscore")]
#[command(version = "0.1.0")]
#[command(about = "Predict a student's exam score from a terminal form")]
struct Args {
    /// Prediction endpoint URL (overrides the config file)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Preset a form field, e.g. --set age=22 --set course=bca
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Print the request body for the current form and exit
    #[arg(long)]
    features: bool,

    /// Submit the form once without the TUI and print the result as JSON
    #[arg(short, long)]
    predict: bool,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    write_config: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.log_file.as_deref())?;

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }

    if args.write_config {
        let path = config.save(args.config.as_deref())?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let mut app = App::new(config)?;
    for spec in &args.overrides {
        app.apply_override(spec)
            .with_context(|| format!("Invalid --set {}", spec))?;
    }

    // Handle CLI-only commands
    if args.features {
        println!("{}", serde_json::to_string(&features_body(&app))?);
        return Ok(());
    }

    if args.predict {
        let output = predict_once(&mut app).await?;
        println!("{}", serde_json::to_string(&output)?);
        // Non-zero exit when the service (or the connection) failed
        if let Some(message) = output.get("error").and_then(|e| e.as_str()) {
            anyhow::bail!("{}", message);
        }
        return Ok(());
    }

    // Run TUI
    run_tui(&mut app).await
}

fn init_logging(log_file: Option<&std::path::Path>) -> Result<()> {
    let (file_layer, stderr_layer) = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Could not open log file {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), None)
        }
        None => (None, Some(tracing_subscriber::fmt::layer().with_writer(io::stderr))),
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    Ok(())
}

/// Request body for the current form
fn features_body(app: &App) -> serde_json::Value {
    serde_json::json!({ "features": app.form.features() })
}

/// Submit the form once and wait for its outcome
async fn predict_once(app: &mut App) -> Result<serde_json::Value> {
    app.submit();
    app.settle().await;
    prediction_output(app.result.as_ref())
}

fn prediction_output(result: Option<&PredictionResult>) -> Result<serde_json::Value> {
    match result {
        Some(PredictionResult::Score(score)) => Ok(serde_json::json!({
            "prediction": score,
            "display": predict::display_score(*score),
        })),
        Some(PredictionResult::Error(message)) => Ok(serde_json::json!({ "error": message })),
        None => anyhow::bail!("No response from prediction service"),
    }
}

async fn run_tui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        // Request tasks run on the other runtime workers while we poll
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc if app.popup == Popup::None => return Ok(()),
                        KeyCode::Char('c') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
                            return Ok(())
                        }
                        _ => {
                            // Handle key and catch any errors to prevent crashes
                            if let Err(e) = app.handle_key(key) {
                                tracing::warn!("Key handling failed: {}", e);
                                app.set_status(format!("Error: {}", e));
                            }
                        }
                    }
                }
            }
        }

        // Apply finished requests
        app.tick();
    }
}
