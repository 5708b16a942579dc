use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod controller;
mod domain;
mod inputter;
mod loader;
mod model;
mod pipeline;
mod ui;

use controller::Controller;
use domain::{DirConfig, DirError, Message};
use loader::{FileLoader, PendingLoad, spawn_load};
use model::{Model, Status};
use ui::DirectoryUI;

/// Browse a company directory: search, sort and page through records.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Company file (json, csv, parquet or arrow) with id, name, location and industry columns
    path: String,

    /// Milliseconds to wait for terminal events per frame
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Truncate cell values longer than this
    #[arg(long, default_value_t = 40)]
    max_width: usize,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<String>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Err(e) => {
            error!("Exiting with error: {e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn expand(path: &str) -> Result<PathBuf, DirError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| DirError::LoadingFailed(format!("Cannot expand path {path}: {e}")))
}

fn init_logging(args: &Args) -> Result<(), DirError> {
    let Some(log_file) = &args.log_file else {
        return Ok(());
    };
    let file = File::create(expand(log_file)?)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn run(args: &Args) -> Result<(), DirError> {
    init_logging(args)?;
    let path = expand(&args.path)?;
    info!("Starting cdir for {}", path.display());

    let cfg = DirConfig::default()
        .event_poll_time(args.poll_ms)
        .max_column_width(args.max_width);
    let mut model = Model::init(&cfg);
    let controller = Controller::new(&cfg);

    let mut pending = spawn_load(FileLoader::new(path));

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut model, &controller, &mut pending);
    ratatui::restore();

    info!("Quitting cdir");
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    model: &mut Model,
    controller: &Controller,
    pending: &mut PendingLoad,
) -> Result<(), DirError> {
    let ui = DirectoryUI::new();
    while model.status != Status::QUITTING {
        if let Some(result) = pending.poll() {
            model.update(Message::Loaded(result));
        }

        // Render the current view
        terminal.draw(|f| ui.draw(model, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(model)? {
            model.update(message);
        }
    }
    Ok(())
}
