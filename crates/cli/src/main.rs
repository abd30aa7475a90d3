mod app;

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io,
    path::Path,
};

use tally_core::{
    config::{self, AppConfig},
    SaveManager,
};
use tracing_subscriber::{prelude::*, EnvFilter};

fn main() -> Result<()> {
    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config)?;

    let saves = SaveManager::new(&config.save_path);
    let session = saves.load_or_fresh();
    tracing::info!(path = %saves.path().display(), phase = ?session.phase(), "session restored");

    let mut app = app::TallyApp::new(config, saves, session);
    let stdin = io::stdin();
    app.run(stdin.lock(), io::stdout())
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let log_dir = config
        .save_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("tally.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(io::stderr);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(std::sync::Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
