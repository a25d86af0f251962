pub mod app;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;

use clap::Parser;

use crate::domain::error::Result;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::logging::init_tracing;
use crate::interfaces::cli::{self, Cli};

pub use app::AppState;

/// Parses the command line, loads configuration and runs one command.
pub async fn run() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging);

    cli::execute(cli, config).await
}
