//! gemini-guard - AI pre-commit gate for staged changes.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gemini_guard::cli::{self, Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the hook report.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gemini_guard=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        None => cli::check::run().await,
        Some(Commands::History { limit, status }) => cli::history::run(limit, status).map(|_| 0),
    };

    match result {
        Ok(code) => ExitCode::from(code.clamp(0, 255) as u8),
        Err(e) => {
            error!(error = %e, "Startup failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
