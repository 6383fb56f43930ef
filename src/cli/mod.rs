//! CLI commands for gemini-guard.

pub mod check;
pub mod history;

use clap::{Parser, Subcommand};

use crate::verdict::Status;

/// Gemini Guard - AI pre-commit gate for staged changes
#[derive(Parser)]
#[command(name = "gemini-guard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Without a subcommand, review the staged changes (pre-commit hook mode)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show recorded gate decisions, newest first
    History {
        /// Maximum number of records to show
        #[arg(long, short, default_value_t = 20)]
        limit: usize,

        /// Only show PASS or FAIL decisions
        #[arg(long)]
        status: Option<Status>,
    },
}
