//! gemini-guard library.
//!
//! Reviews staged git changes with a Gemini model and blocks the commit
//! unless the model answers PASS. Every decision is kept in a SQLite log.

pub mod cli;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod git;
pub mod inference;
pub mod pipeline;
pub mod verdict;

pub use error::Error;
