//! Remote model invocation.
//!
//! [`Analyzer::analyze`] never fails: transport and service errors become a
//! FAIL verdict payload so an unreachable model blocks the commit.

mod gemini;
pub mod prompt;

pub use gemini::GeminiClient;

use std::future::Future;

use crate::error::Error;
use crate::verdict::Verdict;

/// Something that reviews a staged change and answers with raw verdict text.
pub trait Analyzer {
    /// Raw response text, always decodable by the verdict parser on failure.
    fn analyze(&self, diff: &str, context: &str) -> impl Future<Output = String>;
}

/// Synthetic payload standing in for a model response after `err`.
pub fn fail_closed_payload(err: &Error) -> String {
    Verdict::fail(format!("API Error: {}", err)).to_json()
}
