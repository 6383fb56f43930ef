//! Pre-commit review of the staged changes.

use std::fmt::Write as _;
use std::path::Path;

use tracing::info;

use crate::config::GuardConfig;
use crate::db::AuditFile;
use crate::error::Error;
use crate::git::GitInspector;
use crate::inference::GeminiClient;
use crate::pipeline::{GatePipeline, Judgement, RunOutcome, EXIT_ALLOW};

const RULE: &str = "========================================";

/// Run the gate in the current directory and return the process exit code.
///
/// Errors are startup failures only: no repository, no credential, or a
/// broken configuration.
pub async fn run() -> Result<i32, Error> {
    println!("[gemini-guard] Initializing...");

    let project_root = std::env::current_dir()?;
    let inspector = GitInspector::open(&project_root)?;
    let config = GuardConfig::load(&project_root)?;
    let client = GeminiClient::new(&config)?;
    let audit = AuditFile::new(&config.audit_db);
    info!(model = client.model(), db = %audit.path().display(), "Gate configured");

    let outcome = GatePipeline::new(&inspector, &client, &audit).run().await;
    print!("{}", render_report(&outcome, audit.path()));

    Ok(outcome.exit_code())
}

/// Human-readable summary printed by the hook.
pub fn render_report(outcome: &RunOutcome, audit_path: &Path) -> String {
    match outcome {
        RunOutcome::NothingStaged => {
            "No staged changes detected. Skipping AI analysis.\n".to_string()
        }
        RunOutcome::Judged(judgement) => render_judgement(judgement, audit_path),
    }
}

fn render_judgement(judgement: &Judgement, audit_path: &Path) -> String {
    let mut out = String::new();

    if judgement.parse_error.is_some() {
        let _ = writeln!(out, "\nError: AI did not return valid JSON.");
        let _ = writeln!(out, "Raw Output: {}", judgement.raw);
    } else {
        let verdict = &judgement.verdict;
        let _ = writeln!(out, "\n{}", RULE);
        let _ = writeln!(out, "AI Status: {}", verdict.status);
        let _ = writeln!(out, "Message:   {}", verdict.message);
        if !verdict.details.is_empty() {
            let _ = writeln!(out, "Details:");
            for detail in &verdict.details {
                let _ = writeln!(out, "   - {}", detail);
            }
        }
        let _ = writeln!(out, "{}\n", RULE);
    }

    match (&judgement.audit_id, &judgement.audit_error) {
        (Some(id), _) => {
            let _ = writeln!(out, "Audit log #{} saved to {}", id, audit_path.display());
        }
        (None, Some(e)) => {
            let _ = writeln!(out, "Warning: audit log not saved: {}", e);
        }
        (None, None) => {}
    }

    if judgement.exit_code() == EXIT_ALLOW {
        let _ = writeln!(out, "Analysis Passed. Proceeding with commit...");
    } else {
        let _ = writeln!(out, "Commit Aborted! Issues detected.");
    }

    out
}
