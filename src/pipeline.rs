//! Gate pipeline: staged diff to exit decision.
//!
//! Once a diff exists every path ends in an audit write and a verdict.
//! Nothing after startup can crash the hook; failures turn into FAIL.

use tracing::{info, warn};

use crate::context;
use crate::db::{AuditSink, NewAuditRecord};
use crate::error::Error;
use crate::git::StagedSource;
use crate::inference::Analyzer;
use crate::verdict::{self, Verdict};

/// Exit code that allows the commit.
pub const EXIT_ALLOW: i32 = 0;

/// Exit code that blocks the commit.
pub const EXIT_BLOCK: i32 = 1;

/// Result of one gate run.
#[derive(Debug)]
pub enum RunOutcome {
    /// Nothing staged; no inference, no audit record.
    NothingStaged,
    Judged(Judgement),
}

/// A verdict reached over a non-empty diff.
#[derive(Debug)]
pub struct Judgement {
    /// Final verdict. On parse failure this is FAIL carrying the raw text.
    pub verdict: Verdict,
    /// Model output as received.
    pub raw: String,
    /// Why the raw output could not be decoded, if it could not.
    pub parse_error: Option<String>,
    pub audit_id: Option<i64>,
    pub audit_error: Option<String>,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::NothingStaged => EXIT_ALLOW,
            RunOutcome::Judged(judgement) => judgement.exit_code(),
        }
    }
}

impl Judgement {
    pub fn exit_code(&self) -> i32 {
        if self.parse_error.is_none() && self.verdict.passed() {
            EXIT_ALLOW
        } else {
            EXIT_BLOCK
        }
    }
}

/// Orchestrates inspection, inference, parsing and audit for one commit.
pub struct GatePipeline<'a, S, A, L> {
    source: &'a S,
    analyzer: &'a A,
    audit: &'a L,
}

impl<'a, S, A, L> GatePipeline<'a, S, A, L>
where
    S: StagedSource,
    A: Analyzer,
    L: AuditSink,
{
    pub fn new(source: &'a S, analyzer: &'a A, audit: &'a L) -> Self {
        Self {
            source,
            analyzer,
            audit,
        }
    }

    pub async fn run(&self) -> RunOutcome {
        let diff = self.source.staged_diff();
        if diff.is_empty() {
            info!("No staged changes, skipping analysis");
            return RunOutcome::NothingStaged;
        }

        let files = self.source.staged_files();
        info!(files = files.len(), "Reading file context");
        let context = context::assemble(&files, |path| self.source.read_file(path));

        let raw = self.analyzer.analyze(&diff, &context).await;

        let (verdict, parse_error) = match verdict::parse(&raw) {
            Ok(verdict) => (verdict, None),
            Err(e) => {
                let reason = match e {
                    Error::InvalidVerdict { reason, .. } => reason,
                    other => other.to_string(),
                };
                warn!(reason = %reason, "Model output is not a valid verdict");
                (Verdict::fail(raw.clone()), Some(reason))
            }
        };

        let record = NewAuditRecord::from_verdict(&verdict, &diff, &context);
        let (audit_id, audit_error) = match self.audit.record(&record) {
            Ok(id) => (Some(id), None),
            Err(e) => {
                warn!(error = %e, "Failed to write audit record");
                (None, Some(e.to_string()))
            }
        };

        RunOutcome::Judged(Judgement {
            verdict,
            raw,
            parse_error,
            audit_id,
            audit_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::db::{AuditStore, HistoryQuery};
    use crate::git::MISSING_SENTINEL;
    use crate::inference::fail_closed_payload;
    use crate::verdict::Status;

    #[derive(Default)]
    struct FakeRepo {
        diff: String,
        files: Vec<String>,
        contents: HashMap<String, String>,
    }

    impl FakeRepo {
        fn staged(diff: &str, files: &[(&str, &str)]) -> Self {
            Self {
                diff: diff.to_string(),
                files: files.iter().map(|(p, _)| p.to_string()).collect(),
                contents: files
                    .iter()
                    .map(|(p, c)| (p.to_string(), c.to_string()))
                    .collect(),
            }
        }
    }

    impl StagedSource for FakeRepo {
        fn staged_diff(&self) -> String {
            self.diff.clone()
        }

        fn staged_files(&self) -> Vec<String> {
            self.files.clone()
        }

        fn read_file(&self, path: &str) -> String {
            self.contents
                .get(path)
                .cloned()
                .unwrap_or_else(|| MISSING_SENTINEL.to_string())
        }
    }

    /// Answers with canned text and remembers what it was asked.
    struct FakeModel {
        response: String,
        calls: std::cell::RefCell<Vec<(String, String)>>,
    }

    impl FakeModel {
        fn answering(response: &str) -> Self {
            Self {
                response: response.to_string(),
                calls: Default::default(),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl Analyzer for FakeModel {
        async fn analyze(&self, diff: &str, context: &str) -> String {
            self.calls
                .borrow_mut()
                .push((diff.to_string(), context.to_string()));
            self.response.clone()
        }
    }

    struct BrokenSink;

    impl AuditSink for BrokenSink {
        fn record(&self, _record: &NewAuditRecord) -> Result<i64, Error> {
            Err(Error::AuditWrite(rusqlite::Error::QueryReturnedNoRows))
        }
    }

    fn all_records(store: &AuditStore) -> Vec<crate::db::AuditRecord> {
        store.list(&HistoryQuery::default()).unwrap()
    }

    fn judged(outcome: RunOutcome) -> Judgement {
        match outcome {
            RunOutcome::Judged(judgement) => judgement,
            RunOutcome::NothingStaged => panic!("expected a judgement"),
        }
    }

    #[tokio::test]
    async fn test_empty_diff_allows_without_audit() {
        let repo = FakeRepo::default();
        let model = FakeModel::answering("unused");
        let store = AuditStore::open_memory().unwrap();

        let outcome = GatePipeline::new(&repo, &model, &store).run().await;

        assert!(matches!(outcome, RunOutcome::NothingStaged));
        assert_eq!(outcome.exit_code(), EXIT_ALLOW);
        assert_eq!(model.call_count(), 0);
        assert!(all_records(&store).is_empty());
    }

    #[tokio::test]
    async fn test_pass_scenario() {
        let repo = FakeRepo::staged("+print('x')", &[("a.py", "print('x')\n")]);
        let model = FakeModel::answering(r#"{"status":"PASS","message":"ok","details":[]}"#);
        let store = AuditStore::open_memory().unwrap();

        let outcome = GatePipeline::new(&repo, &model, &store).run().await;
        assert_eq!(outcome.exit_code(), EXIT_ALLOW);

        let records = all_records(&store);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, "PASS");
        assert_eq!(records[0].diff, "+print('x')");
        assert!(records[0].context.contains("--- START OF FILE: a.py ---"));

        let calls = model.calls.borrow();
        assert_eq!(calls[0].0, "+print('x')");
        assert!(calls[0].1.contains("print('x')\n"));
    }

    #[tokio::test]
    async fn test_fail_scenario_keeps_details() {
        let repo = FakeRepo::staged("+query(user_input)", &[("db.py", "query(user_input)")]);
        let model = FakeModel::answering(
            r#"{"status":"FAIL","message":"SQL injection risk","details":["line 5"]}"#,
        );
        let store = AuditStore::open_memory().unwrap();

        let outcome = GatePipeline::new(&repo, &model, &store).run().await;
        assert_eq!(outcome.exit_code(), EXIT_BLOCK);

        let judgement = judged(outcome);
        assert_eq!(judgement.verdict.details, vec!["line 5".to_string()]);
        assert!(judgement.parse_error.is_none());

        let records = all_records(&store);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, "FAIL");
        assert_eq!(records[0].message, "SQL injection risk");
    }

    #[tokio::test]
    async fn test_fenced_response_passes() {
        let repo = FakeRepo::staged("+x", &[("a.py", "x")]);
        let model =
            FakeModel::answering("```json\n{\"status\":\"PASS\",\"message\":\"ok\",\"details\":[]}\n```");
        let store = AuditStore::open_memory().unwrap();

        let outcome = GatePipeline::new(&repo, &model, &store).run().await;
        assert_eq!(outcome.exit_code(), EXIT_ALLOW);
    }

    #[tokio::test]
    async fn test_malformed_response_blocks_and_keeps_evidence() {
        let repo = FakeRepo::staged("+x", &[("a.py", "x")]);
        let model = FakeModel::answering("not json");
        let store = AuditStore::open_memory().unwrap();

        let outcome = GatePipeline::new(&repo, &model, &store).run().await;
        assert_eq!(outcome.exit_code(), EXIT_BLOCK);

        let judgement = judged(outcome);
        assert!(judgement.parse_error.is_some());
        assert_eq!(judgement.raw, "not json");

        let records = all_records(&store);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, "FAIL");
        assert_eq!(records[0].message, "not json");
        assert_eq!(records[0].verdict().unwrap().message, "not json");
    }

    #[tokio::test]
    async fn test_inference_failure_blocks() {
        let repo = FakeRepo::staged("+x", &[("a.py", "x")]);
        let payload = fail_closed_payload(&Error::inference("connection refused"));
        let model = FakeModel::answering(&payload);
        let store = AuditStore::open_memory().unwrap();

        let outcome = GatePipeline::new(&repo, &model, &store).run().await;
        assert_eq!(outcome.exit_code(), EXIT_BLOCK);

        let records = all_records(&store);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, "FAIL");
        assert!(records[0].message.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_change_decision() {
        let repo = FakeRepo::staged("+x", &[("a.py", "x")]);
        let model = FakeModel::answering(r#"{"status":"PASS","message":"ok","details":[]}"#);

        let outcome = GatePipeline::new(&repo, &model, &BrokenSink).run().await;
        assert_eq!(outcome.exit_code(), EXIT_ALLOW);

        let judgement = judged(outcome);
        assert!(judgement.audit_id.is_none());
        assert!(judgement.audit_error.is_some());
        assert_eq!(judgement.verdict.status, Status::Pass);
    }

    #[tokio::test]
    async fn test_one_record_per_run() {
        let repo = FakeRepo::staged("+x", &[("a.py", "x")]);
        let store = AuditStore::open_memory().unwrap();

        for response in [
            r#"{"status":"PASS","message":"ok","details":[]}"#,
            r#"{"status":"FAIL","message":"bad","details":["x"]}"#,
            "garbage",
        ] {
            let model = FakeModel::answering(response);
            GatePipeline::new(&repo, &model, &store).run().await;
        }

        let statuses: Vec<_> = all_records(&store).into_iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec!["FAIL", "FAIL", "PASS"]);
    }

    #[tokio::test]
    async fn test_deleted_file_not_in_context() {
        // Deletions never appear in staged_files, only in the diff.
        let repo = FakeRepo::staged(
            "diff --git a/removed.py b/removed.py\ndeleted file mode 100644\n-old",
            &[("kept.py", "new")],
        );
        let model = FakeModel::answering(r#"{"status":"PASS","message":"ok","details":[]}"#);
        let store = AuditStore::open_memory().unwrap();

        GatePipeline::new(&repo, &model, &store).run().await;

        let context = &all_records(&store)[0].context;
        assert!(context.contains("kept.py"));
        assert!(!context.contains("removed.py"));
    }
}
