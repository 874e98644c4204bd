//! Lazy validation pipelines
//!
//! A validator describes its work as an ordered stream of checks. Each check
//! yields exactly one [`Outcome`]; [`AsyncValidator::validate`] drops the
//! passes so callers only ever see failures. Streams own their input and are
//! rebuilt on every call, so a validator can be run any number of times.

use std::path::Path;
use std::pin::Pin;
use std::time::Instant;

use futures::{Stream, StreamExt, future};
use tracing::debug;

use crate::model::{IssueKind, Outcome, ValidationResult, ValidationSummary};

/// Stream of per-check outcomes, in check order
pub type OutcomeStream = Pin<Box<dyn Stream<Item = Outcome> + Send>>;

/// Stream of failures only
pub type ResultStream = Pin<Box<dyn Stream<Item = ValidationResult> + Send>>;

/// A validator built from an ordered sequence of checks
pub trait AsyncValidator {
    type Input: Send + 'static;

    /// Run every applicable check, yielding one outcome per executed check
    fn checks(&self, input: Self::Input) -> OutcomeStream;

    /// Run the checks and keep only the failures
    fn validate(&self, input: Self::Input) -> ResultStream {
        failures(self.checks(input))
    }
}

/// Filter an outcome stream down to its failures, preserving order
pub fn failures(outcomes: OutcomeStream) -> ResultStream {
    Box::pin(outcomes.filter_map(|outcome| future::ready(outcome.into_failure())))
}

/// Fails with a `File` error when `path` is not an existing regular file
pub async fn check_file_exists(path: &Path, description: &str) -> Outcome {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => Outcome::Pass,
        _ => {
            debug!(path = %path.display(), "{} file not found", description);
            Outcome::Fail(ValidationResult::error(
                IssueKind::File,
                format!("{description} file not found"),
            ))
        }
    }
}

/// Rejects empty and blank paths, then checks the file exists
pub async fn check_path(path: &str, description: &str) -> Outcome {
    if path.is_empty() {
        return Outcome::Fail(ValidationResult::error(
            IssueKind::Input,
            format!("{description} path cannot be empty"),
        ));
    }
    if path.trim().is_empty() {
        return Outcome::Fail(ValidationResult::error(
            IssueKind::Input,
            format!("{description} path cannot be blank"),
        ));
    }
    check_file_exists(Path::new(path), description).await
}

/// Drain a result stream, timing how long the validation took
pub async fn collect_with_summary(results: ResultStream) -> (Vec<ValidationResult>, ValidationSummary) {
    let started = Instant::now();
    let results: Vec<ValidationResult> = results.collect().await;
    let summary = ValidationSummary::from_results(&results, started.elapsed());
    (results, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;
    use async_stream::stream;
    use tempfile::TempDir;

    /// Replays a fixed list of outcomes, yielding to the runtime between them
    struct ScriptedValidator;

    impl AsyncValidator for ScriptedValidator {
        type Input = Vec<Outcome>;

        fn checks(&self, input: Vec<Outcome>) -> OutcomeStream {
            Box::pin(stream! {
                for outcome in input {
                    tokio::task::yield_now().await;
                    yield outcome;
                }
            })
        }
    }

    fn failure(message: &str) -> Outcome {
        Outcome::Fail(ValidationResult::error(IssueKind::Syntax, message))
    }

    #[tokio::test]
    async fn test_validate_drops_passes_and_keeps_order() {
        let script = vec![
            Outcome::Pass,
            failure("first"),
            Outcome::Pass,
            failure("second"),
            Outcome::Pass,
        ];

        let results: Vec<_> = ScriptedValidator.validate(script).collect().await;
        let messages: Vec<_> = results.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_checks_reports_every_step() {
        let script = vec![Outcome::Pass, failure("only"), Outcome::Pass];
        let outcomes: Vec<_> = ScriptedValidator.checks(script).collect().await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_pass());
        assert!(!outcomes[1].is_pass());
    }

    #[tokio::test]
    async fn test_all_passes_yield_nothing() {
        let results: Vec<_> = ScriptedValidator
            .validate(vec![Outcome::Pass, Outcome::Pass])
            .collect()
            .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_validator_is_restartable() {
        let script = vec![failure("again")];
        let first: Vec<_> = ScriptedValidator.validate(script.clone()).collect().await;
        let second: Vec<_> = ScriptedValidator.validate(script).collect().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_check_file_exists() {
        let temp_dir = TempDir::new().unwrap();
        let present = temp_dir.path().join("present.xml");
        std::fs::write(&present, "<root/>").unwrap();

        assert!(check_file_exists(&present, "XML").await.is_pass());

        let missing = check_file_exists(&temp_dir.path().join("absent.xml"), "XML").await;
        let result = missing.into_failure().unwrap();
        assert_eq!(result.kind, IssueKind::File);
        assert_eq!(result.severity, Severity::Error);
        assert_eq!(result.message, "XML file not found");
    }

    #[tokio::test]
    async fn test_directory_is_not_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let outcome = check_file_exists(temp_dir.path(), "YAML").await;
        assert_eq!(
            outcome.into_failure().unwrap().message,
            "YAML file not found"
        );
    }

    #[tokio::test]
    async fn test_check_path_rejects_empty_and_blank() {
        let empty = check_path("", "XSD schema").await.into_failure().unwrap();
        assert_eq!(empty.kind, IssueKind::Input);
        assert_eq!(empty.message, "XSD schema path cannot be empty");

        let blank = check_path("   ", "XSD schema").await.into_failure().unwrap();
        assert_eq!(blank.kind, IssueKind::Input);
        assert_eq!(blank.message, "XSD schema path cannot be blank");

        let missing = check_path("nope.xsd", "XSD schema").await.into_failure().unwrap();
        assert_eq!(missing.kind, IssueKind::File);
        assert_eq!(missing.message, "XSD schema file not found");
    }

    #[tokio::test]
    async fn test_collect_with_summary() {
        let script = vec![
            failure("broken"),
            Outcome::Fail(ValidationResult::warning(IssueKind::Workflow, "odd")),
        ];
        let (results, summary) = collect_with_summary(ScriptedValidator.validate(script)).await;
        assert_eq!(results.len(), 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.warnings, 1);
        assert!(!summary.is_valid);
    }
}
