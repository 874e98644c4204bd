//! YAML syntax validation.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_stream::stream;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::model::{IssueKind, Outcome, ValidationResult};
use crate::pipeline::{AsyncValidator, OutcomeStream, ResultStream, check_file_exists};

/// Where the YAML comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YamlSource {
    File(PathBuf),
    Content(String),
}

impl YamlSource {
    fn label(&self) -> &'static str {
        match self {
            YamlSource::File(_) => "file",
            YamlSource::Content(_) => "content",
        }
    }
}

/// Stateless YAML validator
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlValidator;

impl YamlValidator {
    pub const fn new() -> Self {
        YamlValidator
    }
}

impl AsyncValidator for YamlValidator {
    type Input = YamlSource;

    fn checks(&self, input: YamlSource) -> OutcomeStream {
        Box::pin(stream! {
            let label = input.label();
            let content = match input {
                YamlSource::Content(content) => content,
                YamlSource::File(path) => {
                    let exists = check_file_exists(&path, "YAML").await;
                    if !exists.is_pass() {
                        yield exists;
                        return;
                    }
                    yield Outcome::Pass;

                    match tokio::fs::read_to_string(&path).await {
                        Ok(content) => content,
                        Err(e) => {
                            yield Outcome::Fail(ValidationResult::error(
                                IssueKind::Exception,
                                format!("Error reading YAML file: {e}"),
                            ));
                            return;
                        }
                    }
                }
            };

            tokio::task::yield_now().await;
            yield check_syntax(&content, label);
        })
    }
}

/// Parse every document in `content`, reporting the first failure
fn check_syntax(content: &str, label: &str) -> Outcome {
    if content.trim().is_empty() {
        return Outcome::Fail(ValidationResult::error(
            IssueKind::Syntax,
            format!("YAML {label} is empty"),
        ));
    }

    for document in serde_yaml::Deserializer::from_str(content) {
        if let Err(e) = serde_yaml::Value::deserialize(document) {
            return Outcome::Fail(describe_error(&e, content));
        }
    }
    Outcome::Pass
}

fn describe_error(error: &serde_yaml::Error, content: &str) -> ValidationResult {
    let Some(location) = error.location() else {
        return ValidationResult::error(
            IssueKind::Exception,
            format!("Error reading YAML content: {error}"),
        );
    };

    let line = location.line() as u64;
    let column = location.column() as u64;
    debug!(line, column, "YAML syntax error: {}", error);

    let result = ValidationResult::error(
        IssueKind::Syntax,
        format!(
            "YAML syntax error: {} {}",
            strip_marks(&error.to_string()),
            describe_position(line, column)
        ),
    )
    .with_line(line);

    match context_line(content, line) {
        Some(text) => result.with_context(text),
        None => result,
    }
}

/// `(Line L, Column C)`
pub fn describe_position(line: u64, column: u64) -> String {
    format!("(Line {line}, Column {column})")
}

static MARK_REGEX: OnceLock<Regex> = OnceLock::new();

/// Drop the ` at line L column C` marks serde_yaml appends to its messages
fn strip_marks(message: &str) -> String {
    let marks = MARK_REGEX.get_or_init(|| {
        Regex::new(r" at line \d+ column \d+").expect("mark pattern is a valid regex")
    });
    marks.replace_all(message, "").trim().to_string()
}

/// The text of 1-based `line`, without its line terminator
pub fn context_line(content: &str, line: u64) -> Option<String> {
    let index = usize::try_from(line).ok()?.checked_sub(1)?;
    content
        .split('\n')
        .nth(index)
        .map(|text| text.replace('\r', ""))
}

/// Validate a YAML file
pub fn validate_yaml(path: impl AsRef<Path>) -> ResultStream {
    YamlValidator::new().validate(YamlSource::File(path.as_ref().to_path_buf()))
}

/// Validate YAML text
pub fn validate_yaml_content(content: impl Into<String>) -> ResultStream {
    YamlValidator::new().validate(YamlSource::Content(content.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;
    use futures::StreamExt;
    use tempfile::TempDir;

    async fn collect(stream: ResultStream) -> Vec<ValidationResult> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_valid_content() {
        let yaml = "name: CI\non:\n  push:\n    branches: [main]\njobs:\n  build:\n    runs-on: ubuntu-latest\n";
        assert!(collect(validate_yaml_content(yaml)).await.is_empty());
    }

    #[tokio::test]
    async fn test_multi_document_content_is_valid() {
        let yaml = "a: 1\n---\nb: 2\n";
        assert!(collect(validate_yaml_content(yaml)).await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_content() {
        let results = collect(validate_yaml_content("")).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].kind, IssueKind::Syntax);
        assert_eq!(results[0].severity, Severity::Error);
        assert_eq!(results[0].message, "YAML content is empty");

        let results = collect(validate_yaml_content("  \n\t\n")).await;
        assert_eq!(results[0].message, "YAML content is empty");
    }

    #[tokio::test]
    async fn test_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.yml");
        std::fs::write(&path, "").unwrap();

        let results = collect(validate_yaml(&path)).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].message, "YAML file is empty");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let results = collect(validate_yaml("/nonexistent/workflow.yml")).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].kind, IssueKind::File);
        assert_eq!(results[0].message, "YAML file not found");
    }

    #[tokio::test]
    async fn test_syntax_error_carries_position_and_context() {
        let yaml = "name: CI\njobs:\n  build: [unclosed\n";
        let results = collect(validate_yaml_content(yaml)).await;

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.kind, IssueKind::Syntax);
        assert!(result.message.starts_with("YAML syntax error: "));
        assert!(result.message.contains("(Line "));
        assert!(result.line_number >= 3);
        assert!(result.context.is_some());
    }

    #[tokio::test]
    async fn test_bad_indentation_is_reported() {
        let yaml = "jobs:\n  build:\n    runs-on: ubuntu-latest\n   steps: []\n";
        let results = collect(validate_yaml_content(yaml)).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].kind, IssueKind::Syntax);
        assert_eq!(results[0].line_number, 4);
        assert_eq!(results[0].context.as_deref(), Some("   steps: []"));
    }

    #[tokio::test]
    async fn test_valid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ok.yaml");
        std::fs::write(&path, "key: value\nlist:\n  - a\n  - b\n").unwrap();

        assert!(collect(validate_yaml(&path)).await.is_empty());
    }

    #[test]
    fn test_context_line() {
        let content = "first\r\nsecond\nthird";
        assert_eq!(context_line(content, 1).as_deref(), Some("first"));
        assert_eq!(context_line(content, 3).as_deref(), Some("third"));
        assert_eq!(context_line(content, 0), None);
        assert_eq!(context_line(content, 9), None);
    }

    #[test]
    fn test_describe_position() {
        assert_eq!(describe_position(3, 5), "(Line 3, Column 5)");
    }

    #[test]
    fn test_strip_marks() {
        assert_eq!(
            strip_marks("did not find expected ',' or ']' at line 4 column 1, while parsing a flow sequence at line 3 column 10"),
            "did not find expected ',' or ']', while parsing a flow sequence"
        );
        assert_eq!(strip_marks("unexpected end of stream"), "unexpected end of stream");
    }

    #[tokio::test]
    async fn test_syntax_error_states_position_once() {
        let yaml = "jobs:\n  build:\n    runs-on: ubuntu-latest\n   steps: []\n";
        let results = collect(validate_yaml_content(yaml)).await;
        assert_eq!(results.len(), 1);

        let message = &results[0].message;
        assert!(!message.contains(" at line "), "{message}");
        assert_eq!(message.matches("(Line ").count(), 1, "{message}");
        let position = format!("(Line {}, Column ", results[0].line_number);
        assert!(message.contains(&position) && message.ends_with(')'), "{message}");
    }
}
