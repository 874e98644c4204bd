//! GitHub Actions structure checks for generated workflows.
//!
//! These run on YAML that already parses; unparseable input passes here and
//! is left to the YAML validator. Findings carry the dotted path of the
//! offending node as their context.

use std::sync::OnceLock;

use async_stream::stream;
use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::model::{IssueKind, Outcome, ValidationResult};
use crate::pipeline::{AsyncValidator, OutcomeStream, ResultStream};

pub const REQUIRED_TOP_LEVEL: &[&str] = &["name", "on"];

pub const OPTIONAL_TOP_LEVEL: &[&str] = &[
    "env",
    "defaults",
    "concurrency",
    "jobs",
    "permissions",
    "run-name",
];

pub const JOB_PROPERTIES: &[&str] = &[
    "runs-on",
    "steps",
    "needs",
    "if",
    "name",
    "permissions",
    "environment",
    "concurrency",
    "outputs",
    "env",
    "defaults",
    "timeout-minutes",
    "strategy",
    "continue-on-error",
    "container",
    "services",
    // reusable workflow calls
    "uses",
    "with",
    "secrets",
];

pub const STEP_PROPERTIES: &[&str] = &[
    "name",
    "id",
    "if",
    "run",
    "uses",
    "with",
    "env",
    "continue-on-error",
    "timeout-minutes",
    "shell",
    "working-directory",
];

pub const TRIGGER_EVENTS: &[&str] = &[
    "push",
    "pull_request",
    "pull_request_target",
    "workflow_dispatch",
    "workflow_call",
    "schedule",
    "repository_dispatch",
    "release",
    "issues",
    "issue_comment",
    "watch",
    "fork",
    "create",
    "delete",
    "deployment",
    "deployment_status",
    "page_build",
    "public",
    "status",
    "gollum",
    "member",
    "membership",
    "project",
    "project_card",
    "project_column",
    "milestone",
    "label",
    "discussion",
    "discussion_comment",
    "check_run",
    "check_suite",
];

pub const RUNNER_LABELS: &[&str] = &[
    "ubuntu-latest",
    "ubuntu-20.04",
    "ubuntu-18.04",
    "ubuntu-22.04",
    "windows-latest",
    "windows-2022",
    "windows-2019",
    "macos-latest",
    "macos-12",
    "macos-11",
    "self-hosted",
];

pub const SHELLS: &[&str] = &["bash", "pwsh", "powershell", "cmd", "sh", "python"];

static SECRETS_REGEX: OnceLock<Regex> = OnceLock::new();

fn secrets_regex() -> &'static Regex {
    SECRETS_REGEX.get_or_init(|| {
        Regex::new(r"\bsecrets\.").expect("secrets pattern is a valid regex")
    })
}

fn is_expression(text: &str) -> bool {
    text.contains("${{")
}

fn key_name(key: &Value) -> Option<&str> {
    key.as_str()
}

fn finding(result: ValidationResult, path: impl Into<String>) -> ValidationResult {
    result.with_context(path)
}

type Rule = fn(&Mapping) -> Vec<ValidationResult>;

/// Structural checks for GitHub Actions workflows
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowValidator;

impl WorkflowValidator {
    pub const fn new() -> Self {
        WorkflowValidator
    }
}

impl AsyncValidator for WorkflowValidator {
    type Input = String;

    fn checks(&self, content: String) -> OutcomeStream {
        Box::pin(stream! {
            let root = match serde_yaml::from_str::<Value>(&content) {
                Ok(Value::Mapping(root)) => root,
                Ok(_) => {
                    yield Outcome::Fail(ValidationResult::error(
                        IssueKind::Workflow,
                        "Workflow document must be a mapping",
                    ));
                    return;
                }
                Err(_) => {
                    yield Outcome::Pass;
                    return;
                }
            };

            let rules: [Rule; 3] = [check_top_level, check_triggers, check_jobs];
            for rule in rules {
                let findings = rule(&root);
                if findings.is_empty() {
                    yield Outcome::Pass;
                }
                for found in findings {
                    yield Outcome::Fail(found);
                }
                tokio::task::yield_now().await;
            }
        })
    }
}

fn check_top_level(root: &Mapping) -> Vec<ValidationResult> {
    let mut findings = Vec::new();

    for required in REQUIRED_TOP_LEVEL {
        if !root.contains_key(*required) {
            findings.push(finding(
                ValidationResult::error(
                    IssueKind::Workflow,
                    format!("Missing required top-level key '{required}'"),
                ),
                *required,
            ));
        }
    }

    for key in root.keys() {
        match key_name(key) {
            Some(name) if REQUIRED_TOP_LEVEL.contains(&name) || OPTIONAL_TOP_LEVEL.contains(&name) => {}
            Some(name) => findings.push(finding(
                ValidationResult::warning(
                    IssueKind::Workflow,
                    format!("Unknown top-level key '{name}'"),
                ),
                name,
            )),
            None => findings.push(ValidationResult::warning(
                IssueKind::Workflow,
                format!("Top-level key {key:?} is not a string"),
            )),
        }
    }

    if !root.contains_key("jobs") {
        findings.push(finding(
            ValidationResult::warning(IssueKind::Workflow, "Workflow defines no jobs"),
            "jobs",
        ));
    }

    findings
}

fn check_triggers(root: &Mapping) -> Vec<ValidationResult> {
    let Some(on) = root.get("on") else {
        return Vec::new();
    };

    let events: Vec<&str> = match on {
        Value::String(event) => vec![event.as_str()],
        Value::Sequence(events) => events.iter().filter_map(Value::as_str).collect(),
        Value::Mapping(events) => events.keys().filter_map(key_name).collect(),
        _ => {
            return vec![finding(
                ValidationResult::error(
                    IssueKind::Workflow,
                    "'on' must name at least one trigger event",
                ),
                "on",
            )];
        }
    };

    if events.is_empty() {
        return vec![finding(
            ValidationResult::error(
                IssueKind::Workflow,
                "'on' must name at least one trigger event",
            ),
            "on",
        )];
    }

    events
        .into_iter()
        .filter(|event| !TRIGGER_EVENTS.contains(event))
        .map(|event| {
            finding(
                ValidationResult::warning(
                    IssueKind::Workflow,
                    format!("Unknown trigger event '{event}'"),
                ),
                format!("on.{event}"),
            )
        })
        .collect()
}

fn check_jobs(root: &Mapping) -> Vec<ValidationResult> {
    let jobs = match root.get("jobs") {
        None => return Vec::new(),
        Some(Value::Mapping(jobs)) => jobs,
        Some(_) => {
            return vec![finding(
                ValidationResult::error(IssueKind::Workflow, "'jobs' must be a mapping"),
                "jobs",
            )];
        }
    };

    let mut findings = Vec::new();
    for (id, job) in jobs {
        let id = key_name(id).unwrap_or("?");
        let path = format!("jobs.{id}");

        let Value::Mapping(job) = job else {
            findings.push(finding(
                ValidationResult::error(IssueKind::Workflow, format!("Job '{id}' must be a mapping")),
                path,
            ));
            continue;
        };

        for key in job.keys().filter_map(key_name) {
            if !JOB_PROPERTIES.contains(&key) {
                findings.push(finding(
                    ValidationResult::warning(
                        IssueKind::Workflow,
                        format!("Unknown property '{key}' in job '{id}'"),
                    ),
                    format!("{path}.{key}"),
                ));
            }
        }

        match job.get("runs-on") {
            Some(runs_on) => findings.extend(check_runner(id, runs_on, &path)),
            None if job.contains_key("uses") => {}
            None => findings.push(finding(
                ValidationResult::error(
                    IssueKind::Workflow,
                    format!("Job '{id}' is missing 'runs-on'"),
                ),
                path.clone(),
            )),
        }

        match job.get("steps") {
            None => {}
            Some(Value::Sequence(steps)) => {
                for (index, step) in steps.iter().enumerate() {
                    findings.extend(check_step(id, index, step, &path));
                }
            }
            Some(_) => findings.push(finding(
                ValidationResult::error(
                    IssueKind::Workflow,
                    format!("'steps' in job '{id}' must be a list"),
                ),
                format!("{path}.steps"),
            )),
        }
    }
    findings
}

fn check_runner(id: &str, runs_on: &Value, job_path: &str) -> Vec<ValidationResult> {
    let labels: Vec<&str> = match runs_on {
        Value::String(label) => vec![label.as_str()],
        Value::Sequence(labels) => labels.iter().filter_map(Value::as_str).collect(),
        // runner groups and other forms are not checked
        _ => Vec::new(),
    };

    labels
        .into_iter()
        .filter(|label| !RUNNER_LABELS.contains(label) && !is_expression(label))
        .map(|label| {
            finding(
                ValidationResult::info(
                    IssueKind::Workflow,
                    format!("Unrecognized runner label '{label}' in job '{id}'"),
                ),
                format!("{job_path}.runs-on"),
            )
        })
        .collect()
}

fn check_step(id: &str, index: usize, step: &Value, job_path: &str) -> Vec<ValidationResult> {
    let path = format!("{job_path}.steps[{index}]");

    let Value::Mapping(step) = step else {
        return vec![finding(
            ValidationResult::error(
                IssueKind::Workflow,
                format!("Step {} in job '{id}' must be a mapping", index + 1),
            ),
            path,
        )];
    };

    let label = match step.get("name").and_then(Value::as_str) {
        Some(name) => format!("'{name}'"),
        None => format!("{}", index + 1),
    };
    let mut findings = Vec::new();

    match (step.contains_key("uses"), step.contains_key("run")) {
        (true, true) => findings.push(finding(
            ValidationResult::error(
                IssueKind::Workflow,
                format!("Step {label} in job '{id}' cannot have both 'uses' and 'run'"),
            ),
            path.clone(),
        )),
        (false, false) => findings.push(finding(
            ValidationResult::error(
                IssueKind::Workflow,
                format!("Step {label} in job '{id}' must have either 'uses' or 'run'"),
            ),
            path.clone(),
        )),
        _ => {}
    }

    for key in step.keys().filter_map(key_name) {
        if !STEP_PROPERTIES.contains(&key) {
            findings.push(finding(
                ValidationResult::warning(
                    IssueKind::Workflow,
                    format!("Unknown property '{key}' in step {label} of job '{id}'"),
                ),
                format!("{path}.{key}"),
            ));
        }
    }

    if let Some(shell) = step.get("shell").and_then(Value::as_str) {
        if !SHELLS.contains(&shell) && !is_expression(shell) {
            findings.push(finding(
                ValidationResult::warning(
                    IssueKind::Workflow,
                    format!("Unknown shell '{shell}' in step {label} of job '{id}'"),
                ),
                format!("{path}.shell"),
            ));
        }
    }

    if let Some(script) = step.get("run").and_then(Value::as_str) {
        if secrets_regex().is_match(script) {
            findings.push(finding(
                ValidationResult::info(
                    IssueKind::Workflow,
                    format!(
                        "Step {label} in job '{id}' references secrets directly in its run script; prefer passing them through 'env'"
                    ),
                ),
                format!("{path}.run"),
            ));
        }
    }

    findings
}

/// Check generated YAML text against GitHub Actions workflow structure
pub fn validate_workflow_content(content: impl Into<String>) -> ResultStream {
    WorkflowValidator::new().validate(content.into())
}
