//! Console rendering for validation and conversion results.
//!
//! Every formatter returns a `String`; commands decide where it goes.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::cli::VerbosityLevel;
use crate::formatter::LineChange;
use crate::model::{IssueKind, Severity, TransformationResult, ValidationResult, ValidationSummary};

const GREEN: &str = "32";
const RED: &str = "31";
const YELLOW: &str = "33";
const BLUE: &str = "34";
const CYAN: &str = "36";
const DIM: &str = "2";

/// Human-readable output formatter
pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel, no_color: bool) -> Self {
        Self {
            verbosity,
            show_colors: !no_color && atty::is(atty::Stream::Stdout),
        }
    }

    /// Formatter that never emits escape codes
    pub fn plain(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: false,
        }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    pub fn is_quiet(&self) -> bool {
        self.verbosity == VerbosityLevel::Quiet
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn severity_color(severity: Severity) -> &'static str {
        match severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
            Severity::Info => CYAN,
        }
    }

    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {message}"), GREEN)
    }

    pub fn failure(&self, message: &str) -> String {
        self.colorize(&format!("✗ {message}"), RED)
    }

    pub fn note(&self, message: &str) -> String {
        self.colorize(message, BLUE)
    }

    pub fn warning(&self, message: &str) -> String {
        self.colorize(message, YELLOW)
    }

    /// One finding, with its context line when `detailed`
    pub fn format_issue(&self, result: &ValidationResult, detailed: bool) -> String {
        let label = self.colorize(
            &format!("[{}]", result.severity),
            Self::severity_color(result.severity),
        );
        let mut line = if result.line_number > 0 {
            format!("  {label} Line {}: {}", result.line_number, result.message)
        } else {
            format!("  {label} {}", result.message)
        };

        if detailed {
            if let Some(context) = &result.context {
                line.push('\n');
                line.push_str(&self.colorize(&format!("      | {context}"), DIM));
            }
        }
        line
    }

    /// Findings grouped by kind, each group ordered by line
    pub fn format_issues(&self, results: &[ValidationResult], detailed: bool) -> String {
        let mut groups: BTreeMap<IssueKind, Vec<&ValidationResult>> = BTreeMap::new();
        for result in results {
            if self.is_quiet() && result.severity != Severity::Error {
                continue;
            }
            groups.entry(result.kind).or_default().push(result);
        }

        let mut output = String::new();
        for (kind, mut issues) in groups {
            issues.sort_by_key(|issue| issue.line_number);
            if !self.is_quiet() {
                output.push_str(&format!("{} ({}):\n", self.colorize(kind.as_str(), YELLOW), issues.len()));
            }
            for issue in issues {
                output.push_str(&self.format_issue(issue, detailed));
                output.push('\n');
            }
        }
        output
    }

    pub fn format_summary(&self, title: &str, summary: &ValidationSummary) -> String {
        if self.is_quiet() {
            return if summary.is_valid {
                String::new()
            } else {
                format!("{title}: {} error(s)\n", summary.errors)
            };
        }

        let status = if summary.is_valid {
            self.colorize("✓ Valid", GREEN)
        } else {
            self.colorize("✗ Invalid", RED)
        };

        let mut output = format!("{title}: {status}\n");
        output.push_str(&format!("  Total issues: {}\n", summary.total_issues));
        if summary.total_issues > 0 {
            output.push_str(&format!(
                "  {} {}  {} {}  {} {}\n",
                self.colorize("Errors:", RED),
                summary.errors,
                self.colorize("Warnings:", YELLOW),
                summary.warnings,
                self.colorize("Info:", CYAN),
                summary.info
            ));
        }
        if self.verbosity >= VerbosityLevel::Verbose {
            output.push_str(&format!("  Duration: {}\n", format_duration(summary.duration)));
        }
        output
    }

    /// Summary followed by the issues behind it
    pub fn format_validation(
        &self,
        file: &Path,
        results: &[ValidationResult],
        summary: &ValidationSummary,
        detailed: bool,
    ) -> String {
        let title = format!("Validation of {}", file.display());
        let mut output = self.format_summary(&title, summary);
        let issues = self.format_issues(results, detailed || self.verbosity >= VerbosityLevel::Verbose);
        if !issues.is_empty() {
            if !self.is_quiet() {
                output.push('\n');
            }
            output.push_str(&issues);
        }
        output
    }

    pub fn format_conversion(&self, result: &TransformationResult, detailed: bool) -> String {
        let mut output = String::new();

        if result.success {
            if !self.is_quiet() {
                output.push_str(&self.success("Conversion completed successfully"));
                output.push('\n');
                if let Some(path) = &result.output_path {
                    output.push_str(&format!("  Output file: {}\n", path.display()));
                }
                if let Some(backup) = &result.backup_path {
                    output.push_str(&format!("  Backup of previous output: {}\n", backup.display()));
                }
                output.push_str(&format!("  Duration: {}\n", format_duration(result.duration)));
            }
        } else {
            output.push_str(&self.failure("Conversion failed"));
            output.push('\n');
            if let Some(message) = &result.error_message {
                output.push_str(&format!("  Error: {message}\n"));
            }
        }

        for (title, summary, results) in [
            ("XML validation", &result.xml_validation, &result.xml_results),
            ("YAML validation", &result.yaml_validation, &result.yaml_results),
        ] {
            if let Some(summary) = summary {
                let section = self.format_summary(title, summary);
                if !section.is_empty() {
                    output.push('\n');
                    output.push_str(&section);
                }
                output.push_str(&self.format_issues(results, detailed));
            }
        }

        output
    }

    /// Dry-run diff for `yaml format`
    pub fn format_changes(&self, changes: &[LineChange]) -> String {
        if changes.is_empty() {
            return self.success("No changes needed, file is already formatted") + "\n";
        }

        let mut output = self.warning(&format!(
            "File would be changed ({} line{})",
            changes.len(),
            if changes.len() == 1 { "" } else { "s" }
        ));
        output.push('\n');

        if self.verbosity >= VerbosityLevel::Verbose {
            output.push_str(&self.colorize("--- original\n+++ formatted\n", DIM));
            for change in changes {
                if !change.original.is_empty() {
                    output.push_str(&self.colorize(&format!("{:>4} - {}", change.line, change.original), RED));
                    output.push('\n');
                }
                if !change.formatted.is_empty() {
                    output.push_str(&self.colorize(&format!("{:>4} + {}", change.line, change.formatted), GREEN));
                    output.push('\n');
                }
            }
        }
        output
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
