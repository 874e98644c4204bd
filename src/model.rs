//! Validation results, summaries and conversion descriptors.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Severity of a validation finding, ordered from least to most serious
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        };
        f.write_str(name)
    }
}

/// Category tag of a validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    Input,
    File,
    Syntax,
    Schema,
    #[serde(rename = "XSD")]
    Xsd,
    Exception,
    Workflow,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::Input => "Input",
            IssueKind::File => "File",
            IssueKind::Syntax => "Syntax",
            IssueKind::Schema => "Schema",
            IssueKind::Xsd => "XSD",
            IssueKind::Exception => "Exception",
            IssueKind::Workflow => "Workflow",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation finding.
///
/// Validators only ever produce these for problems; a check that passes
/// produces [`Outcome::Pass`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    /// 1-based line of the finding, 0 when unknown
    pub line_number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ValidationResult {
    pub fn new(kind: IssueKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            line_number: 0,
            context: None,
        }
    }

    pub fn error(kind: IssueKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Error, message)
    }

    pub fn warning(kind: IssueKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Warning, message)
    }

    pub fn info(kind: IssueKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Info, message)
    }

    pub fn with_line(mut self, line_number: u64) -> Self {
        self.line_number = line_number;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] Line {}: {}",
            self.severity, self.line_number, self.message
        )
    }
}

/// Result of one executed check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail(ValidationResult),
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Pass)
    }

    pub fn into_failure(self) -> Option<ValidationResult> {
        match self {
            Outcome::Pass => None,
            Outcome::Fail(result) => Some(result),
        }
    }
}

impl From<Option<ValidationResult>> for Outcome {
    fn from(result: Option<ValidationResult>) -> Self {
        match result {
            Some(result) => Outcome::Fail(result),
            None => Outcome::Pass,
        }
    }
}

impl From<ValidationResult> for Outcome {
    fn from(result: ValidationResult) -> Self {
        Outcome::Fail(result)
    }
}

/// Aggregate counts over a set of findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_issues: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
    pub is_valid: bool,
    pub duration: Duration,
}

impl ValidationSummary {
    pub fn from_results(results: &[ValidationResult], duration: Duration) -> Self {
        let count = |severity: Severity| results.iter().filter(|r| r.severity == severity).count();
        let errors = count(Severity::Error);

        Self {
            total_issues: results.len(),
            errors,
            warnings: count(Severity::Warning),
            info: count(Severity::Info),
            is_valid: errors == 0,
            duration,
        }
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings > 0
    }
}

impl Default for ValidationSummary {
    fn default() -> Self {
        Self::from_results(&[], Duration::ZERO)
    }
}

/// Everything a single conversion run needs to know
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOptions {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub xsd_path: Option<PathBuf>,
    pub xslt_path: Option<PathBuf>,
    pub skip_xml_validation: bool,
    pub skip_yaml_validation: bool,
    pub force_overwrite: bool,
    pub detailed_output: bool,
}

impl ConversionOptions {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            xsd_path: None,
            xslt_path: None,
            skip_xml_validation: false,
            skip_yaml_validation: false,
            force_overwrite: false,
            detailed_output: false,
        }
    }

    pub fn with_schema(mut self, xsd_path: impl Into<PathBuf>) -> Self {
        self.xsd_path = Some(xsd_path.into());
        self
    }

    pub fn with_stylesheet(mut self, xslt_path: impl Into<PathBuf>) -> Self {
        self.xslt_path = Some(xslt_path.into());
        self
    }

    pub fn skip_xml_validation(mut self, skip: bool) -> Self {
        self.skip_xml_validation = skip;
        self
    }

    pub fn skip_yaml_validation(mut self, skip: bool) -> Self {
        self.skip_yaml_validation = skip;
        self
    }

    pub fn force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    pub fn detailed_output(mut self, detailed: bool) -> Self {
        self.detailed_output = detailed;
        self
    }

    /// Schema to validate the input against, ignoring blank paths
    pub fn schema(&self) -> Option<&Path> {
        self.xsd_path
            .as_deref()
            .filter(|path| !path.to_string_lossy().trim().is_empty())
    }
}

/// Outcome of a complete conversion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformationResult {
    pub success: bool,
    pub output_path: Option<PathBuf>,
    pub xml_validation: Option<ValidationSummary>,
    pub yaml_validation: Option<ValidationSummary>,
    pub xml_results: Vec<ValidationResult>,
    pub yaml_results: Vec<ValidationResult>,
    pub backup_path: Option<PathBuf>,
    pub error_message: Option<String>,
    pub duration: Duration,
}

impl TransformationResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output_path: None,
            xml_validation: None,
            yaml_validation: None,
            xml_results: Vec::new(),
            yaml_results: Vec::new(),
            backup_path: None,
            error_message: Some(message.into()),
            duration: Duration::ZERO,
        }
    }

    pub fn succeeded(output_path: impl Into<PathBuf>) -> Self {
        Self {
            success: true,
            output_path: Some(output_path.into()),
            error_message: None,
            ..Self::failed(String::new())
        }
    }

    /// True when the output YAML carried at least one error
    pub fn has_yaml_errors(&self) -> bool {
        self.yaml_validation
            .as_ref()
            .is_some_and(|summary| !summary.is_valid)
    }
}
