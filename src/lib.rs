//! # xml2yaml
//!
//! Converts XML descriptions of GitHub Actions workflows into workflow YAML.
//! Input XML is checked for well-formedness and optionally against an XSD,
//! transformed with an XSLT stylesheet, cleaned up, and the resulting YAML
//! is checked for syntax and workflow structure.

pub mod backup;
pub mod cli;
pub mod commands;
pub mod config;
pub mod converter;
pub mod error;
pub mod error_reporter;
pub mod formatter;
pub mod libxml2;
pub mod libxslt;
pub mod logging;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod transform;
pub mod workflow_rules;
pub mod xml_validator;
pub mod yaml_validator;

pub use cli::{Cli, VerbosityLevel};
pub use config::{Config, ConfigManager};
pub use converter::{Converter, convert};
pub use error::{AppError, LibXml2Error, TransformError};
pub use formatter::{LineChange, changed_lines, format_yaml};
pub use model::{
    ConversionOptions, IssueKind, Outcome, Severity, TransformationResult, ValidationResult,
    ValidationSummary,
};
pub use output::Output;
pub use pipeline::{AsyncValidator, OutcomeStream, ResultStream, collect_with_summary};
pub use report::ValidationReport;
pub use transform::{Transform, XsltTransformer, clean_yaml_output, transform, transform_content};
pub use workflow_rules::{WorkflowValidator, validate_workflow_content};
pub use xml_validator::{validate_xml, validate_xml_content};
pub use yaml_validator::{validate_yaml, validate_yaml_content};
