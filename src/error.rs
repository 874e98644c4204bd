use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Main application error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LibXML2 internal error: {details}")]
    LibXml2Internal { details: String },

    #[error("Transformation failed: {0}")]
    Transform(#[from] TransformError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Report export failed: {details}")]
    Report { details: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported file type: {extension}. Supported types: .xml, .yml, .yaml")]
    UnsupportedFileType { extension: String },

    #[error("Concurrent operation error: {details}")]
    Concurrency { details: String },
}

/// LibXML2 / LibXSLT specific error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibXml2Error {
    #[error("Schema parsing failed{}", detail_suffix(.details))]
    SchemaParseFailed { details: Option<String> },

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("Document validation failed with internal code {code}")]
    ValidationFailed { code: i32 },

    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,

    #[error("{message} (line {line})")]
    InvalidXml { line: u64, message: String },

    #[error("Input too large for libxml2: {size} bytes")]
    InputTooLarge { size: usize },

    #[error("Stylesheet could not be parsed: {path}{}", detail_suffix(.details))]
    StylesheetParseFailed { path: PathBuf, details: Option<String> },

    #[error("Stylesheet application failed: {details}")]
    TransformFailed { details: String },
}

fn detail_suffix(details: &Option<String>) -> String {
    details
        .as_ref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

/// Errors the transformation step propagates to its caller
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("XML syntax error: {message} (line {line})")]
    XmlSyntax { line: u64, message: String },

    #[error("XSLT transform file not found: {path}")]
    StylesheetNotFound { path: PathBuf },

    #[error("Invalid XSLT stylesheet: {path}{}", detail_suffix(.details))]
    StylesheetParseFailed { path: PathBuf, details: Option<String> },

    #[error("XSLT transformation failed: {details}")]
    TransformFailed { details: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LibXML2 error: {0}")]
    Engine(LibXml2Error),

    #[error("Transformation task failed: {details}")]
    Task { details: String },
}

impl From<LibXml2Error> for TransformError {
    fn from(err: LibXml2Error) -> Self {
        match err {
            LibXml2Error::InvalidXml { line, message } => TransformError::XmlSyntax { line, message },
            LibXml2Error::StylesheetParseFailed { path, details } => {
                TransformError::StylesheetParseFailed { path, details }
            }
            LibXml2Error::TransformFailed { details } => TransformError::TransformFailed { details },
            other => TransformError::Engine(other),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<LibXml2Error> for AppError {
    fn from(err: LibXml2Error) -> Self {
        AppError::LibXml2Internal {
            details: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Report {
            details: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Concurrency {
            details: err.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;

/// Transformation result type alias
pub type TransformResult<T> = std::result::Result<T, TransformError>;
