use crate::cli::VerbosityLevel;
use crate::error::{AppError, TransformError};

/// Error reporter with configurable verbosity
pub struct ErrorReporter {
    verbosity: VerbosityLevel,
    show_timestamps: bool,
}

impl ErrorReporter {
    /// Create a new error reporter with specified verbosity
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_timestamps: false,
        }
    }

    pub fn with_timestamps(verbosity: VerbosityLevel, show_timestamps: bool) -> Self {
        Self {
            verbosity,
            show_timestamps,
        }
    }

    /// Print an error to stderr with detail matching the verbosity
    pub fn report(&self, error: &AppError) {
        eprintln!("{}", self.format_error(error));
    }

    pub fn format_error(&self, error: &AppError) -> String {
        match self.verbosity {
            VerbosityLevel::Quiet => self.format_error_brief(error),
            VerbosityLevel::Normal => self.format_error_normal(error),
            VerbosityLevel::Verbose => self.format_error_verbose(error),
            VerbosityLevel::Debug => self.format_error_debug(error),
        }
    }

    /// Errors that point at the tool or its environment rather than the input
    pub fn is_critical_error(&self, error: &AppError) -> bool {
        matches!(
            error,
            AppError::Config(_) | AppError::LibXml2Internal { .. } | AppError::Concurrency { .. }
        )
    }

    fn format_error_brief(&self, error: &AppError) -> String {
        match error {
            AppError::FileNotFound { path } => format!("NOT FOUND: {}", path.display()),
            _ => format!("ERROR: {}", error),
        }
    }

    fn format_error_normal(&self, error: &AppError) -> String {
        let timestamp = if self.show_timestamps {
            format!("[{}] ", chrono::Local::now().format("%H:%M:%S"))
        } else {
            String::new()
        };

        format!("{}Error: {}", timestamp, error)
    }

    fn format_error_verbose(&self, error: &AppError) -> String {
        let mut output = self.format_error_normal(error);
        if let Some(suggestion) = self.suggestion(error) {
            output.push_str("\nSuggestion: ");
            output.push_str(&suggestion);
        }
        output
    }

    fn format_error_debug(&self, error: &AppError) -> String {
        let mut output = self.format_error_verbose(error);
        output.push_str(&format!("\nDebug Info: {:?}", error));

        output.push_str("\nError Chain:");
        let mut current_error: &dyn std::error::Error = error;
        let mut level = 0;
        while let Some(source) = current_error.source() {
            output.push_str(&format!("\n  {}: {}", level + 1, source));
            current_error = source;
            level += 1;
        }

        output
    }

    fn suggestion(&self, error: &AppError) -> Option<String> {
        let hint = match error {
            AppError::FileNotFound { path } => {
                format!("Check that {} exists and is readable", path.display())
            }
            AppError::UnsupportedFileType { .. } => {
                "Rename the file with a .xml, .yml or .yaml extension".to_string()
            }
            AppError::Config(_) => {
                "Check xml2yaml.toml / xml2yaml.json and XML2YAML_* environment variables"
                    .to_string()
            }
            AppError::Yaml(_) => "Fix the YAML syntax, then run `xml2yaml yaml validate -d`".to_string(),
            AppError::Transform(TransformError::StylesheetNotFound { .. }) => {
                "Pass an existing stylesheet with --xslt".to_string()
            }
            AppError::Transform(TransformError::StylesheetParseFailed { .. }) => {
                "Check that the stylesheet is well-formed XSLT 1.0".to_string()
            }
            AppError::Transform(TransformError::XmlSyntax { .. }) => {
                "Run `xml2yaml validate` on the input to see every XML problem".to_string()
            }
            AppError::LibXml2Internal { .. } => {
                "This is an internal libxml2 failure; rerun with -v and RUST_LOG=debug".to_string()
            }
            AppError::Report { .. } => {
                "Check that the current directory is writable".to_string()
            }
            _ => return None,
        };
        Some(hint)
    }
}
