//! XML syntax and XSD schema validation.
//!
//! Checks run in order: input resolution, well-formedness, schema path,
//! schema load, then schema validation. libxml2 work happens on the blocking
//! pool so the stream never stalls the runtime.

use std::path::{Path, PathBuf};

use async_stream::stream;
use tracing::debug;

use crate::error::LibXml2Error;
use crate::libxml2::{LibXml2Wrapper, SchemaVerdict, XmlSchemaPtr};
use crate::model::{IssueKind, Outcome, ValidationResult};
use crate::pipeline::{AsyncValidator, OutcomeStream, ResultStream, check_path};

/// What to validate: a file on disk or in-memory text, plus an optional schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlParams {
    pub xml_path: Option<String>,
    pub xsd_path: Option<String>,
    /// When present, validated directly and `xml_path` is ignored
    pub content: Option<String>,
}

impl XmlParams {
    pub fn from_path(xml_path: impl AsRef<Path>) -> Self {
        Self {
            xml_path: Some(path_string(xml_path.as_ref())),
            ..Self::default()
        }
    }

    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn with_schema(mut self, xsd_path: impl AsRef<Path>) -> Self {
        self.xsd_path = Some(path_string(xsd_path.as_ref()));
        self
    }

    pub fn with_optional_schema(self, xsd_path: Option<&Path>) -> Self {
        match xsd_path {
            Some(path) => self.with_schema(path),
            None => self,
        }
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Stateless XML validator
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlValidator;

impl XmlValidator {
    pub const fn new() -> Self {
        XmlValidator
    }
}

impl AsyncValidator for XmlValidator {
    type Input = XmlParams;

    fn checks(&self, input: XmlParams) -> OutcomeStream {
        Box::pin(stream! {
            let XmlParams { xml_path, xsd_path, content } = input;

            let content: Vec<u8> = match content {
                Some(content) => content.into_bytes(),
                None => {
                    let Some(xml_path) = xml_path else {
                        yield Outcome::Fail(ValidationResult::error(
                            IssueKind::Input,
                            "XML path cannot be null",
                        ));
                        return;
                    };

                    let resolved = check_path(&xml_path, "XML").await;
                    if !resolved.is_pass() {
                        yield resolved;
                        return;
                    }
                    yield Outcome::Pass;

                    // raw bytes, so libxml2 honours the declared encoding
                    match tokio::fs::read(&xml_path).await {
                        Ok(content) => content,
                        Err(e) => {
                            yield Outcome::Fail(ValidationResult::error(
                                IssueKind::Exception,
                                format!("Error reading XML file: {e}"),
                            ));
                            return;
                        }
                    }
                }
            };

            let syntax = check_syntax(content.clone()).await;
            let well_formed = syntax.is_pass();
            yield syntax;

            let Some(xsd_path) = xsd_path else {
                return;
            };

            let schema_path = check_path(&xsd_path, "XSD schema").await;
            if !schema_path.is_pass() {
                yield schema_path;
                return;
            }
            yield Outcome::Pass;

            let schema = match load_schema(PathBuf::from(&xsd_path)).await {
                Ok(schema) => {
                    yield Outcome::Pass;
                    schema
                }
                Err(failure) => {
                    yield Outcome::Fail(failure);
                    return;
                }
            };

            if well_formed {
                yield check_against_schema(content, schema).await;
            }
        })
    }
}

/// Well-formedness check
async fn check_syntax(content: Vec<u8>) -> Outcome {
    let parsed = tokio::task::spawn_blocking(move || {
        LibXml2Wrapper::new()
            .parse_document(&content)
            .map(|_| ())
    })
    .await;

    match parsed {
        Ok(Ok(())) => Outcome::Pass,
        Ok(Err(LibXml2Error::InvalidXml { line, message })) => {
            debug!(line, "XML syntax error: {}", message);
            Outcome::Fail(
                ValidationResult::error(IssueKind::Syntax, format!("XML syntax error: {message}"))
                    .with_line(line),
            )
        }
        Ok(Err(e)) => Outcome::Fail(ValidationResult::error(
            IssueKind::Exception,
            format!("Error reading XML file: {e}"),
        )),
        Err(e) => Outcome::Fail(ValidationResult::error(
            IssueKind::Exception,
            format!("Error reading XML file: {e}"),
        )),
    }
}

/// Read and compile the schema, reporting failures as `Schema` errors
async fn load_schema(xsd_path: PathBuf) -> Result<XmlSchemaPtr, ValidationResult> {
    let schema_error = |detail: String| {
        ValidationResult::error(IssueKind::Schema, format!("Error loading XSD schema: {detail}"))
    };

    let data = tokio::fs::read(&xsd_path)
        .await
        .map_err(|e| schema_error(e.to_string()))?;

    let parsed = tokio::task::spawn_blocking(move || {
        LibXml2Wrapper::new().parse_schema_from_memory(&data)
    })
    .await
    .map_err(|e| schema_error(e.to_string()))?;

    match parsed {
        Ok(schema) => Ok(schema),
        Err(LibXml2Error::SchemaParseFailed { details: Some(details) }) => {
            debug!(schema = %xsd_path.display(), "schema rejected: {}", details);
            Err(schema_error(details))
        }
        Err(LibXml2Error::SchemaParseFailed { details: None }) => Err(ValidationResult::error(
            IssueKind::Schema,
            "Failed to load XSD schema",
        )),
        Err(e) => Err(schema_error(e.to_string())),
    }
}

/// Validate the document against the schema, keeping only the first violation
async fn check_against_schema(content: Vec<u8>, schema: XmlSchemaPtr) -> Outcome {
    let verdict = tokio::task::spawn_blocking(move || {
        LibXml2Wrapper::new().validate_memory(&schema, &content)
    })
    .await;

    let verdict = match verdict {
        Ok(Ok(verdict)) => verdict,
        Ok(Err(e)) => {
            return Outcome::Fail(ValidationResult::error(
                IssueKind::Exception,
                format!("XML validation failed: {e}"),
            ));
        }
        Err(e) => {
            return Outcome::Fail(ValidationResult::error(
                IssueKind::Exception,
                format!("XML validation failed: {e}"),
            ));
        }
    };

    if let Some(violation) = verdict.first_violation() {
        debug!(line = violation.line, "schema violation: {}", violation.message);
        return Outcome::Fail(
            ValidationResult::error(IssueKind::Xsd, violation.message.clone())
                .with_line(violation.line),
        );
    }

    match verdict {
        SchemaVerdict::Valid => Outcome::Pass,
        SchemaVerdict::Invalid { error_count, .. } => Outcome::Fail(ValidationResult::error(
            IssueKind::Xsd,
            format!("XML document does not conform to the schema ({error_count} error(s))"),
        )),
        SchemaVerdict::InternalError { code, .. } => Outcome::Fail(ValidationResult::error(
            IssueKind::Exception,
            format!("XML validation failed: internal error code {code}"),
        )),
    }
}

/// Validate an XML file, optionally against an XSD schema
pub fn validate_xml(xml_path: impl AsRef<Path>, xsd_path: Option<&Path>) -> ResultStream {
    XmlValidator::new().validate(XmlParams::from_path(xml_path).with_optional_schema(xsd_path))
}

/// Validate XML text, optionally against an XSD schema
pub fn validate_xml_content(content: impl Into<String>, xsd_path: Option<&Path>) -> ResultStream {
    XmlValidator::new().validate(XmlParams::from_content(content).with_optional_schema(xsd_path))
}
