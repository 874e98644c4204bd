//! The full conversion workflow: validate XML, transform, validate YAML.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::backup;
use crate::error::TransformResult;
use crate::model::{ConversionOptions, TransformationResult};
use crate::pipeline::collect_with_summary;
use crate::transform::{Transform, XsltTransformer, transform_to_file};
use crate::xml_validator::validate_xml;
use crate::yaml_validator::validate_yaml;

pub const DEFAULT_STYLESHEET_NAME: &str = "github-actions-transform.xslt";
pub const DEFAULT_SCHEMA_NAME: &str = "github-actions-schema.xsd";

/// `file_name` beside the executable, in `folder/` or `assets/` next to it
/// or two levels up, then in `folder/` and `assets/` under the current
/// directory
fn asset_candidates(file_name: &str, folder: &str) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(exe_dir.join(file_name));
        candidates.push(exe_dir.join(folder).join(file_name));
        candidates.push(exe_dir.join("assets").join(file_name));
        candidates.push(exe_dir.join("../..").join(folder).join(file_name));
        candidates.push(exe_dir.join("../../assets").join(file_name));
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(folder).join(file_name));
        candidates.push(cwd.join("assets").join(file_name));
    }

    candidates
}

/// Where a stylesheet is looked for when none is given
pub fn default_stylesheet_candidates() -> Vec<PathBuf> {
    asset_candidates(DEFAULT_STYLESHEET_NAME, "xslt")
}

/// Where the workflow schema is looked for when none is given
pub fn default_schema_candidates() -> Vec<PathBuf> {
    asset_candidates(DEFAULT_SCHEMA_NAME, "xsd")
}

/// Runs conversions with a given transformation engine
pub struct Converter<T: Transform + ?Sized + 'static = XsltTransformer> {
    engine: Arc<T>,
    stylesheet_candidates: Vec<PathBuf>,
    schema_candidates: Vec<PathBuf>,
}

impl Converter<XsltTransformer> {
    pub fn new() -> Self {
        Self::with_engine(Arc::new(XsltTransformer::new()))
    }
}

impl Default for Converter<XsltTransformer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transform + ?Sized + 'static> Converter<T> {
    pub fn with_engine(engine: Arc<T>) -> Self {
        Self {
            engine,
            stylesheet_candidates: default_stylesheet_candidates(),
            schema_candidates: default_schema_candidates(),
        }
    }

    /// Replace the places searched for a default stylesheet
    pub fn with_stylesheet_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.stylesheet_candidates = candidates;
        self
    }

    /// Replace the places searched for a default schema
    pub fn with_schema_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.schema_candidates = candidates;
        self
    }

    pub fn default_stylesheet(&self) -> Option<PathBuf> {
        first_existing(&self.stylesheet_candidates)
    }

    pub fn default_schema(&self) -> Option<PathBuf> {
        first_existing(&self.schema_candidates)
    }

    /// Run one conversion. Never fails: problems are reported in the result.
    pub async fn convert(&self, options: &ConversionOptions) -> TransformationResult {
        let started = Instant::now();
        info!(
            input = %options.input_path.display(),
            output = %options.output_path.display(),
            "Starting conversion"
        );

        let mut result = match self.run(options).await {
            Ok(result) => result,
            Err(err) => {
                warn!("Conversion failed: {}", err);
                TransformationResult::failed(err.to_string())
            }
        };
        result.duration = started.elapsed();
        debug!(success = result.success, elapsed = ?result.duration, "Conversion finished");
        result
    }

    async fn run(&self, options: &ConversionOptions) -> TransformResult<TransformationResult> {
        if !options.input_path.is_file() {
            return Ok(TransformationResult::failed(format!(
                "Input XML file not found: {}",
                options.input_path.display()
            )));
        }

        let stylesheet = match &options.xslt_path {
            Some(path) => path.clone(),
            None => match self.default_stylesheet() {
                Some(path) => path,
                None => {
                    return Ok(TransformationResult::failed(
                        "Default XSLT transform file not found. Please specify --xslt.",
                    ));
                }
            },
        };
        if !stylesheet.is_file() {
            return Ok(TransformationResult::failed(format!(
                "XSLT transform file not found: {}",
                stylesheet.display()
            )));
        }

        let mut xml_validation = None;
        let mut xml_results = Vec::new();
        let schema = if options.skip_xml_validation {
            None
        } else {
            options
                .schema()
                .map(Path::to_path_buf)
                .or_else(|| self.default_schema())
        };
        if let Some(schema) = schema {
            debug!(schema = %schema.display(), "Validating XML before transformation");
            let (results, summary) =
                collect_with_summary(validate_xml(&options.input_path, Some(&schema))).await;
            debug!(errors = summary.errors, elapsed = ?summary.duration, "XML validation finished");

            if !summary.is_valid {
                let mut failed =
                    TransformationResult::failed("XML validation failed. Fix errors before transformation.");
                failed.xml_validation = Some(summary);
                failed.xml_results = results;
                return Ok(failed);
            }
            xml_validation = Some(summary);
            xml_results = results;
        }

        let backup = backup::handle_output_file(&options.output_path, options.force_overwrite)?;

        let output = transform_to_file(
            Arc::clone(&self.engine),
            &options.input_path,
            &stylesheet,
            &options.output_path,
        )
        .await?;

        let mut yaml_validation = None;
        let mut yaml_results = Vec::new();
        if !options.skip_yaml_validation && output.is_file() {
            let (results, summary) = collect_with_summary(validate_yaml(&output)).await;
            if !summary.is_valid {
                warn!(
                    errors = summary.errors,
                    output = %output.display(),
                    "Generated YAML has validation errors"
                );
            }
            yaml_validation = Some(summary);
            yaml_results = results;
        }

        let mut result = TransformationResult::succeeded(output);
        result.xml_validation = xml_validation;
        result.xml_results = xml_results;
        result.yaml_validation = yaml_validation;
        result.yaml_results = yaml_results;
        result.backup_path = backup;
        Ok(result)
    }
}

fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|candidate| candidate.is_file()).cloned()
}

/// Convert with the libxslt engine
pub async fn convert(options: &ConversionOptions) -> TransformationResult {
    Converter::new().convert(options).await
}
