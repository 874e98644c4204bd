//! Command handlers behind the CLI.
//!
//! Handlers print their own results and report success or failure; only
//! errors that stop a command from running at all are returned as `Err`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use futures::StreamExt;
use tracing::{debug, info};

use crate::cli::{
    Cli, Command, ConvertArgs, SchemaCommand, SchemaValidateArgs, TransformArgs, ValidateArgs,
    YamlCommand, YamlFormatArgs, YamlValidateArgs,
};
use crate::config::Config;
use crate::converter::Converter;
use crate::error::{AppError, Result};
use crate::formatter::{changed_lines, format_yaml};
use crate::model::{ConversionOptions, Severity, ValidationResult, ValidationSummary};
use crate::output::Output;
use crate::pipeline::{AsyncValidator, collect_with_summary};
use crate::report::ValidationReport;
use crate::workflow_rules::WorkflowValidator;
use crate::xml_validator::validate_xml;
use crate::yaml_validator::validate_yaml;

/// How a command finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    Failure,
}

impl CommandOutcome {
    fn from_summary(summary: &ValidationSummary) -> Self {
        if summary.is_valid {
            CommandOutcome::Success
        } else {
            CommandOutcome::Failure
        }
    }

    pub fn exit_code(self) -> u8 {
        match self {
            CommandOutcome::Success => 0,
            CommandOutcome::Failure => 1,
        }
    }
}

/// Dispatch the parsed command line
pub async fn run(cli: &Cli, config: &Config, output: &Output) -> Result<CommandOutcome> {
    debug!(command = ?cli.command, "Executing command");
    match &cli.command {
        Command::Transform(args) => handle_transform(args, config, output).await,
        Command::Validate(args) => handle_validate(args, config, output).await,
        Command::Convert(args) => handle_convert(args, config, output).await,
        Command::Schema(SchemaCommand::Validate(args)) => handle_schema_validate(args, output).await,
        Command::Yaml(YamlCommand::Validate(args)) => handle_yaml_validate(args, output).await,
        Command::Yaml(YamlCommand::Format(args)) => handle_yaml_format(args, config, output).await,
    }
}

fn emit(text: &str) {
    if !text.is_empty() {
        print!("{text}");
        if !text.ends_with('\n') {
            println!();
        }
    }
}

pub async fn handle_transform(
    args: &TransformArgs,
    config: &Config,
    output: &Output,
) -> Result<CommandOutcome> {
    let mut options = ConversionOptions::new(&args.input, &args.output)
        .skip_yaml_validation(true)
        .force_overwrite(args.force);
    if let Some(schema) = args.schema.as_ref().or(config.conversion.schema.as_ref()) {
        options = options.with_schema(schema);
    }
    if let Some(xslt) = args.xslt.as_ref().or(config.conversion.xslt.as_ref()) {
        options = options.with_stylesheet(xslt);
    }

    let result = Converter::new().convert(&options).await;
    emit(&output.format_conversion(&result, false));

    Ok(if result.success {
        CommandOutcome::Success
    } else {
        CommandOutcome::Failure
    })
}

pub async fn handle_convert(
    args: &ConvertArgs,
    config: &Config,
    output: &Output,
) -> Result<CommandOutcome> {
    let mut options = ConversionOptions::new(&args.input, &args.output)
        .skip_xml_validation(args.skip_xml_validation || config.conversion.skip_xml_validation)
        .skip_yaml_validation(args.skip_yaml_validation || config.conversion.skip_yaml_validation)
        .force_overwrite(args.force)
        .detailed_output(args.detailed);
    if let Some(schema) = args.schema.as_ref().or(config.conversion.schema.as_ref()) {
        options = options.with_schema(schema);
    }
    if let Some(xslt) = args.xslt.as_ref().or(config.conversion.xslt.as_ref()) {
        options = options.with_stylesheet(xslt);
    }

    if output.verbosity() >= crate::cli::VerbosityLevel::Verbose {
        emit(&output.note(&format!(
            "Converting {} -> {}\n  Schema: {}\n  XSLT:   {}",
            options.input_path.display(),
            options.output_path.display(),
            display_optional(options.xsd_path.as_deref()),
            display_optional(options.xslt_path.as_deref()),
        )));
    }

    let result = Converter::new().convert(&options).await;
    emit(&output.format_conversion(&result, options.detailed_output));

    Ok(if result.success {
        CommandOutcome::Success
    } else {
        CommandOutcome::Failure
    })
}

fn display_optional(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(default)".to_string())
}

pub async fn handle_validate(
    args: &ValidateArgs,
    config: &Config,
    output: &Output,
) -> Result<CommandOutcome> {
    let extension = args
        .file
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let (results, summary) = match extension.as_str() {
        "xml" => {
            if args.github_actions {
                emit(&output.warning("--github-actions applies to YAML files only; ignoring"));
            }
            let schema = args.schema.as_deref().or(config.conversion.schema.as_deref());
            collect_with_summary(validate_xml(&args.file, schema)).await
        }
        "yml" | "yaml" => validate_yaml_file(&args.file, args.github_actions).await,
        other => {
            return Err(AppError::UnsupportedFileType {
                extension: format!(".{other}"),
            });
        }
    };

    finish_validation(&args.file, results, summary, args.detailed, args.export_report, output)
}

pub async fn handle_schema_validate(
    args: &SchemaValidateArgs,
    output: &Output,
) -> Result<CommandOutcome> {
    let (results, summary) =
        collect_with_summary(validate_xml(&args.xml_file, Some(&args.schema_file))).await;
    finish_validation(&args.xml_file, results, summary, args.detailed, false, output)
}

pub async fn handle_yaml_validate(
    args: &YamlValidateArgs,
    output: &Output,
) -> Result<CommandOutcome> {
    let (results, summary) = validate_yaml_file(&args.yaml_file, args.github_actions).await;
    finish_validation(
        &args.yaml_file,
        results,
        summary,
        args.detailed,
        args.export_report,
        output,
    )
}

/// YAML syntax checks, then the workflow structure checks when asked for
/// and the syntax is clean
pub async fn validate_yaml_file(
    path: &Path,
    github_actions: bool,
) -> (Vec<ValidationResult>, ValidationSummary) {
    let started = Instant::now();
    let mut results: Vec<ValidationResult> = validate_yaml(path).collect().await;

    let syntax_clean = !results.iter().any(|r| r.severity == Severity::Error);
    if github_actions && syntax_clean {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let findings: Vec<ValidationResult> =
                    WorkflowValidator::new().validate(content).collect().await;
                results.extend(findings);
            }
            Err(e) => debug!("Skipping workflow checks: {}", e),
        }
    }

    let summary = ValidationSummary::from_results(&results, started.elapsed());
    (results, summary)
}

fn finish_validation(
    file: &Path,
    results: Vec<ValidationResult>,
    summary: ValidationSummary,
    detailed: bool,
    export_report: bool,
    output: &Output,
) -> Result<CommandOutcome> {
    emit(&output.format_validation(file, &results, &summary, detailed));

    let outcome = CommandOutcome::from_summary(&summary);
    if export_report {
        let report = ValidationReport::new(file, results, &summary);
        let path = report.export_to(&std::env::current_dir()?)?;
        if !output.is_quiet() {
            emit(&output.note(&format!("Report written to {}", path.display())));
        }
    }
    Ok(outcome)
}

pub async fn handle_yaml_format(
    args: &YamlFormatArgs,
    config: &Config,
    output: &Output,
) -> Result<CommandOutcome> {
    if !args.yaml_file.is_file() {
        return Err(AppError::FileNotFound {
            path: args.yaml_file.clone(),
        });
    }

    let indent = args.indent.unwrap_or(config.formatting.indent);
    if !(1..=8).contains(&indent) {
        return Err(AppError::Config(format!(
            "Indent must be between 1 and 8, got {indent}"
        )));
    }

    let original = tokio::fs::read_to_string(&args.yaml_file).await?;
    let formatted = format_yaml(&original, indent)?;

    if args.dry_run {
        emit(&output.format_changes(&changed_lines(&original, &formatted)));
        return Ok(CommandOutcome::Success);
    }

    let target: PathBuf = args.output.clone().unwrap_or_else(|| args.yaml_file.clone());
    tokio::fs::write(&target, formatted.as_bytes()).await?;
    info!(file = %target.display(), indent, "YAML formatted");

    if !output.is_quiet() {
        emit(&output.success("YAML file formatted successfully"));
        if target != args.yaml_file {
            emit(&output.note(&format!("Formatted file saved to: {}", target.display())));
        }
    }
    Ok(CommandOutcome::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::VerbosityLevel;
    use tempfile::TempDir;

    fn quiet() -> Output {
        Output::plain(VerbosityLevel::Quiet)
    }

    #[tokio::test]
    async fn test_validate_yaml_file_with_workflow_checks() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ci.yml");
        std::fs::write(&path, "name: CI\non: push\njobs:\n  a:\n    steps:\n      - run: echo\n").unwrap();

        let (plain, summary) = validate_yaml_file(&path, false).await;
        assert!(plain.is_empty());
        assert!(summary.is_valid);

        let (checked, summary) = validate_yaml_file(&path, true).await;
        assert_eq!(checked.len(), 1);
        assert!(checked[0].message.contains("missing 'runs-on'"));
        assert!(!summary.is_valid);
    }

    #[tokio::test]
    async fn test_workflow_checks_skipped_on_syntax_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.yml");
        std::fs::write(&path, "jobs: [unclosed\n").unwrap();

        let (results, _) = validate_yaml_file(&path, true).await;
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_validate_rejects_unknown_extension() {
        let args = ValidateArgs {
            file: PathBuf::from("workflow.txt"),
            schema: None,
            detailed: false,
            github_actions: false,
            export_report: false,
        };
        let err = handle_validate(&args, &Config::default(), &quiet())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType { extension } if extension == ".txt"));
    }

    #[tokio::test]
    async fn test_format_in_place_and_dry_run() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("messy.yml");
        std::fs::write(&path, "a:    1\nb:\n      c: 2\n").unwrap();

        let dry_run = YamlFormatArgs {
            yaml_file: path.clone(),
            output: None,
            indent: None,
            dry_run: true,
        };
        let outcome = handle_yaml_format(&dry_run, &Config::default(), &quiet()).await.unwrap();
        assert_eq!(outcome, CommandOutcome::Success);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a:    1\nb:\n      c: 2\n");

        let target = temp_dir.path().join("clean.yml");
        let write = YamlFormatArgs {
            output: Some(target.clone()),
            indent: Some(4),
            dry_run: false,
            ..dry_run
        };
        handle_yaml_format(&write, &Config::default(), &quiet()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "a: 1\nb:\n    c: 2\n");
    }

    #[tokio::test]
    async fn test_format_missing_file_and_bad_indent() {
        let temp_dir = TempDir::new().unwrap();
        let args = YamlFormatArgs {
            yaml_file: temp_dir.path().join("missing.yml"),
            output: None,
            indent: None,
            dry_run: false,
        };
        assert!(matches!(
            handle_yaml_format(&args, &Config::default(), &quiet()).await,
            Err(AppError::FileNotFound { .. })
        ));

        let path = temp_dir.path().join("ok.yml");
        std::fs::write(&path, "a: 1\n").unwrap();
        let args = YamlFormatArgs {
            yaml_file: path,
            indent: Some(12),
            ..args
        };
        assert!(matches!(
            handle_yaml_format(&args, &Config::default(), &quiet()).await,
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CommandOutcome::Success.exit_code(), 0);
        assert_eq!(CommandOutcome::Failure.exit_code(), 1);
    }
}
