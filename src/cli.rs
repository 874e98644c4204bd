use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
    /// Show all available debugging information
    Debug,
}

/// Convert XML-described GitHub Actions workflows to YAML
#[derive(Parser, Debug, Clone)]
#[command(name = "xml2yaml")]
#[command(about = "Convert XML workflow definitions to GitHub Actions YAML with validation")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Configuration file (TOML or JSON)
    #[arg(long = "config", global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Transform XML to YAML using XSLT
    #[command(visible_alias = "t")]
    Transform(TransformArgs),

    /// Validate an XML or YAML file
    #[command(visible_alias = "v")]
    Validate(ValidateArgs),

    /// Convert XML to YAML with the full validation pipeline
    #[command(visible_alias = "c")]
    Convert(ConvertArgs),

    /// XSD schema operations
    #[command(subcommand)]
    Schema(SchemaCommand),

    /// YAML operations
    #[command(subcommand)]
    Yaml(YamlCommand),
}

#[derive(Args, Debug, Clone)]
pub struct TransformArgs {
    /// Input XML file
    pub input: PathBuf,

    /// Output YAML file
    pub output: PathBuf,

    /// XSLT stylesheet (defaults to the bundled GitHub Actions transform)
    #[arg(long = "xslt", value_name = "FILE")]
    pub xslt: Option<PathBuf>,

    /// Validate the input against this XSD first
    #[arg(long = "schema", value_name = "FILE")]
    pub schema: Option<PathBuf>,

    /// Overwrite the output without a backup
    #[arg(short = 'f', long = "force")]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// File to validate (.xml, .yml or .yaml)
    pub file: PathBuf,

    /// XSD schema for XML files
    #[arg(short = 's', long = "schema", value_name = "FILE")]
    pub schema: Option<PathBuf>,

    /// Show every issue with context
    #[arg(short = 'd', long = "detailed")]
    pub detailed: bool,

    /// Also check GitHub Actions workflow structure (YAML only)
    #[arg(long = "github-actions")]
    pub github_actions: bool,

    /// Write a JSON report to the current directory
    #[arg(short = 'e', long = "export-report")]
    pub export_report: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Input XML file
    pub input: PathBuf,

    /// Output YAML file
    pub output: PathBuf,

    /// XSD schema to validate the input against
    #[arg(long = "schema", value_name = "FILE")]
    pub schema: Option<PathBuf>,

    /// XSLT stylesheet
    #[arg(long = "xslt", value_name = "FILE")]
    pub xslt: Option<PathBuf>,

    #[arg(long = "skip-xml-validation")]
    pub skip_xml_validation: bool,

    #[arg(long = "skip-yaml-validation")]
    pub skip_yaml_validation: bool,

    /// Overwrite the output without a backup
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// Show every issue with context
    #[arg(short = 'd', long = "detailed")]
    pub detailed: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SchemaCommand {
    /// Validate an XML file against an XSD schema
    Validate(SchemaValidateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SchemaValidateArgs {
    pub xml_file: PathBuf,

    pub schema_file: PathBuf,

    #[arg(short = 'd', long = "detailed")]
    pub detailed: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum YamlCommand {
    /// Validate YAML syntax
    Validate(YamlValidateArgs),

    /// Format and normalize a YAML file
    Format(YamlFormatArgs),
}

#[derive(Args, Debug, Clone)]
pub struct YamlValidateArgs {
    pub yaml_file: PathBuf,

    #[arg(short = 'd', long = "detailed")]
    pub detailed: bool,

    /// Also check GitHub Actions workflow structure
    #[arg(long = "github-actions")]
    pub github_actions: bool,

    /// Write a JSON report to the current directory
    #[arg(short = 'e', long = "export-report")]
    pub export_report: bool,
}

#[derive(Args, Debug, Clone)]
pub struct YamlFormatArgs {
    pub yaml_file: PathBuf,

    /// Write here instead of in place
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Spaces per indentation level
    #[arg(long = "indent", value_name = "N")]
    pub indent: Option<usize>,

    /// Show what would change without writing
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_parsing() {
        let cli = Cli::try_parse_from([
            "xml2yaml",
            "convert",
            "in.xml",
            "out.yml",
            "--schema",
            "wf.xsd",
            "--skip-yaml-validation",
            "-f",
        ])
        .unwrap();

        match cli.command {
            Command::Convert(args) => {
                assert_eq!(args.input, PathBuf::from("in.xml"));
                assert_eq!(args.output, PathBuf::from("out.yml"));
                assert_eq!(args.schema, Some(PathBuf::from("wf.xsd")));
                assert!(args.skip_yaml_validation);
                assert!(!args.skip_xml_validation);
                assert!(args.force);
            }
            other => panic!("Expected convert, got {:?}", other),
        }
    }

    #[test]
    fn test_aliases_and_global_flags() {
        let cli = Cli::try_parse_from(["xml2yaml", "v", "wf.yml", "-d", "--no-color", "-v"]).unwrap();
        assert!(cli.no_color);
        assert_eq!(cli.verbosity(), VerbosityLevel::Verbose);
        assert!(matches!(cli.command, Command::Validate(ValidateArgs { detailed: true, .. })));

        let cli = Cli::try_parse_from(["xml2yaml", "-q", "t", "a.xml", "b.yml"]).unwrap();
        assert_eq!(cli.verbosity(), VerbosityLevel::Quiet);
        assert!(matches!(cli.command, Command::Transform(_)));
    }

    #[test]
    fn test_nested_subcommands() {
        let cli = Cli::try_parse_from(["xml2yaml", "schema", "validate", "a.xml", "a.xsd"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Schema(SchemaCommand::Validate(_))
        ));

        let cli = Cli::try_parse_from([
            "xml2yaml", "yaml", "format", "a.yml", "--indent", "4", "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Command::Yaml(YamlCommand::Format(args)) => {
                assert_eq!(args.indent, Some(4));
                assert!(args.dry_run);
                assert!(args.output.is_none());
            }
            other => panic!("Expected yaml format, got {:?}", other),
        }
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["xml2yaml", "-v", "-q", "v", "a.yml"]).is_err());
    }

    #[test]
    fn test_missing_arguments() {
        assert!(Cli::try_parse_from(["xml2yaml", "convert", "in.xml"]).is_err());
        assert!(Cli::try_parse_from(["xml2yaml"]).is_err());
    }
}
