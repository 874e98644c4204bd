use crate::cli::Cli;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const ENV_PREFIX: &str = "XML2YAML_";

pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub conversion: ConversionConfig,
    pub output: OutputConfig,
    pub formatting: FormattingConfig,
    pub logging: LoggingConfig,
}

/// Defaults for the conversion pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ConversionConfig {
    /// XSD used when a command does not name one
    pub schema: Option<PathBuf>,
    /// Stylesheet used when a command does not name one
    pub xslt: Option<PathBuf>,
    pub skip_xml_validation: bool,
    pub skip_yaml_validation: bool,
}

/// Console output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub verbose: bool,
    /// Quiet mode (errors only)
    pub quiet: bool,
    pub no_color: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormattingConfig {
    /// Spaces per indentation level for `yaml format`
    pub indent: usize,
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::Environment(format!(
                "Invalid {ENV_PREFIX}LOG_FORMAT value: {value}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl Config {
    /// Log level after applying the verbose and quiet switches
    pub fn effective_log_level(&self) -> &str {
        if self.output.verbose {
            "debug"
        } else if self.output.quiet {
            "error"
        } else {
            &self.logging.level
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides(config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => match toml::from_str::<Config>(&content) {
                Ok(config) => Ok(config),
                Err(_) => Ok(serde_json::from_str(&content)?),
            },
        }
    }

    fn config_names() -> [&'static str; 4] {
        [
            "xml2yaml.toml",
            "xml2yaml.json",
            ".xml2yaml.toml",
            ".xml2yaml.json",
        ]
    }

    /// Find a configuration file in the current directory, then in the
    /// user config directory
    pub async fn find_config_file() -> Result<Option<Config>> {
        for name in Self::config_names() {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("xml2yaml");
            for name in Self::config_names() {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(schema) = env.get("XML2YAML_SCHEMA") {
            config.conversion.schema = Some(PathBuf::from(schema));
        }
        if let Some(xslt) = env.get("XML2YAML_XSLT") {
            config.conversion.xslt = Some(PathBuf::from(xslt));
        }
        if let Some(skip) = parse_env(env, "SKIP_XML_VALIDATION")? {
            config.conversion.skip_xml_validation = skip;
        }
        if let Some(skip) = parse_env(env, "SKIP_YAML_VALIDATION")? {
            config.conversion.skip_yaml_validation = skip;
        }

        if let Some(no_color) = parse_env(env, "NO_COLOR")? {
            config.output.no_color = no_color;
        }
        if let Some(verbose) = parse_env(env, "VERBOSE")? {
            config.output.verbose = verbose;
        }
        if let Some(quiet) = parse_env(env, "QUIET")? {
            config.output.quiet = quiet;
        }

        if let Some(indent) = parse_env(env, "INDENT")? {
            config.formatting.indent = indent;
        }

        if let Some(level) = env.get("XML2YAML_LOG_LEVEL") {
            config.logging.level = level.to_lowercase();
        }
        if let Some(format) = env.get("XML2YAML_LOG_FORMAT") {
            config.logging.format = format.parse()?;
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }
        if cli.no_color {
            config.output.no_color = true;
        }
        config
    }

    /// Merge two configurations (second takes precedence for set values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        if override_config.conversion.schema.is_some() {
            base.conversion.schema = override_config.conversion.schema;
        }
        if override_config.conversion.xslt.is_some() {
            base.conversion.xslt = override_config.conversion.xslt;
        }
        base.conversion.skip_xml_validation = override_config.conversion.skip_xml_validation;
        base.conversion.skip_yaml_validation = override_config.conversion.skip_yaml_validation;

        base.output = override_config.output;
        base.formatting = override_config.formatting;
        base.logging = override_config.logging;

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        if !(1..=8).contains(&config.formatting.indent) {
            return Err(ConfigError::Validation(format!(
                "Indent must be between 1 and 8, got {}",
                config.formatting.indent
            )));
        }

        if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Unknown log level '{}', expected one of: {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

fn parse_env<T: FromStr>(env: &impl EnvProvider, name: &str) -> Result<Option<T>> {
    let key = format!("{ENV_PREFIX}{name}");
    env.get(&key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Environment(format!("Invalid {key} value: {value}")))
        })
        .transpose()
}
