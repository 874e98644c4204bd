use std::process::ExitCode;

use anyhow::Context;
use tracing::debug;

use xml2yaml::cli::Cli;
use xml2yaml::commands::{self, CommandOutcome};
use xml2yaml::config::ConfigManager;
use xml2yaml::error::AppError;
use xml2yaml::error_reporter::ErrorReporter;
use xml2yaml::logging::init_logging;
use xml2yaml::output::Output;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    let reporter = ErrorReporter::new(cli.verbosity());

    match run(&cli).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(error) => {
            match error.downcast_ref::<AppError>() {
                Some(app_error) => reporter.report(app_error),
                None => eprintln!("Error: {error:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<CommandOutcome> {
    let config = ConfigManager::load_config(cli)
        .await
        .map_err(AppError::from)
        .context("Failed to load configuration")?;
    init_logging(&config)?;
    debug!(?config, "Configuration loaded");

    let output = Output::new(cli.verbosity(), config.output.no_color);
    Ok(commands::run(cli, &config, &output).await?)
}
