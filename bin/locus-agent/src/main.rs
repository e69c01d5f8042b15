//! Service discovery agent.
//!
//! Detects the substrate the host runs on, then periodically resolves the host's cloud account and service inventory,
//! writing the result as JSON for the registry uploader to pick up.

#![deny(warnings)]
#![deny(missing_docs)]

use clap::Parser as _;
use tracing::{error, info};

mod cli;
use self::cli::{detect::handle_detect_command, run::handle_once_command, run::handle_run_command, Action, Cli};

mod config;
use self::config::load_configuration;

mod logging;
use self::logging::{fatal_and_exit, initialize_logging, LoggingConfiguration};

mod output;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let configuration = match load_configuration(cli.config_file.as_deref()) {
        Ok(configuration) => configuration,
        Err(e) => fatal_and_exit(format!("failed to load configuration: {:#}", e)),
    };

    let logging_config = match LoggingConfiguration::from_configuration(&configuration) {
        Ok(logging_config) => logging_config,
        Err(e) => fatal_and_exit(format!("invalid logging configuration: {:#}", e)),
    };
    if let Err(e) = initialize_logging(&logging_config) {
        fatal_and_exit(format!("failed to initialize logging: {:#}", e));
    }

    let result = match cli.action.unwrap_or_default() {
        Action::Run => handle_run_command(&configuration).await,
        Action::Once => handle_once_command(&configuration).await,
        Action::Detect => handle_detect_command(&configuration),
    };

    match result {
        Ok(()) => info!("Locus agent stopped."),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}
