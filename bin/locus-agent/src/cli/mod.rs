use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod detect;
pub mod run;

/// Service discovery agent.
#[derive(Parser)]
#[command(name = "locus-agent", version, about)]
pub struct Cli {
    /// Path to the configuration file.
    ///
    /// When not given, `/etc/locus/locus.yaml` is used if it exists.
    #[arg(short = 'c', long = "config")]
    pub config_file: Option<PathBuf>,

    /// Subcommand to run. Defaults to `run`.
    #[command(subcommand)]
    pub action: Option<Action>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Subcommand)]
pub enum Action {
    /// Runs discovery periodically until interrupted.
    #[default]
    Run,

    /// Runs a single discovery cycle and exits.
    Once,

    /// Prints the detected host environment and exits.
    Detect,
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;

    use super::*;

    #[test]
    fn default_action() {
        let cli = Cli::try_parse_from(["locus-agent"]).unwrap();
        assert_eq!(cli.action.unwrap_or_default(), Action::Run);
        assert!(cli.config_file.is_none());
    }

    #[test]
    fn config_file_and_subcommand() {
        let cli = Cli::try_parse_from(["locus-agent", "-c", "/tmp/locus.yaml", "once"]).unwrap();
        assert_eq!(cli.action, Some(Action::Once));
        assert_eq!(cli.config_file, Some(PathBuf::from("/tmp/locus.yaml")));

        let cli = Cli::try_parse_from(["locus-agent", "detect", "--config", "/tmp/locus.yaml"]).unwrap();
        assert_eq!(cli.action, Some(Action::Detect));
    }

    #[test]
    fn unknown_subcommand() {
        assert!(Cli::try_parse_from(["locus-agent", "upload"]).is_err());
    }
}
