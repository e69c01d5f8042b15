use locus_config::GenericConfiguration;
use locus_env::error::{generic_error, GenericError};
use serde::Deserialize;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter, Layer as _,
};

/// Logs a message to standard error and exits the process with a non-zero exit code.
pub fn fatal_and_exit(message: String) -> ! {
    eprintln!("FATAL: {}", message);
    std::process::exit(1);
}

fn default_log_level() -> LogLevel {
    LevelFilter::INFO.into()
}

/// Logging configuration.
///
/// Read from the top-level `log_level` and `log_format_json` settings, which can be set through `LOCUS_LOG_LEVEL` and
/// `LOCUS_LOG_FORMAT_JSON`.
#[derive(Deserialize)]
pub struct LoggingConfiguration {
    #[serde(default = "default_log_level")]
    log_level: LogLevel,

    #[serde(default)]
    log_format_json: bool,
}

impl LoggingConfiguration {
    /// Creates a new `LoggingConfiguration` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the log level is not a valid filter directive, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        Ok(config.as_typed()?)
    }
}

#[derive(Deserialize)]
#[serde(try_from = "String")]
struct LogLevel(EnvFilter);

impl From<LevelFilter> for LogLevel {
    fn from(level: LevelFilter) -> Self {
        Self(EnvFilter::default().add_directive(level.into()))
    }
}

impl TryFrom<String> for LogLevel {
    type Error = GenericError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            return Err(generic_error!("Log level cannot be empty."));
        }

        EnvFilter::builder()
            .parse(value.trim())
            .map(Self)
            .map_err(|e| generic_error!("Failed to parse valid log level: {}", e))
    }
}

/// Initializes the logging subsystem for `tracing`.
///
/// Logs go to standard error, leaving standard output for discovery results.
///
/// # Errors
///
/// If the logging subsystem was already initialized, an error is returned.
pub fn initialize_logging(config: &LoggingConfiguration) -> Result<(), GenericError> {
    let filter = config.log_level.0.to_string();

    let layer = if config.log_format_json {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer().with_target(true).with_writer(std::io::stderr).boxed()
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(EnvFilter::new(filter)))
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use locus_config::ConfigurationLoader;
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults() {
        let config = ConfigurationLoader::default().into_generic();
        let logging_config = LoggingConfiguration::from_configuration(&config).unwrap();

        assert!(!logging_config.log_format_json);
        assert!(logging_config.log_level.0.to_string().contains("info"));
    }

    #[test]
    fn directives() {
        let config = ConfigurationLoader::default()
            .from_values(json!({ "log_level": "locus_env=debug,warn", "log_format_json": true }))
            .unwrap()
            .into_generic();
        let logging_config = LoggingConfiguration::from_configuration(&config).unwrap();

        assert!(logging_config.log_format_json);
        assert!(logging_config.log_level.0.to_string().contains("locus_env=debug"));
    }

    #[test]
    fn empty_log_level() {
        let config = ConfigurationLoader::default()
            .from_values(json!({ "log_level": " " }))
            .unwrap()
            .into_generic();

        assert!(LoggingConfiguration::from_configuration(&config).is_err());
    }
}
