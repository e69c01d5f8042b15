use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use locus_config::{ConfigurationLoader, GenericConfiguration};
use locus_env::error::{generic_error, GenericError};

const DEFAULT_CONFIG_PATH: &str = "/etc/locus/locus.yaml";
const ENVIRONMENT_PREFIX: &str = "LOCUS";
const DEFAULT_DISCOVERY_INTERVAL: Duration = Duration::from_secs(3600);

/// Loads the agent configuration.
///
/// An explicitly given configuration file must exist and be valid, while the default one is optional. Environment
/// variables prefixed with `LOCUS_` override file values.
pub fn load_configuration(config_file: Option<&Path>) -> Result<GenericConfiguration, GenericError> {
    let loader = match config_file {
        Some(path) => ConfigurationLoader::default().from_yaml(path)?,
        None => ConfigurationLoader::default().try_from_yaml(DEFAULT_CONFIG_PATH),
    };

    Ok(loader.from_environment(ENVIRONMENT_PREFIX)?.into_generic())
}

/// Agent-level configuration.
#[derive(Clone, Debug)]
pub struct AgentConfiguration {
    interval: Duration,
    output_path: Option<PathBuf>,
}

impl AgentConfiguration {
    /// Creates a new `AgentConfiguration` from the given configuration.
    ///
    /// # Errors
    ///
    /// If a setting has the wrong type, or the discovery interval is zero, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        let interval = config
            .try_get_typed::<u64>("discovery.interval_secs")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_DISCOVERY_INTERVAL);
        if interval.is_zero() {
            return Err(generic_error!("`discovery.interval_secs` must be greater than zero."));
        }

        Ok(Self {
            interval,
            output_path: config.try_get_typed::<PathBuf>("output_path")?,
        })
    }

    /// Returns the time between discovery cycles.
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the file discovery results are written to, if any.
    ///
    /// When unset, results are written to standard output.
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use serde_json::json;

    use super::*;

    #[test]
    fn defaults() {
        let config = ConfigurationLoader::default().into_generic();
        let agent_config = AgentConfiguration::from_configuration(&config).unwrap();

        assert_eq!(agent_config.interval(), Duration::from_secs(3600));
        assert!(agent_config.output_path().is_none());
    }

    #[test]
    fn overrides() {
        let config = ConfigurationLoader::default()
            .from_values(json!({ "discovery": { "interval_secs": 60 }, "output_path": "/var/run/locus/services.json" }))
            .unwrap()
            .into_generic();
        let agent_config = AgentConfiguration::from_configuration(&config).unwrap();

        assert_eq!(agent_config.interval(), Duration::from_secs(60));
        assert_eq!(
            agent_config.output_path(),
            Some(Path::new("/var/run/locus/services.json"))
        );
    }

    #[test]
    fn zero_interval() {
        let config = ConfigurationLoader::default()
            .from_values(json!({ "discovery": { "interval_secs": 0 } }))
            .unwrap()
            .into_generic();

        assert!(AgentConfiguration::from_configuration(&config).is_err());
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_configuration(Some(&dir.path().join("missing.yaml"))).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"substrate: gce\n").unwrap();
        let config = load_configuration(Some(file.path())).unwrap();
        assert_eq!(config.get_typed::<String>("substrate").unwrap(), "gce");
    }
}
