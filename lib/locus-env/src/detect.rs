//! Environment detection.
//!
//! Determines which substrate the process runs on, and builds the [`HostDescriptor`] every discovery cycle starts from.
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use locus_config::GenericConfiguration;
use tracing::{debug, info};

use crate::{
    error::{generic_error, GenericError},
    host::{HostDescriptor, SubstrateKind, DEFAULT_SIA_CONFIG_PATH},
};

const DEFAULT_DMI_PATH: &str = "/sys/class/dmi/id";

/// Detects the substrate of the local host.
///
/// Detection looks at, in order of precedence:
///
/// - the `substrate` configuration setting, which is authoritative when present
/// - the ECS task metadata environment variable (`ECS_CONTAINER_METADATA_URI_V4`)
/// - the Kubernetes service environment variable (`KUBERNETES_SERVICE_HOST`)
/// - the DMI product name, for Google Compute Engine
/// - the DMI system and board vendors, for EC2
#[derive(Clone, Debug)]
pub struct EnvironmentDetector {
    env: HashMap<String, String>,
    dmi_path: PathBuf,
}

impl EnvironmentDetector {
    /// Creates a new `EnvironmentDetector` over the environment of the current process.
    ///
    /// The process environment is captured once, here.
    pub fn from_process() -> Self {
        Self::new(std::env::vars(), DEFAULT_DMI_PATH)
    }

    /// Creates a new `EnvironmentDetector` over the given environment variables and DMI directory.
    pub fn new<I, K, V, P>(env: I, dmi_path: P) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            env: env.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            dmi_path: dmi_path.into(),
        }
    }

    /// Detects the local host.
    ///
    /// # Errors
    ///
    /// If the configured substrate is invalid, or no substrate can be detected, an error is returned.
    pub fn detect(&self, config: &GenericConfiguration) -> Result<HostDescriptor, GenericError> {
        let substrate = self.detect_substrate(config)?;
        let config_path = config
            .try_get_typed::<PathBuf>("sia_config_path")?
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SIA_CONFIG_PATH));

        let cluster_hint = match substrate {
            SubstrateKind::Eks => config
                .try_get_typed::<String>("cluster_name")?
                .or_else(|| self.env_var("CLUSTER_NAME").map(str::to_string)),
            _ => None,
        };

        let host = HostDescriptor::new(substrate, config_path).with_cluster_hint(cluster_hint);
        info!(
            substrate = %host.substrate(),
            config_path = %host.config_path().display(),
            cluster = host.cluster_hint(),
            "Detected host environment."
        );

        Ok(host)
    }

    /// Detects the substrate of the local host.
    ///
    /// # Errors
    ///
    /// If the configured substrate is invalid, or no substrate can be detected, an error is returned.
    pub fn detect_substrate(&self, config: &GenericConfiguration) -> Result<SubstrateKind, GenericError> {
        if let Some(substrate) = config.try_get_typed::<String>("substrate")? {
            let substrate = substrate.parse::<SubstrateKind>()?;
            debug!(%substrate, "Using substrate from configuration.");
            return Ok(substrate);
        }

        if self.env_var("ECS_CONTAINER_METADATA_URI_V4").is_some() {
            debug!("Found ECS task metadata endpoint in environment.");
            return Ok(SubstrateKind::Ecs);
        }

        if self.env_var("KUBERNETES_SERVICE_HOST").is_some() {
            debug!("Found Kubernetes service host in environment.");
            return Ok(SubstrateKind::Eks);
        }

        if dmi_contains(&self.dmi_path, &["product_name"], "Google") {
            debug!("Found Google product name in DMI data.");
            return Ok(SubstrateKind::Gce);
        }

        if dmi_contains(&self.dmi_path, &["sys_vendor", "board_vendor"], "Amazon") {
            debug!("Found Amazon vendor in DMI data.");
            return Ok(SubstrateKind::Ec2);
        }

        Err(generic_error!(
            "Unable to detect the substrate of this host. Set `substrate` to one of: ec2, eks, ecs, gce."
        ))
    }

    fn env_var(&self, name: &str) -> Option<&str> {
        self.env
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

fn dmi_contains(dmi_path: &Path, files: &[&str], needle: &str) -> bool {
    files.iter().any(|file| {
        let path = dmi_path.join(file);
        match std::fs::read_to_string(&path) {
            Ok(value) => value.contains(needle),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Unable to read DMI data.");
                false
            }
        }
    })
}
