//! Host descriptor.
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::error::{generic_error, GenericError};

/// Default path of the identity agent's configuration file.
pub const DEFAULT_SIA_CONFIG_PATH: &str = "/etc/sia/sia_config";

/// A compute substrate.
///
/// Each substrate obtains account identity and service inventory from a different authoritative source, and so has its
/// own [`Fetcher`][crate::fetcher::Fetcher] implementation.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubstrateKind {
    /// An EC2 virtual machine.
    Ec2,

    /// A node in a managed Kubernetes (EKS) cluster.
    Eks,

    /// A serverless container running under ECS (including Fargate).
    Ecs,

    /// A Google Compute Engine virtual machine.
    Gce,
}

impl SubstrateKind {
    /// All supported substrates.
    pub const ALL: [SubstrateKind; 4] = [Self::Ec2, Self::Eks, Self::Ecs, Self::Gce];

    /// Returns the canonical name of the substrate.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ec2 => "ec2",
            Self::Eks => "eks",
            Self::Ecs => "ecs",
            Self::Gce => "gce",
        }
    }
}

impl fmt::Display for SubstrateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubstrateKind {
    type Err = GenericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| generic_error!("Unknown substrate '{}'. Expected one of: ec2, eks, ecs, gce.", s))
    }
}

/// Describes the local host.
///
/// Created once at start-up by environment detection, and read-only thereafter.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct HostDescriptor {
    substrate: SubstrateKind,
    config_path: PathBuf,
    cluster_hint: Option<String>,
}

impl HostDescriptor {
    /// Creates a new `HostDescriptor` for the given substrate, reading identity agent configuration from `config_path`.
    pub fn new<P>(substrate: SubstrateKind, config_path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            substrate,
            config_path: config_path.into(),
            cluster_hint: None,
        }
    }

    /// Sets the cluster name hint.
    pub fn with_cluster_hint<S>(mut self, cluster_hint: Option<S>) -> Self
    where
        S: Into<String>,
    {
        self.cluster_hint = cluster_hint
            .map(|hint| -> String { hint.into() })
            .filter(|hint| !hint.is_empty());
        self
    }

    /// Returns the substrate the host runs on.
    pub const fn substrate(&self) -> SubstrateKind {
        self.substrate
    }

    /// Returns the path to the identity agent's configuration file.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Returns the cluster name hint, if any.
    pub fn cluster_hint(&self) -> Option<&str> {
        self.cluster_hint.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substrate_names() {
        for kind in SubstrateKind::ALL {
            assert_eq!(kind.as_str().parse::<SubstrateKind>().unwrap(), kind);
        }

        assert_eq!(" EKS ".parse::<SubstrateKind>().unwrap(), SubstrateKind::Eks);
        assert!("lambda".parse::<SubstrateKind>().is_err());
    }

    #[test]
    fn substrate_serde_uses_lowercase() {
        assert_eq!(serde_json::to_string(&SubstrateKind::Ecs).unwrap(), "\"ecs\"");
        assert_eq!(
            serde_json::from_str::<SubstrateKind>("\"gce\"").unwrap(),
            SubstrateKind::Gce
        );
    }

    #[test]
    fn empty_cluster_hint_is_dropped() {
        let host = HostDescriptor::new(SubstrateKind::Eks, "/etc/sia/sia_config").with_cluster_hint(Some(""));
        assert_eq!(host.cluster_hint(), None);

        let host = host.with_cluster_hint(Some("prod-east"));
        assert_eq!(host.cluster_hint(), Some("prod-east"));
    }
}
