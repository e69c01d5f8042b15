use async_trait::async_trait;
use locus_config::GenericConfiguration;
use tracing::debug;

use super::{credentials_from_configuration, default_options_source, fetch_services, resolve_account_id, Fetcher};
use crate::{
    credentials::{
        BoxedCredentialProvider, ChainedCredentialProvider, ContainerCredentialsProvider, InstanceProfileProvider,
        WebIdentityProvider,
    },
    error::{FetchError, GenericError},
    host::{HostDescriptor, SubstrateKind},
    model::{AccountId, ServicesData},
    options::BoxedOptionsSource,
};

/// Fetcher for nodes of an EKS cluster.
///
/// The account is extracted from the caller identity obtained through the ambient credential chain: the pod's web
/// identity token is exchanged first (IAM roles for service accounts), then the container credentials endpoint is
/// queried (Pod Identity), falling back to the node's instance profile.
#[derive(Clone)]
pub struct EksFetcher {
    credentials: BoxedCredentialProvider,
    options: BoxedOptionsSource,
}

impl EksFetcher {
    /// Creates a new `EksFetcher` with the given credential provider and options source.
    pub fn new(credentials: BoxedCredentialProvider, options: BoxedOptionsSource) -> Self {
        Self { credentials, options }
    }

    /// Creates a new `EksFetcher` from the given configuration.
    ///
    /// # Errors
    ///
    /// If any client of the credential chain cannot be configured, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        let credentials = credentials_from_configuration(config, SubstrateKind::Eks, || {
            let chain = ChainedCredentialProvider::new(vec![
                BoxedCredentialProvider::from_provider(WebIdentityProvider::from_configuration(config)?),
                BoxedCredentialProvider::from_provider(ContainerCredentialsProvider::from_configuration(config)?),
                BoxedCredentialProvider::from_provider(InstanceProfileProvider::from_configuration(config)?),
            ]);
            Ok(BoxedCredentialProvider::from_provider(chain))
        })?;

        Ok(Self::new(credentials, default_options_source()))
    }
}

#[async_trait]
impl Fetcher for EksFetcher {
    fn substrate(&self) -> SubstrateKind {
        SubstrateKind::Eks
    }

    async fn get_account_id(&self) -> Result<AccountId, FetchError> {
        resolve_account_id(&self.credentials, SubstrateKind::Eks).await
    }

    async fn fetch(&self, host: &HostDescriptor, account_id: &AccountId) -> Result<ServicesData, FetchError> {
        if let Some(cluster) = host.cluster_hint() {
            debug!(cluster, account_id = %account_id, "Fetching service inventory for cluster node.");
        }

        fetch_services(&self.options, host, account_id).await
    }
}
