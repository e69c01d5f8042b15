use async_trait::async_trait;
use locus_config::GenericConfiguration;

use super::{credentials_from_configuration, default_options_source, fetch_services, resolve_account_id, Fetcher};
use crate::{
    credentials::{BoxedCredentialProvider, TaskMetadataProvider},
    error::{FetchError, GenericError},
    host::{HostDescriptor, SubstrateKind},
    model::{AccountId, ServicesData},
    options::BoxedOptionsSource,
};

/// Fetcher for ECS tasks, including those running on Fargate.
///
/// The account is taken from the task ARN reported by the task metadata endpoint.
#[derive(Clone)]
pub struct EcsFetcher {
    credentials: BoxedCredentialProvider,
    options: BoxedOptionsSource,
}

impl EcsFetcher {
    /// Creates a new `EcsFetcher` with the given credential provider and options source.
    pub fn new(credentials: BoxedCredentialProvider, options: BoxedOptionsSource) -> Self {
        Self { credentials, options }
    }

    /// Creates a new `EcsFetcher` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the task metadata client cannot be configured, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        let credentials = credentials_from_configuration(config, SubstrateKind::Ecs, || {
            Ok(BoxedCredentialProvider::from_provider(
                TaskMetadataProvider::from_configuration(config)?,
            ))
        })?;

        Ok(Self::new(credentials, default_options_source()))
    }
}

#[async_trait]
impl Fetcher for EcsFetcher {
    fn substrate(&self) -> SubstrateKind {
        SubstrateKind::Ecs
    }

    async fn get_account_id(&self) -> Result<AccountId, FetchError> {
        resolve_account_id(&self.credentials, SubstrateKind::Ecs).await
    }

    async fn fetch(&self, host: &HostDescriptor, account_id: &AccountId) -> Result<ServicesData, FetchError> {
        fetch_services(&self.options, host, account_id).await
    }
}
