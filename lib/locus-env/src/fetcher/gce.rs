use async_trait::async_trait;
use locus_config::GenericConfiguration;

use super::{credentials_from_configuration, default_options_source, fetch_services, resolve_account_id, Fetcher};
use crate::{
    credentials::{BoxedCredentialProvider, GceMetadataProvider},
    error::{FetchError, GenericError},
    host::{HostDescriptor, SubstrateKind},
    model::{AccountId, ServicesData},
    options::BoxedOptionsSource,
};

/// Fetcher for Google Compute Engine virtual machines.
///
/// The project identifier served by the metadata server stands in for the account.
#[derive(Clone)]
pub struct GceFetcher {
    credentials: BoxedCredentialProvider,
    options: BoxedOptionsSource,
}

impl GceFetcher {
    /// Creates a new `GceFetcher` with the given credential provider and options source.
    pub fn new(credentials: BoxedCredentialProvider, options: BoxedOptionsSource) -> Self {
        Self { credentials, options }
    }

    /// Creates a new `GceFetcher` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the metadata server client cannot be configured, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        let credentials = credentials_from_configuration(config, SubstrateKind::Gce, || {
            Ok(BoxedCredentialProvider::from_provider(
                GceMetadataProvider::from_configuration(config)?,
            ))
        })?;

        Ok(Self::new(credentials, default_options_source()))
    }
}

#[async_trait]
impl Fetcher for GceFetcher {
    fn substrate(&self) -> SubstrateKind {
        SubstrateKind::Gce
    }

    async fn get_account_id(&self) -> Result<AccountId, FetchError> {
        resolve_account_id(&self.credentials, SubstrateKind::Gce).await
    }

    async fn fetch(&self, host: &HostDescriptor, account_id: &AccountId) -> Result<ServicesData, FetchError> {
        fetch_services(&self.options, host, account_id).await
    }
}
