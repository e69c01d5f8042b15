use async_trait::async_trait;
use locus_config::GenericConfiguration;

use super::{credentials_from_configuration, default_options_source, fetch_services, resolve_account_id, Fetcher};
use crate::{
    credentials::{BoxedCredentialProvider, InstanceIdentityProvider},
    error::{FetchError, GenericError},
    host::{HostDescriptor, SubstrateKind},
    model::{AccountId, ServicesData},
    options::BoxedOptionsSource,
};

/// Fetcher for EC2 virtual machines.
///
/// The account is read from the instance identity document served by the instance metadata service.
#[derive(Clone)]
pub struct Ec2Fetcher {
    credentials: BoxedCredentialProvider,
    options: BoxedOptionsSource,
}

impl Ec2Fetcher {
    /// Creates a new `Ec2Fetcher` with the given credential provider and options source.
    pub fn new(credentials: BoxedCredentialProvider, options: BoxedOptionsSource) -> Self {
        Self { credentials, options }
    }

    /// Creates a new `Ec2Fetcher` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the instance metadata client cannot be configured, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        let credentials = credentials_from_configuration(config, SubstrateKind::Ec2, || {
            Ok(BoxedCredentialProvider::from_provider(
                InstanceIdentityProvider::from_configuration(config)?,
            ))
        })?;

        Ok(Self::new(credentials, default_options_source()))
    }
}

#[async_trait]
impl Fetcher for Ec2Fetcher {
    fn substrate(&self) -> SubstrateKind {
        SubstrateKind::Ec2
    }

    async fn get_account_id(&self) -> Result<AccountId, FetchError> {
        resolve_account_id(&self.credentials, SubstrateKind::Ec2).await
    }

    async fn fetch(&self, host: &HostDescriptor, account_id: &AccountId) -> Result<ServicesData, FetchError> {
        fetch_services(&self.options, host, account_id).await
    }
}
