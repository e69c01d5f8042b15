//! Fetchers.
//!
//! A fetcher answers two questions for one compute substrate: which account the host runs in, and which services are
//! deployed on it. Every substrate obtains the account from a different credential source, but all of them read the
//! service inventory from the identity agent's configuration, scoped to the resolved account.
use std::sync::Arc;

use async_trait::async_trait;
use locus_config::GenericConfiguration;
use tracing::debug;

use crate::{
    credentials::{BoxedCredentialProvider, CredentialProvider as _, FixedCredentialProvider},
    error::{FetchError, GenericError},
    host::{HostDescriptor, SubstrateKind},
    model::{AccountId, ServicesData},
    options::{to_services_data, BoxedOptionsSource, OptionsSource as _, SiaConfigFile},
};

mod ec2;
pub use self::ec2::Ec2Fetcher;

mod ecs;
pub use self::ecs::EcsFetcher;

mod eks;
pub use self::eks::EksFetcher;

mod gce;
pub use self::gce::GceFetcher;

/// Resolves the account and service inventory of a host running on a specific substrate.
///
/// Fetchers hold only configuration captured at construction, and never retry: the caller decides whether a failure is
/// worth retrying, based on [`FetchError::is_retryable`].
#[async_trait]
pub trait Fetcher {
    /// Returns the substrate this fetcher serves.
    fn substrate(&self) -> SubstrateKind;

    /// Resolves the account the host runs in.
    ///
    /// Does not depend on a prior call to [`fetch`][Self::fetch].
    ///
    /// # Errors
    ///
    /// If the credential source is temporarily unavailable, `FetchError::CredentialUnavailable` is returned. If the
    /// credential source can never yield an account identifier, `FetchError::ConfigurationInvalid` is returned.
    async fn get_account_id(&self) -> Result<AccountId, FetchError>;

    /// Fetches the service inventory of the host, scoped to `account_id`.
    ///
    /// Returns equal inventories for equal inputs as long as the underlying configuration does not change.
    ///
    /// # Errors
    ///
    /// If the identity agent configuration cannot be loaded, `FetchError::ConfigurationInvalid` is returned. If it
    /// cannot be resolved for `account_id`, `FetchError::OptionsResolutionFailed` is returned.
    async fn fetch(&self, host: &HostDescriptor, account_id: &AccountId) -> Result<ServicesData, FetchError>;
}

/// A boxed fetcher.
///
/// Cheap to clone, and safe to share between concurrent discovery cycles.
#[derive(Clone)]
pub struct BoxedFetcher {
    inner: Arc<dyn Fetcher + Send + Sync>,
}

impl BoxedFetcher {
    /// Creates a new `BoxedFetcher` from the given fetcher.
    pub fn from_fetcher<F>(fetcher: F) -> Self
    where
        F: Fetcher + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(fetcher),
        }
    }
}

#[async_trait]
impl Fetcher for BoxedFetcher {
    fn substrate(&self) -> SubstrateKind {
        self.inner.substrate()
    }

    async fn get_account_id(&self) -> Result<AccountId, FetchError> {
        self.inner.get_account_id().await
    }

    async fn fetch(&self, host: &HostDescriptor, account_id: &AccountId) -> Result<ServicesData, FetchError> {
        self.inner.fetch(host, account_id).await
    }
}

/// Builds the credential provider for a substrate.
///
/// An account identifier configured under `discovery.account_id` takes precedence over the substrate's native credential
/// source, which is then never constructed.
fn credentials_from_configuration<F>(
    config: &GenericConfiguration, substrate: SubstrateKind, native: F,
) -> Result<BoxedCredentialProvider, GenericError>
where
    F: FnOnce() -> Result<BoxedCredentialProvider, GenericError>,
{
    if config.try_get_typed::<serde_json::Value>("discovery.account_id")?.is_some() {
        debug!(%substrate, "Using fixed account identifier from configuration.");
        return Ok(BoxedCredentialProvider::from_provider(
            FixedCredentialProvider::from_configuration(config)?,
        ));
    }

    native()
}

fn default_options_source() -> BoxedOptionsSource {
    BoxedOptionsSource::from_source(SiaConfigFile)
}

async fn resolve_account_id(
    credentials: &BoxedCredentialProvider, substrate: SubstrateKind,
) -> Result<AccountId, FetchError> {
    let identity = credentials.caller_identity().await?;
    debug!(
        %substrate,
        provider = credentials.name(),
        account_id = %identity.account(),
        principal = identity.principal(),
        "Resolved account identifier."
    );

    Ok(identity.into_account())
}

async fn fetch_services(
    options: &BoxedOptionsSource, host: &HostDescriptor, account_id: &AccountId,
) -> Result<ServicesData, FetchError> {
    let options = options.load(host.config_path(), account_id).await?;
    let data = to_services_data(&options, account_id)?;
    debug!(
        substrate = %host.substrate(),
        account_id = %account_id,
        domain = data.domain(),
        services = data.services().len(),
        "Fetched service inventory."
    );

    Ok(data)
}
