//! Credential resolution.
//!
//! A credential provider obtains the identity of the caller from an ambient credential source (a metadata endpoint, a
//! token exchange, static configuration) and reports the account that identity belongs to. Providers are stateless
//! apart from their configuration, and never retry: retry policy belongs to the dispatcher.
use std::sync::Arc;

use async_trait::async_trait;
use snafu::Snafu;

use crate::{
    error::{FetchError, GenericError},
    model::AccountId,
};

mod chained;
pub use self::chained::ChainedCredentialProvider;

mod container;
pub use self::container::ContainerCredentialsProvider;

mod fixed;
pub use self::fixed::FixedCredentialProvider;

mod gce_metadata;
pub use self::gce_metadata::GceMetadataProvider;

mod instance_identity;
pub use self::instance_identity::InstanceIdentityProvider;

mod instance_profile;
pub use self::instance_profile::InstanceProfileProvider;

mod task_metadata;
pub use self::task_metadata::TaskMetadataProvider;

mod web_identity;
pub use self::web_identity::WebIdentityProvider;

/// The identity of the caller, as asserted by a credential source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CallerIdentity {
    account: AccountId,
    principal: Option<String>,
}

impl CallerIdentity {
    /// Creates a new `CallerIdentity` for the given account.
    pub fn new(account: AccountId) -> Self {
        Self { account, principal: None }
    }

    /// Sets the principal the caller authenticated as, such as a role ARN or a service account email.
    pub fn with_principal<S>(mut self, principal: S) -> Self
    where
        S: Into<String>,
    {
        self.principal = Some(principal.into());
        self
    }

    /// Returns the account the caller belongs to.
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Returns the principal of the caller, if known.
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Consumes the identity, returning the account.
    pub fn into_account(self) -> AccountId {
        self.account
    }
}

/// A credential resolution error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub))]
pub enum CredentialError {
    /// The credential source could not provide an identity right now.
    #[snafu(display("{} credentials are unavailable: {:#}", provider, source))]
    Unavailable {
        /// Name of the provider.
        provider: &'static str,

        /// Error source.
        source: GenericError,
    },

    /// An identity was obtained, or the source is configured, in a way that can never yield an account identifier.
    #[snafu(display("{} credentials are malformed: {:#}", provider, source))]
    Malformed {
        /// Name of the provider.
        provider: &'static str,

        /// Error source.
        source: GenericError,
    },
}

impl From<CredentialError> for FetchError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::Unavailable { .. } => FetchError::CredentialUnavailable { source: e.into() },
            CredentialError::Malformed { .. } => FetchError::ConfigurationInvalid { source: e.into() },
        }
    }
}

/// Provides the identity of the caller.
#[async_trait]
pub trait CredentialProvider {
    /// Returns a short, human-readable name for the provider, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Resolves the identity of the caller.
    ///
    /// # Errors
    ///
    /// If the credential source is temporarily unreachable, or has no credentials yet, `CredentialError::Unavailable`
    /// is returned. If the credential source can never yield an account identifier, `CredentialError::Malformed` is
    /// returned.
    async fn caller_identity(&self) -> Result<CallerIdentity, CredentialError>;
}

/// A boxed credential provider.
#[derive(Clone)]
pub struct BoxedCredentialProvider {
    inner: Arc<dyn CredentialProvider + Send + Sync>,
}

impl BoxedCredentialProvider {
    /// Creates a new `BoxedCredentialProvider` from the given credential provider.
    pub fn from_provider<P>(provider: P) -> Self
    where
        P: CredentialProvider + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(provider),
        }
    }
}

#[async_trait]
impl CredentialProvider for BoxedCredentialProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn caller_identity(&self) -> Result<CallerIdentity, CredentialError> {
        self.inner.caller_identity().await
    }
}
