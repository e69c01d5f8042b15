//! Identity agent options.
//!
//! The identity agent running on the host declares which services it manages, and for which domain, per account. An
//! [`OptionsSource`] loads that declaration in its normalized form, [`AgentOptions`], for a specific account, and
//! [`to_services_data`] turns it into the canonical inventory.
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use snafu::Snafu;

use crate::{
    error::{generic_error, FetchError, GenericError},
    model::{AccountId, ServiceRecord, ServicesData},
};

mod sia;
pub use self::sia::{SiaConfig, SiaConfigFile};

/// Normalized identity agent options for a single account.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AgentOptions {
    domain: String,
    account: AccountId,
    services: Vec<String>,
}

impl AgentOptions {
    /// Creates a new `AgentOptions`.
    pub fn new<D>(domain: D, account: AccountId, services: Vec<String>) -> Self
    where
        D: Into<String>,
    {
        Self {
            domain: domain.into(),
            account,
            services,
        }
    }

    /// Returns the domain the services belong to.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the account the options were resolved for.
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Returns the declared service names.
    pub fn services(&self) -> &[String] {
        &self.services
    }
}

/// An options resolution error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub))]
pub enum OptionsError {
    /// The identity agent configuration could not be loaded at all.
    #[snafu(display("Failed to load identity agent configuration from '{}': {:#}", path.display(), source))]
    Load {
        /// Path of the configuration.
        path: PathBuf,

        /// Error source.
        source: GenericError,
    },

    /// The configuration declares accounts, but not the one being resolved.
    #[snafu(display(
        "Identity agent configuration has no entry for account '{}' (declared: {}).",
        account,
        declared.join(", ")
    ))]
    AccountMismatch {
        /// Account being resolved.
        account: AccountId,

        /// Accounts the configuration declares.
        declared: Vec<String>,
    },

    /// No domain could be determined for the account.
    #[snafu(display("Identity agent configuration declares no domain for account '{}'.", account))]
    MissingDomain {
        /// Account being resolved.
        account: AccountId,
    },

    /// A declared service is not usable.
    #[snafu(display("Identity agent configuration declares an invalid service: {}", reason))]
    InvalidService {
        /// Why the service is invalid.
        reason: String,
    },
}

impl From<OptionsError> for FetchError {
    fn from(e: OptionsError) -> Self {
        match e {
            OptionsError::Load { .. } => FetchError::ConfigurationInvalid { source: e.into() },
            _ => FetchError::OptionsResolutionFailed { source: e.into() },
        }
    }
}

/// A source of identity agent options.
#[async_trait]
pub trait OptionsSource {
    /// Loads the options declared at `path` for the given account.
    ///
    /// # Errors
    ///
    /// If the configuration cannot be loaded, `OptionsError::Load` is returned. If it loads but cannot be resolved for
    /// `account_id`, one of the other variants is returned.
    async fn load(&self, path: &Path, account_id: &AccountId) -> Result<AgentOptions, OptionsError>;
}

/// A boxed options source.
#[derive(Clone)]
pub struct BoxedOptionsSource {
    inner: Arc<dyn OptionsSource + Send + Sync>,
}

impl BoxedOptionsSource {
    /// Creates a new `BoxedOptionsSource` from the given options source.
    pub fn from_source<S>(source: S) -> Self
    where
        S: OptionsSource + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(source),
        }
    }
}

#[async_trait]
impl OptionsSource for BoxedOptionsSource {
    async fn load(&self, path: &Path, account_id: &AccountId) -> Result<AgentOptions, OptionsError> {
        self.inner.load(path, account_id).await
    }
}

/// Converts resolved options into the canonical inventory for `account_id`.
///
/// Every declared service becomes a [`ServiceRecord`] in the options' domain, which is also used as the account-wide
/// default domain.
///
/// # Errors
///
/// If the options were resolved for a different account, or do not carry a domain, `FetchError::OptionsResolutionFailed`
/// is returned.
pub fn to_services_data(options: &AgentOptions, account_id: &AccountId) -> Result<ServicesData, FetchError> {
    if options.account() != account_id {
        return Err(FetchError::OptionsResolutionFailed {
            source: generic_error!(
                "Options were resolved for account '{}', but account '{}' was requested.",
                options.account(),
                account_id
            ),
        });
    }

    let records = options
        .services()
        .iter()
        .map(|name| ServiceRecord::new(name.as_str(), options.domain()));

    ServicesData::new(options.domain(), records).map_err(|source| FetchError::OptionsResolutionFailed { source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str) -> AccountId {
        AccountId::new(id).unwrap()
    }

    #[test]
    fn single_service() {
        let options = AgentOptions::new("sports", account("1234"), vec!["api".to_string()]);
        let data = to_services_data(&options, &account("1234")).unwrap();

        assert_eq!(data.domain(), "sports");
        assert_eq!(data.services(), &[ServiceRecord::new("api", "sports")]);
    }

    #[test]
    fn zero_services_is_not_an_error() {
        let options = AgentOptions::new("sports", account("1234"), Vec::new());
        let data = to_services_data(&options, &account("1234")).unwrap();

        assert!(data.is_empty());
        assert_eq!(data.domain(), "sports");
    }

    #[test]
    fn duplicate_services_are_collapsed() {
        let options = AgentOptions::new("sports", account("1234"), vec!["api".to_string(), "api".to_string()]);
        let data = to_services_data(&options, &account("1234")).unwrap();

        assert_eq!(data.services().len(), 1);
    }

    #[test]
    fn other_account_is_rejected() {
        let options = AgentOptions::new("sports", account("1234"), vec!["api".to_string()]);
        assert!(matches!(
            to_services_data(&options, &account("5678")),
            Err(FetchError::OptionsResolutionFailed { .. })
        ));
    }

    #[test]
    fn empty_domain_is_rejected() {
        let options = AgentOptions::new("", account("1234"), vec!["api".to_string()]);
        assert!(matches!(
            to_services_data(&options, &account("1234")),
            Err(FetchError::OptionsResolutionFailed { .. })
        ));
    }

    #[test]
    fn options_errors_map_to_fetch_errors() {
        let load = OptionsError::Load {
            path: PathBuf::from("/etc/sia/sia_config"),
            source: generic_error!("no such file"),
        };
        assert!(matches!(FetchError::from(load), FetchError::ConfigurationInvalid { .. }));

        let mismatch = OptionsError::AccountMismatch {
            account: account("5678"),
            declared: vec!["1234".to_string()],
        };
        assert!(matches!(
            FetchError::from(mismatch),
            FetchError::OptionsResolutionFailed { .. }
        ));
    }
}
