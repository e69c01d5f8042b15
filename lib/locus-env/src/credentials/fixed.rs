use async_trait::async_trait;
use locus_config::GenericConfiguration;
use serde::Deserialize;

use super::{CallerIdentity, CredentialError, CredentialProvider};
use crate::{error::GenericError, model::AccountId};

/// Credential provider based on a fixed account identifier.
///
/// Intended for standalone operation and testing, where the account is known upfront and no credential source is
/// reachable.
#[derive(Clone)]
pub struct FixedCredentialProvider {
    identity: CallerIdentity,
}

impl FixedCredentialProvider {
    /// Creates a new `FixedCredentialProvider` for the given account.
    pub fn new(account: AccountId) -> Self {
        Self {
            identity: CallerIdentity::new(account),
        }
    }

    /// Creates a new `FixedCredentialProvider` from the given configuration.
    ///
    /// Depends on the account identifier existing in the given configuration under the `discovery.account_id` key.
    ///
    /// # Errors
    ///
    /// If the account identifier is not specified in the configuration, or is empty, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        let account = match config.get_typed::<RawAccountId>("discovery.account_id")? {
            RawAccountId::Text(account) => account,
            RawAccountId::Number(account) => account.to_string(),
        };

        Ok(Self::new(AccountId::new(account)?))
    }
}

// Unquoted YAML values holding only digits arrive as numbers. Zero-padded values from the environment stay text.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAccountId {
    Text(String),
    Number(u64),
}

#[async_trait]
impl CredentialProvider for FixedCredentialProvider {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn caller_identity(&self) -> Result<CallerIdentity, CredentialError> {
        Ok(self.identity.clone())
    }
}
