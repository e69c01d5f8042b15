use async_trait::async_trait;
use tracing::debug;

use super::{BoxedCredentialProvider, CallerIdentity, CredentialError, CredentialProvider};
use crate::error::generic_error;

/// A credential provider that tries a sequence of providers in order.
///
/// The first provider to return an identity wins. A provider reporting malformed credentials stops the chain, as the
/// credential source it speaks for is broken rather than absent. If every provider is unavailable, the chain is
/// unavailable, with each provider's failure listed in the error.
#[derive(Clone)]
pub struct ChainedCredentialProvider {
    providers: Vec<BoxedCredentialProvider>,
}

impl ChainedCredentialProvider {
    /// Creates a new `ChainedCredentialProvider` over the given providers, tried in order.
    pub fn new(providers: Vec<BoxedCredentialProvider>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl CredentialProvider for ChainedCredentialProvider {
    fn name(&self) -> &'static str {
        "credential chain"
    }

    async fn caller_identity(&self) -> Result<CallerIdentity, CredentialError> {
        let mut failures = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            match provider.caller_identity().await {
                Ok(identity) => {
                    debug!(provider = provider.name(), account_id = %identity.account(), "Resolved caller identity.");
                    return Ok(identity);
                }
                Err(CredentialError::Unavailable { source, .. }) => {
                    debug!(provider = provider.name(), error = %source, "Credential provider unavailable. Trying next provider.");
                    failures.push(format!("{}: {:#}", provider.name(), source));
                }
                Err(e) => return Err(e),
            }
        }

        let reason = if failures.is_empty() {
            "no credential providers configured".to_string()
        } else {
            failures.join("; ")
        };

        Err(CredentialError::Unavailable {
            provider: self.name(),
            source: generic_error!("No credential provider could resolve an identity ({}).", reason),
        })
    }
}
