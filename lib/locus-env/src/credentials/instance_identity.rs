use async_trait::async_trait;
use locus_config::GenericConfiguration;
use serde::Deserialize;
use snafu::ResultExt as _;

use super::{CallerIdentity, CredentialError, CredentialProvider, Malformed, Unavailable};
use crate::{
    error::{generic_error, GenericError},
    helpers::imds::ImdsClient,
    model::AccountId,
};

const PROVIDER_NAME: &str = "instance identity";
const INSTANCE_IDENTITY_DOCUMENT_PATH: &str = "/latest/dynamic/instance-identity/document";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceIdentityDocument {
    account_id: Option<String>,
}

/// Credential provider based on the EC2 instance identity document.
///
/// The instance identity document is served by the instance metadata service and is signed by AWS, so the account it
/// names can be trusted without holding any IAM credentials.
#[derive(Clone)]
pub struct InstanceIdentityProvider {
    imds: ImdsClient,
}

impl InstanceIdentityProvider {
    /// Creates a new `InstanceIdentityProvider` using the given metadata client.
    pub fn new(imds: ImdsClient) -> Self {
        Self { imds }
    }

    /// Creates a new `InstanceIdentityProvider` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the metadata client cannot be configured, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        Ok(Self::new(ImdsClient::from_configuration(config)?))
    }
}

#[async_trait]
impl CredentialProvider for InstanceIdentityProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn caller_identity(&self) -> Result<CallerIdentity, CredentialError> {
        let raw_document = self
            .imds
            .get(INSTANCE_IDENTITY_DOCUMENT_PATH)
            .await
            .context(Unavailable { provider: PROVIDER_NAME })?;

        parse_instance_identity_document(&raw_document).context(Malformed { provider: PROVIDER_NAME })
    }
}

fn parse_instance_identity_document(raw_document: &str) -> Result<CallerIdentity, GenericError> {
    let document = serde_json::from_str::<InstanceIdentityDocument>(raw_document)
        .map_err(|e| generic_error!("Instance identity document is not valid JSON: {}", e))?;

    let account = document
        .account_id
        .ok_or_else(|| generic_error!("Instance identity document has no account identifier."))
        .and_then(AccountId::new)?;

    // The document names the instance, not an IAM principal.
    Ok(CallerIdentity::new(account))
}
