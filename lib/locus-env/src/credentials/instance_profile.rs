use async_trait::async_trait;
use locus_config::GenericConfiguration;
use serde::Deserialize;
use snafu::ResultExt as _;

use super::{CallerIdentity, CredentialError, CredentialProvider, Malformed, Unavailable};
use crate::{
    error::{generic_error, GenericError},
    helpers::{arn::ArnParts, imds::ImdsClient},
};

const PROVIDER_NAME: &str = "instance profile";
const IAM_INFO_PATH: &str = "/latest/meta-data/iam/info";

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IamInfo {
    code: Option<String>,
    instance_profile_arn: Option<String>,
}

/// Credential provider based on the instance profile role attached to the host.
///
/// The instance metadata service only reports IAM information once a role is attached and has propagated, so a missing
/// role is reported as unavailable rather than malformed.
#[derive(Clone)]
pub struct InstanceProfileProvider {
    imds: ImdsClient,
}

impl InstanceProfileProvider {
    /// Creates a new `InstanceProfileProvider` using the given metadata client.
    pub fn new(imds: ImdsClient) -> Self {
        Self { imds }
    }

    /// Creates a new `InstanceProfileProvider` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the metadata client cannot be configured, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        Ok(Self::new(ImdsClient::from_configuration(config)?))
    }
}

#[async_trait]
impl CredentialProvider for InstanceProfileProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn caller_identity(&self) -> Result<CallerIdentity, CredentialError> {
        let raw_info = self
            .imds
            .get(IAM_INFO_PATH)
            .await
            .context(Unavailable { provider: PROVIDER_NAME })?;

        let info = serde_json::from_str::<IamInfo>(&raw_info)
            .map_err(|e| generic_error!("IAM info is not valid JSON: {}", e))
            .context(Malformed { provider: PROVIDER_NAME })?;

        match info.code.as_deref() {
            Some("Success") | None => {}
            Some(code) => {
                return Err(generic_error!("IAM info reported status '{}'.", code))
                    .context(Unavailable { provider: PROVIDER_NAME })
            }
        }

        let arn = info
            .instance_profile_arn
            .ok_or_else(|| generic_error!("IAM info has no instance profile ARN."))
            .context(Unavailable { provider: PROVIDER_NAME })?;

        let account = ArnParts::parse(&arn)
            .and_then(|parts| parts.account_id())
            .context(Malformed { provider: PROVIDER_NAME })?;

        Ok(CallerIdentity::new(account).with_principal(arn))
    }
}
