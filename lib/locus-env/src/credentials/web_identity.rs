use std::path::PathBuf;

use async_trait::async_trait;
use locus_config::GenericConfiguration;
use snafu::ResultExt as _;
use tracing::debug;

use super::{CallerIdentity, CredentialError, CredentialProvider, Malformed, Unavailable};
use crate::{
    error::{generic_error, GenericError},
    helpers::{arn::ArnParts, sts::StsClient},
};

const PROVIDER_NAME: &str = "web identity";
const DEFAULT_ROLE_SESSION_NAME: &str = "locus-agent";

/// Credential provider based on a federated web identity token exchange.
///
/// This is how workloads on EKS obtain credentials when the service account is bound to an IAM role: a projected
/// service account token is exchanged with STS for temporary credentials of the bound role, and STS answers with the
/// ARN of the assumed role, which names the account.
///
/// # Configuration
///
/// - `aws.web_identity_token_file`: path to the token file (default: `AWS_WEB_IDENTITY_TOKEN_FILE`)
/// - `aws.role_arn`: role to assume (default: `AWS_ROLE_ARN`)
/// - `aws.role_session_name`: session name (default: `AWS_ROLE_SESSION_NAME`, or `locus-agent`)
#[derive(Clone)]
pub struct WebIdentityProvider {
    sts: StsClient,
    token_file: Option<PathBuf>,
    role_arn: Option<String>,
    session_name: String,
}

impl WebIdentityProvider {
    /// Creates a new `WebIdentityProvider` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the configuration values are of the wrong type, or the STS client cannot be configured, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        let token_file = match config.try_get_typed::<PathBuf>("aws.web_identity_token_file")? {
            Some(path) => Some(path),
            None => env_var("AWS_WEB_IDENTITY_TOKEN_FILE").map(PathBuf::from),
        };
        let role_arn = match config.try_get_typed::<String>("aws.role_arn")? {
            Some(role_arn) => Some(role_arn),
            None => env_var("AWS_ROLE_ARN"),
        };
        let session_name = match config.try_get_typed::<String>("aws.role_session_name")? {
            Some(session_name) => session_name,
            None => env_var("AWS_ROLE_SESSION_NAME").unwrap_or_else(|| DEFAULT_ROLE_SESSION_NAME.to_string()),
        };

        Ok(Self::new(StsClient::from_configuration(config)?, token_file, role_arn).with_session_name(session_name))
    }

    /// Creates a new `WebIdentityProvider`.
    pub fn new(sts: StsClient, token_file: Option<PathBuf>, role_arn: Option<String>) -> Self {
        Self {
            sts,
            token_file,
            role_arn,
            session_name: DEFAULT_ROLE_SESSION_NAME.to_string(),
        }
    }

    /// Sets the session name used when assuming the role.
    pub fn with_session_name<S>(mut self, session_name: S) -> Self
    where
        S: Into<String>,
    {
        self.session_name = session_name.into();
        self
    }
}

#[async_trait]
impl CredentialProvider for WebIdentityProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn caller_identity(&self) -> Result<CallerIdentity, CredentialError> {
        let (token_file, role_arn) = match (self.token_file.as_ref(), self.role_arn.as_deref()) {
            (Some(token_file), Some(role_arn)) => (token_file, role_arn),
            _ => {
                return Err(generic_error!("Web identity token file and role ARN are not both configured."))
                    .context(Unavailable { provider: PROVIDER_NAME })
            }
        };

        // The token is projected into the pod by the kubelet, and may not have been written yet right after start-up.
        let token = tokio::fs::read_to_string(token_file)
            .await
            .map_err(|e| generic_error!("Failed to read web identity token file '{}': {}", token_file.display(), e))
            .context(Unavailable { provider: PROVIDER_NAME })?;
        let token = token.trim();
        if token.is_empty() {
            return Err(generic_error!("Web identity token file '{}' is empty.", token_file.display()))
                .context(Unavailable { provider: PROVIDER_NAME });
        }

        debug!(role_arn, "Exchanging web identity token.");
        let assumed_role_arn = self
            .sts
            .assume_role_with_web_identity(role_arn, &self.session_name, token)
            .await
            .context(Unavailable { provider: PROVIDER_NAME })?;

        let account = ArnParts::parse(&assumed_role_arn)
            .and_then(|parts| parts.account_id())
            .context(Malformed { provider: PROVIDER_NAME })?;

        Ok(CallerIdentity::new(account).with_principal(assumed_role_arn))
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}
