use std::time::Duration;

use async_trait::async_trait;
use locus_config::GenericConfiguration;
use reqwest::Client;
use snafu::ResultExt as _;

use super::{CallerIdentity, CredentialError, CredentialProvider, Malformed, Unavailable};
use crate::{
    error::{generic_error, GenericError},
    helpers::http::{build_http_client, read_success_body},
    model::AccountId,
};

const PROVIDER_NAME: &str = "GCE metadata";
const DEFAULT_GCE_METADATA_ENDPOINT: &str = "http://metadata.google.internal";
const DEFAULT_GCE_METADATA_TIMEOUT: Duration = Duration::from_secs(2);
const PROJECT_ID_PATH: &str = "/computeMetadata/v1/project/project-id";
const SERVICE_ACCOUNT_EMAIL_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/email";

/// Credential provider based on the GCE metadata server.
///
/// On Google Cloud the account is the project the instance runs in. The default service account's email, when
/// available, is reported as the caller's principal.
///
/// # Configuration
///
/// - `gcp.metadata_endpoint`: base URL of the metadata server (default: `http://metadata.google.internal`)
/// - `gcp.metadata_timeout_ms`: per-request timeout, in milliseconds (default: 2000)
#[derive(Clone)]
pub struct GceMetadataProvider {
    http: Client,
    endpoint: String,
}

impl GceMetadataProvider {
    /// Creates a new `GceMetadataProvider` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the configuration values are of the wrong type, or the HTTP client cannot be built, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        let endpoint = config
            .try_get_typed::<String>("gcp.metadata_endpoint")?
            .unwrap_or_else(|| DEFAULT_GCE_METADATA_ENDPOINT.to_string());
        let timeout = config
            .try_get_typed::<u64>("gcp.metadata_timeout_ms")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_GCE_METADATA_TIMEOUT);

        Self::new(endpoint, timeout)
    }

    /// Creates a new `GceMetadataProvider` against the given metadata server.
    ///
    /// # Errors
    ///
    /// If the HTTP client cannot be built, an error is returned.
    pub fn new<S>(endpoint: S, timeout: Duration) -> Result<Self, GenericError>
    where
        S: Into<String>,
    {
        Ok(Self {
            http: build_http_client(timeout)?,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str) -> Result<String, GenericError> {
        let response = self
            .http
            .get(format!("{}{}", self.endpoint, path))
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| generic_error!("Failed to query GCE metadata path '{}': {}", path, e))?;

        read_success_body(response, path).await
    }
}

#[async_trait]
impl CredentialProvider for GceMetadataProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn caller_identity(&self) -> Result<CallerIdentity, CredentialError> {
        let project_id = self
            .get(PROJECT_ID_PATH)
            .await
            .context(Unavailable { provider: PROVIDER_NAME })?;
        let account = AccountId::new(project_id).context(Malformed { provider: PROVIDER_NAME })?;

        let identity = CallerIdentity::new(account);
        Ok(match self.get(SERVICE_ACCOUNT_EMAIL_PATH).await {
            Ok(email) if !email.trim().is_empty() => identity.with_principal(email.trim()),
            _ => identity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let provider = GceMetadataProvider::new("http://169.254.169.254/", Duration::from_millis(100)).unwrap();
        assert_eq!(provider.endpoint, "http://169.254.169.254");
    }

    #[tokio::test]
    async fn unreachable_metadata_server_is_unavailable() {
        let provider = GceMetadataProvider::new("http://127.0.0.1:1", Duration::from_millis(200)).unwrap();
        assert!(matches!(
            provider.caller_identity().await,
            Err(CredentialError::Unavailable { .. })
        ));
    }
}
