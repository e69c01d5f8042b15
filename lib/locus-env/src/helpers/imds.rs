//! EC2 instance metadata service (IMDSv2) client.
use std::time::Duration;

use locus_config::GenericConfiguration;
use reqwest::Client;

use super::http::{build_http_client, read_success_body};
use crate::error::{generic_error, GenericError};

const DEFAULT_IMDS_ENDPOINT: &str = "http://169.254.169.254";
const DEFAULT_IMDS_TIMEOUT: Duration = Duration::from_secs(2);
const TOKEN_TTL_SECONDS: u32 = 21600;
const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

/// A client for the EC2 instance metadata service.
///
/// Every call opens a fresh IMDSv2 session: a session token is requested first, and then used to authenticate the
/// actual metadata request. Nothing is cached between calls.
///
/// # Configuration
///
/// - `aws.imds_endpoint`: base URL of the metadata service (default: `http://169.254.169.254`)
/// - `aws.imds_timeout_ms`: per-request timeout, in milliseconds (default: 2000)
#[derive(Clone, Debug)]
pub struct ImdsClient {
    http: Client,
    endpoint: String,
}

impl ImdsClient {
    /// Creates a new `ImdsClient` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the configuration values are of the wrong type, or the HTTP client cannot be built, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        let endpoint = config
            .try_get_typed::<String>("aws.imds_endpoint")?
            .unwrap_or_else(|| DEFAULT_IMDS_ENDPOINT.to_string());
        let timeout = config
            .try_get_typed::<u64>("aws.imds_timeout_ms")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_IMDS_TIMEOUT);

        Self::new(endpoint, timeout)
    }

    /// Creates a new `ImdsClient` against the given endpoint.
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

    async fn session_token(&self) -> Result<String, GenericError> {
        let response = self
            .http
            .put(format!("{}/latest/api/token", self.endpoint))
            .header(TOKEN_TTL_HEADER, TOKEN_TTL_SECONDS.to_string())
            .send()
            .await
            .map_err(|e| generic_error!("Failed to request IMDS session token: {}", e))?;

        let token = read_success_body(response, "IMDS session token").await?;
        let token = token.trim();
        if token.is_empty() {
            return Err(generic_error!("IMDS returned an empty session token."));
        }

        Ok(token.to_string())
    }

    /// Gets the metadata at the given path, such as `/latest/meta-data/iam/info`.
    ///
    /// # Errors
    ///
    /// If the metadata service cannot be reached, or responds with an unsuccessful status, an error is returned.
    pub async fn get(&self, path: &str) -> Result<String, GenericError> {
        let token = self.session_token().await?;
        let response = self
            .http
            .get(format!("{}{}", self.endpoint, path))
            .header(TOKEN_HEADER, token)
            .send()
            .await
            .map_err(|e| generic_error!("Failed to query IMDS path '{}': {}", path, e))?;

        read_success_body(response, path).await
    }
}
