//! AWS Security Token Service client.
//!
//! Only the unsigned token-exchange call (`AssumeRoleWithWebIdentity`) is supported: it authenticates with the web
//! identity token itself, so no request signing is required.
use std::{sync::OnceLock, time::Duration};

use locus_config::GenericConfiguration;
use regex::Regex;
use reqwest::Client;

use super::http::{build_http_client, read_success_body};
use crate::error::{generic_error, GenericError};

const DEFAULT_STS_TIMEOUT: Duration = Duration::from_secs(5);
const STS_API_VERSION: &str = "2011-06-15";

/// A client for the AWS Security Token Service.
///
/// # Configuration
///
/// - `aws.sts_endpoint`: STS endpoint URL (default: the regional endpoint for `aws.region`/`AWS_REGION`, or the global
///   `https://sts.amazonaws.com` endpoint)
/// - `aws.sts_timeout_ms`: per-request timeout, in milliseconds (default: 5000)
#[derive(Clone, Debug)]
pub struct StsClient {
    http: Client,
    endpoint: String,
}

impl StsClient {
    /// Creates a new `StsClient` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the configuration values are of the wrong type, or the HTTP client cannot be built, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        let region = match config.try_get_typed::<String>("aws.region")? {
            Some(region) => Some(region),
            None => std::env::var("AWS_REGION").ok(),
        };
        let endpoint = config
            .try_get_typed::<String>("aws.sts_endpoint")?
            .unwrap_or_else(|| default_sts_endpoint(region.as_deref()));
        let timeout = config
            .try_get_typed::<u64>("aws.sts_timeout_ms")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_STS_TIMEOUT);

        Self::new(endpoint, timeout)
    }

    /// Creates a new `StsClient` against the given endpoint.
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

    /// Exchanges a web identity token for temporary credentials of `role_arn`, returning the ARN of the assumed role
    /// user.
    ///
    /// # Errors
    ///
    /// If STS cannot be reached, rejects the exchange, or responds without an assumed role ARN, an error is returned.
    pub async fn assume_role_with_web_identity(
        &self, role_arn: &str, session_name: &str, web_identity_token: &str,
    ) -> Result<String, GenericError> {
        let response = self
            .http
            .post(format!("{}/", self.endpoint))
            .form(&[
                ("Action", "AssumeRoleWithWebIdentity"),
                ("Version", STS_API_VERSION),
                ("RoleArn", role_arn),
                ("RoleSessionName", session_name),
                ("WebIdentityToken", web_identity_token),
            ])
            .send()
            .await
            .map_err(|e| generic_error!("Failed to call STS AssumeRoleWithWebIdentity: {}", e))?;

        let body = read_success_body(response, "STS AssumeRoleWithWebIdentity").await?;
        extract_assumed_role_arn(&body)
    }
}

fn default_sts_endpoint(region: Option<&str>) -> String {
    match region.map(str::trim).filter(|region| !region.is_empty()) {
        Some(region) => format!("https://sts.{}.amazonaws.com", region),
        None => "https://sts.amazonaws.com".to_string(),
    }
}

fn extract_assumed_role_arn(body: &str) -> Result<String, GenericError> {
    static ASSUMED_ROLE_ARN_REGEX: OnceLock<Regex> = OnceLock::new();

    let regex = ASSUMED_ROLE_ARN_REGEX
        .get_or_init(|| Regex::new(r"(?s)<AssumedRoleUser>.*?<Arn>\s*([^<\s]+)\s*</Arn>").unwrap());

    regex
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|arn| arn.as_str().to_string())
        .ok_or_else(|| generic_error!("STS response did not contain an assumed role ARN."))
}
