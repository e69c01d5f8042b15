use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use locus_config::GenericConfiguration;
use reqwest::Client;
use serde::Deserialize;
use snafu::ResultExt as _;
use tracing::debug;

use super::{CallerIdentity, CredentialError, CredentialProvider, Malformed, Unavailable};
use crate::{
    error::{generic_error, GenericError},
    helpers::{
        arn::ArnParts,
        http::{build_http_client, read_success_body},
    },
    model::AccountId,
};

const PROVIDER_NAME: &str = "container credentials";
const ECS_CREDENTIALS_HOST: &str = "http://169.254.170.2";
const DEFAULT_CONTAINER_CREDENTIALS_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerCredentials {
    account_id: Option<String>,
    role_arn: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum AuthorizationToken {
    Inline(String),
    File(PathBuf),
}

/// Credential provider based on the container credentials endpoint.
///
/// Used by EKS Pod Identity and ECS task roles: a local agent serves the credentials of the role bound to the workload.
/// The account comes from the `AccountId` field of the response, or from the `RoleArn` field when only that is present.
///
/// # Configuration
///
/// - `aws.container_credentials_uri`: full endpoint URL (default: `AWS_CONTAINER_CREDENTIALS_FULL_URI`, or
///   `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` under `http://169.254.170.2`)
/// - `aws.container_authorization_token_file`: file holding the authorization token (default:
///   `AWS_CONTAINER_AUTHORIZATION_TOKEN_FILE`, or the inline `AWS_CONTAINER_AUTHORIZATION_TOKEN`)
/// - `aws.container_credentials_timeout_ms`: per-request timeout, in milliseconds (default: 2000)
#[derive(Clone)]
pub struct ContainerCredentialsProvider {
    http: Client,
    endpoint: Option<String>,
    authorization: Option<AuthorizationToken>,
}

impl ContainerCredentialsProvider {
    /// Creates a new `ContainerCredentialsProvider` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the configuration values are of the wrong type, or the HTTP client cannot be built, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        let endpoint = match config.try_get_typed::<String>("aws.container_credentials_uri")? {
            Some(endpoint) => Some(endpoint),
            None => env_var("AWS_CONTAINER_CREDENTIALS_FULL_URI").or_else(|| {
                env_var("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI")
                    .map(|relative| format!("{}{}", ECS_CREDENTIALS_HOST, relative))
            }),
        };
        let authorization = match config.try_get_typed::<PathBuf>("aws.container_authorization_token_file")? {
            Some(path) => Some(AuthorizationToken::File(path)),
            None => env_var("AWS_CONTAINER_AUTHORIZATION_TOKEN_FILE")
                .map(|path| AuthorizationToken::File(PathBuf::from(path)))
                .or_else(|| env_var("AWS_CONTAINER_AUTHORIZATION_TOKEN").map(AuthorizationToken::Inline)),
        };
        let timeout = config
            .try_get_typed::<u64>("aws.container_credentials_timeout_ms")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_CONTAINER_CREDENTIALS_TIMEOUT);

        Ok(Self::new(endpoint, timeout)?.with_authorization(authorization))
    }

    /// Creates a new `ContainerCredentialsProvider` against the given endpoint.
    ///
    /// When no endpoint is given, the provider always reports credentials as unavailable.
    ///
    /// # Errors
    ///
    /// If the HTTP client cannot be built, an error is returned.
    pub fn new(endpoint: Option<String>, timeout: Duration) -> Result<Self, GenericError> {
        Ok(Self {
            http: build_http_client(timeout)?,
            endpoint: endpoint.filter(|endpoint| !endpoint.trim().is_empty()),
            authorization: None,
        })
    }

    /// Sets the token file to send as the `Authorization` header.
    pub fn with_authorization_token_file<P>(self, path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        self.with_authorization(Some(AuthorizationToken::File(path.into())))
    }

    fn with_authorization(mut self, authorization: Option<AuthorizationToken>) -> Self {
        self.authorization = authorization;
        self
    }

    async fn authorization_token(&self) -> Result<Option<String>, GenericError> {
        match &self.authorization {
            None => Ok(None),
            Some(AuthorizationToken::Inline(token)) => Ok(Some(token.trim().to_string())),
            // Pod Identity rotates the token file, so it is read on every request.
            Some(AuthorizationToken::File(path)) => tokio::fs::read_to_string(path)
                .await
                .map(|token| Some(token.trim().to_string()))
                .map_err(|e| generic_error!("Failed to read authorization token file '{}': {}", path.display(), e)),
        }
    }
}

#[async_trait]
impl CredentialProvider for ContainerCredentialsProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn caller_identity(&self) -> Result<CallerIdentity, CredentialError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| generic_error!("No container credentials endpoint is configured."))
            .context(Unavailable { provider: PROVIDER_NAME })?;
        let token = self
            .authorization_token()
            .await
            .context(Unavailable { provider: PROVIDER_NAME })?;

        let mut request = self.http.get(endpoint);
        if let Some(token) = token {
            request = request.header("Authorization", token);
        }

        debug!(endpoint, "Requesting container credentials.");
        let response = request
            .send()
            .await
            .map_err(|e| generic_error!("Failed to query container credentials endpoint: {}", e))
            .context(Unavailable { provider: PROVIDER_NAME })?;
        let body = read_success_body(response, "container credentials")
            .await
            .context(Unavailable { provider: PROVIDER_NAME })?;

        parse_container_credentials(&body).context(Malformed { provider: PROVIDER_NAME })
    }
}

fn parse_container_credentials(body: &str) -> Result<CallerIdentity, GenericError> {
    let credentials = serde_json::from_str::<ContainerCredentials>(body)
        .map_err(|e| generic_error!("Container credentials are not valid JSON: {}", e))?;

    let account = match (credentials.account_id.as_deref(), credentials.role_arn.as_deref()) {
        (Some(account_id), _) if !account_id.trim().is_empty() => AccountId::new(account_id)?,
        (_, Some(role_arn)) => ArnParts::parse(role_arn)?.account_id()?,
        _ => return Err(generic_error!("Container credentials name neither an account nor a role.")),
    };

    let identity = CallerIdentity::new(account);
    Ok(match credentials.role_arn {
        Some(role_arn) => identity.with_principal(role_arn),
        None => identity,
    })
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_field_wins() {
        let identity = parse_container_credentials(
            r#"{"AccessKeyId":"ASIAEXAMPLE","SecretAccessKey":"secret","Token":"token","AccountId":"012345678901","Expiration":"2026-10-19T12:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(identity.account().as_str(), "012345678901");
        assert_eq!(identity.principal(), None);
    }

    #[test]
    fn account_from_role_arn() {
        let identity = parse_container_credentials(
            r#"{"AccessKeyId":"ASIAEXAMPLE","RoleArn":"arn:aws:iam::111122223333:role/api-task"}"#,
        )
        .unwrap();

        assert_eq!(identity.account().as_str(), "111122223333");
        assert_eq!(identity.principal(), Some("arn:aws:iam::111122223333:role/api-task"));
    }

    #[test]
    fn credentials_without_account_are_rejected() {
        assert!(parse_container_credentials(r#"{"AccessKeyId":"ASIAEXAMPLE","Token":"token"}"#).is_err());
        assert!(parse_container_credentials("not json").is_err());
    }

    #[tokio::test]
    async fn unconfigured_endpoint_is_unavailable() {
        let provider = ContainerCredentialsProvider::new(None, Duration::from_millis(100)).unwrap();
        assert!(matches!(
            provider.caller_identity().await,
            Err(CredentialError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn missing_authorization_token_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = Some("http://127.0.0.1:9/v1/credentials".to_string());
        let provider = ContainerCredentialsProvider::new(endpoint, Duration::from_millis(100))
            .unwrap()
            .with_authorization_token_file(dir.path().join("eks-pod-identity-token"));

        assert!(matches!(
            provider.caller_identity().await,
            Err(CredentialError::Unavailable { .. })
        ));
    }
}
