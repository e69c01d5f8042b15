use std::time::Duration;

use async_trait::async_trait;
use locus_config::GenericConfiguration;
use reqwest::Client;
use serde::Deserialize;
use snafu::ResultExt as _;

use super::{CallerIdentity, CredentialError, CredentialProvider, Malformed, Unavailable};
use crate::{
    error::{generic_error, GenericError},
    helpers::{
        arn::ArnParts,
        http::{build_http_client, read_success_body},
    },
};

const PROVIDER_NAME: &str = "task metadata";
const DEFAULT_TASK_METADATA_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Deserialize)]
struct TaskMetadata {
    #[serde(rename = "TaskARN")]
    task_arn: Option<String>,
}

/// Credential provider based on the ECS task metadata endpoint.
///
/// The ECS agent injects the endpoint into every container of a task, and the task ARN it reports names the account
/// that owns the task.
///
/// # Configuration
///
/// - `aws.ecs_metadata_uri`: base URI of the task metadata endpoint (default: `ECS_CONTAINER_METADATA_URI_V4`)
/// - `aws.ecs_metadata_timeout_ms`: per-request timeout, in milliseconds (default: 2000)
#[derive(Clone)]
pub struct TaskMetadataProvider {
    http: Client,
    metadata_uri: Option<String>,
}

impl TaskMetadataProvider {
    /// Creates a new `TaskMetadataProvider` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the configuration values are of the wrong type, or the HTTP client cannot be built, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        let metadata_uri = match config.try_get_typed::<String>("aws.ecs_metadata_uri")? {
            Some(uri) => Some(uri),
            None => std::env::var("ECS_CONTAINER_METADATA_URI_V4").ok(),
        };
        let timeout = config
            .try_get_typed::<u64>("aws.ecs_metadata_timeout_ms")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TASK_METADATA_TIMEOUT);

        Self::new(metadata_uri, timeout)
    }

    /// Creates a new `TaskMetadataProvider` against the given task metadata endpoint.
    ///
    /// # Errors
    ///
    /// If the HTTP client cannot be built, an error is returned.
    pub fn new(metadata_uri: Option<String>, timeout: Duration) -> Result<Self, GenericError> {
        Ok(Self {
            http: build_http_client(timeout)?,
            metadata_uri: metadata_uri
                .map(|uri| uri.trim().trim_end_matches('/').to_string())
                .filter(|uri| !uri.is_empty()),
        })
    }
}

#[async_trait]
impl CredentialProvider for TaskMetadataProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn caller_identity(&self) -> Result<CallerIdentity, CredentialError> {
        // The endpoint is injected when the container starts, so it will never show up later.
        let metadata_uri = self
            .metadata_uri
            .as_deref()
            .ok_or_else(|| generic_error!("Task metadata endpoint is not configured."))
            .context(Malformed { provider: PROVIDER_NAME })?;

        let response = self
            .http
            .get(format!("{}/task", metadata_uri))
            .send()
            .await
            .map_err(|e| generic_error!("Failed to query task metadata: {}", e))
            .context(Unavailable { provider: PROVIDER_NAME })?;
        let raw_metadata = read_success_body(response, "task metadata")
            .await
            .context(Unavailable { provider: PROVIDER_NAME })?;

        parse_task_metadata(&raw_metadata).context(Malformed { provider: PROVIDER_NAME })
    }
}

fn parse_task_metadata(raw_metadata: &str) -> Result<CallerIdentity, GenericError> {
    let metadata = serde_json::from_str::<TaskMetadata>(raw_metadata)
        .map_err(|e| generic_error!("Task metadata is not valid JSON: {}", e))?;
    let task_arn = metadata
        .task_arn
        .ok_or_else(|| generic_error!("Task metadata has no task ARN."))?;
    let account = ArnParts::parse(&task_arn)?.account_id()?;

    Ok(CallerIdentity::new(account).with_principal(task_arn))
}
