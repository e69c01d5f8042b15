//! Shared HTTP client plumbing.
use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{generic_error, GenericError};

/// Builds an HTTP client whose requests (including connecting) time out after `timeout`.
pub fn build_http_client(timeout: Duration) -> Result<Client, GenericError> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .map_err(|e| generic_error!("Failed to build HTTP client: {}", e))
}

/// Reads the body of a response, failing if the response status is not successful.
///
/// `what` names the requested resource in error messages.
pub async fn read_success_body(response: Response, what: &str) -> Result<String, GenericError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| generic_error!("Failed to read {} response body: {}", what, e))?;

    if !status.is_success() {
        return Err(generic_error!(
            "Request for {} failed with status {}: {}",
            what,
            status,
            body.trim()
        ));
    }

    Ok(body)
}
