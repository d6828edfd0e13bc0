//! HTTP plumbing shared by the provider implementations.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};

/// Build an HTTP client with the provider's timeout applied to every request.
pub(crate) fn build_client(config: &ProviderConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Send a prepared request and return the body of a successful response.
///
/// Timeouts, transport failures and non-success statuses are mapped to
/// [`ProviderError`]; nothing is retried.
pub(crate) async fn send(
    provider: &'static str,
    timeout_secs: u64,
    request: RequestBuilder,
) -> std::result::Result<String, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, timeout_secs, e))?;

    let status = response.status();
    debug!("{} API responded with status {}", provider, status);

    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, timeout_secs, e))?;

    if !status.is_success() {
        return Err(ProviderError::Status {
            provider,
            status: status.as_u16(),
            body,
        });
    }

    Ok(body)
}

/// Parse a JSON envelope, reporting failures as malformed responses.
pub(crate) fn parse_envelope<T: serde::de::DeserializeOwned>(
    provider: &'static str,
    body: &str,
) -> std::result::Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::MalformedResponse {
        provider,
        detail: e.to_string(),
    })
}
