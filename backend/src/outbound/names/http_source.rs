//! Reqwest-backed name source adapter.
//!
//! Owns transport details only: the request, client timeout, rate-limit and
//! status mapping, and JSON decoding into a [`NameRecord`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};

use super::dto::NameDto;
use crate::domain::ports::{NameRecord, NameSource, NameSourceError};

/// Delay assumed when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(90);

/// Name source performing HTTP GET requests against one endpoint.
pub struct NameHttpSource {
    client: Client,
    endpoint: Url,
}

impl NameHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl NameSource for NameHttpSource {
    async fn fetch_name(&self) -> Result<NameRecord, NameSourceError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(NameSourceError::rate_limited(retry_after(
                response.headers(),
            )));
        }
        if !status.is_success() {
            return Err(map_status_error(status));
        }

        let body = response.bytes().await.map_err(map_transport_error)?;
        parse_name(body.as_ref())
    }
}

fn parse_name(body: &[u8]) -> Result<NameRecord, NameSourceError> {
    let decoded: NameDto = serde_json::from_slice(body).map_err(|error| {
        NameSourceError::decode(format!("invalid name JSON payload: {error}"))
    })?;
    Ok(decoded.into())
}

/// Whole seconds from `Retry-After`, or [`DEFAULT_RETRY_AFTER`].
fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map_or(DEFAULT_RETRY_AFTER, Duration::from_secs)
}

fn map_transport_error(error: reqwest::Error) -> NameSourceError {
    if error.is_timeout() {
        NameSourceError::timeout(error.to_string())
    } else {
        NameSourceError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode) -> NameSourceError {
    NameSourceError::status(
        status.as_u16(),
        status.canonical_reason().unwrap_or("unknown status"),
    )
}
