//! Reqwest-backed joke source adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode, Url};

use super::dto::JokeEnvelopeDto;
use crate::domain::ports::{JokeSource, JokeSourceError, NameRecord};

/// Joke category requested from the upstream.
const JOKE_CATEGORY: &str = "nerdy";

/// Joke source performing HTTP GET requests against one endpoint.
pub struct JokeHttpSource {
    client: Client,
    endpoint: Url,
}

impl JokeHttpSource {
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
impl JokeSource for JokeHttpSource {
    async fn fetch_joke(&self, name: &NameRecord) -> Result<String, JokeSourceError> {
        if !name.is_composable() {
            return Err(JokeSourceError::invalid_name(format!(
                "name {name:?} lacks a first or last name"
            )));
        }
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("firstName", name.first_name.as_str()),
                ("lastName", name.last_name.as_str()),
                ("limitTo", JOKE_CATEGORY),
            ])
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status_error(status));
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        parse_joke(body.as_ref())
    }
}

fn parse_joke(body: &[u8]) -> Result<String, JokeSourceError> {
    let decoded: JokeEnvelopeDto = serde_json::from_slice(body).map_err(|error| {
        JokeSourceError::decode(format!("invalid joke JSON payload: {error}"))
    })?;
    decoded.into_joke().map_err(JokeSourceError::decode)
}

fn map_transport_error(error: reqwest::Error) -> JokeSourceError {
    if error.is_timeout() {
        JokeSourceError::timeout(error.to_string())
    } else {
        JokeSourceError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode) -> JokeSourceError {
    JokeSourceError::status(
        status.as_u16(),
        status.canonical_reason().unwrap_or("unknown status"),
    )
}
