//! Builders wiring outbound adapters into the pipeline and HTTP state.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use laff::domain::{JokePipeline, JokePipelinePorts};
use laff::inbound::http::state::HttpState;
use laff::outbound::jokes::JokeHttpSource;
use laff::outbound::names::NameHttpSource;
use laff::settings::{LaffSettings, SettingsError};

use super::StartupError;

/// Build the pipeline over reqwest-backed upstream adapters.
pub fn build_pipeline(settings: &LaffSettings) -> Result<JokePipeline, StartupError> {
    let timeout = settings.upstream_timeout();
    let names = NameHttpSource::new(settings.name_url()?, timeout)
        .map_err(|source| StartupError::Client { upstream: "name", source })?;
    let jokes = JokeHttpSource::new(settings.joke_url()?, timeout)
        .map_err(|source| StartupError::Client { upstream: "joke", source })?;
    let pipeline = JokePipeline::new(
        JokePipelinePorts::new(Arc::new(names), Arc::new(jokes)),
        settings.pipeline_config()?,
    )
    .map_err(SettingsError::from)?;
    Ok(pipeline)
}

/// HTTP state exposing the pipeline's front door.
pub fn build_http_state(pipeline: &JokePipeline, shutdown: CancellationToken) -> HttpState {
    HttpState::new(Arc::new(pipeline.service()), shutdown)
}
