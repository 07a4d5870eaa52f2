//! Liveness and pipeline status handler.
//!
//! ```text
//! GET /v1/status  Liveness message plus queue occupancy and error counts
//! ```

use actix_web::{HttpResponse, get, web};
use serde::Serialize;

use crate::domain::ports::PipelineStatus;
use crate::inbound::http::state::HttpState;

/// Liveness message reported by the status endpoint.
pub const STATUS_MESSAGE: &str = "laff service is up and running";

/// Response payload for the status endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: &'static str,
    pub cached_names: usize,
    pub cached_jokes: usize,
    pub name_errors: u32,
    pub joke_errors: u32,
}

impl From<PipelineStatus> for StatusResponse {
    fn from(value: PipelineStatus) -> Self {
        Self {
            status: STATUS_MESSAGE,
            cached_names: value.cached_names,
            cached_jokes: value.cached_jokes,
            name_errors: value.name_errors,
            joke_errors: value.joke_errors,
        }
    }
}

/// Report liveness and pipeline counters.
#[get("/v1/status")]
pub async fn get_status(state: web::Data<HttpState>) -> HttpResponse {
    HttpResponse::Ok().json(StatusResponse::from(state.jokes.status()))
}
