//! HTTP adapter mapping for domain errors.
//!
//! Keeps the domain error type HTTP-agnostic while letting Actix handlers
//! turn failures into a JSON `{"status": "<message>"}` body and a status
//! code.

use actix_web::http::header::RETRY_AFTER;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use tracing::error;

use crate::domain::Error;
use crate::middleware::RequestId;

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

/// JSON body used for errors and liveness messages.
#[derive(Debug, Serialize)]
pub struct StatusMessage<'a> {
    pub status: &'a str,
}

/// `Retry-After` in whole seconds, rounded up so clients never retry early.
fn retry_after_secs(error: &Error) -> Option<u64> {
    match error {
        Error::RateLimited { retry_after } => {
            let secs = retry_after.as_secs();
            Some(if retry_after.subsec_nanos() > 0 {
                secs.saturating_add(1)
            } else {
                secs
            })
        }
        _ => None,
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let request_id = RequestId::current().map(|id| id.to_string());
        error!(
            error = %self,
            code = status.as_u16(),
            request_id = request_id.as_deref().unwrap_or("-"),
            "joke request failed"
        );

        let message = self.to_string();
        let mut builder = HttpResponse::build(status);
        if let Some(secs) = retry_after_secs(self) {
            builder.insert_header((RETRY_AFTER, secs.to_string()));
        }
        builder.json(StatusMessage { status: &message })
    }
}
