//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::ServerConfig;
pub use state_builders::{build_http_state, build_pipeline};

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::body::{BoxBody, EitherBody};
use actix_web::{App, HttpServer, web};
use thiserror::Error;

use laff::inbound::http::{self, state::HttpState};
use laff::middleware::{InboundRateLimit, RequestLog};
use laff::settings::SettingsError;

/// Failures that stop the process before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load settings: {message}")]
    Load { message: String },
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("failed to build {upstream} client: {source}")]
    Client {
        upstream: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP server failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Clone)]
struct AppDependencies {
    http_state: web::Data<HttpState>,
    rate_limit: InboundRateLimit,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<EitherBody<BoxBody>>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        http_state,
        rate_limit,
    } = deps;

    App::new()
        .app_data(http_state)
        .wrap(rate_limit)
        .wrap(RequestLog)
        .configure(http::configure)
}

/// Construct an Actix HTTP server serving jokes from `http_state`.
///
/// Signal handling is left to the caller, which owns the shutdown token and
/// stops the server through its handle.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(http_state: HttpState, config: ServerConfig) -> std::io::Result<Server> {
    let http_state = web::Data::new(http_state);
    // One bucket shared by every worker keeps the limit server-wide.
    let rate_limit = InboundRateLimit::per_second(config.limit);
    let ServerConfig {
        bind_addr,
        timeout,
        limit: _,
    } = config;

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            http_state: http_state.clone(),
            rate_limit: rate_limit.clone(),
        })
    })
    .disable_signals()
    .client_request_timeout(timeout)
    .shutdown_timeout(timeout.as_secs())
    .bind(bind_addr)?
    .run();
    Ok(server)
}
