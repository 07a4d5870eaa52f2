//! HTTP inbound adapter exposing the joke endpoints.

pub mod error;
pub mod jokes;
pub mod state;
pub mod status;

pub use error::ApiResult;

use actix_web::web;

/// Register every HTTP route on `cfg`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource(jokes::JOKE_PATHS).route(web::get().to(jokes::get_joke)))
        .service(status::get_status);
}
