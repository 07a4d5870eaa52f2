//! Joke HTTP handler.
//!
//! ```text
//! GET /         Serve one personalised joke
//! GET /v1/joke  Same as `/`
//! ```

use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, web};

use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Paths answering with a joke.
pub const JOKE_PATHS: [&str; 2] = ["/", "/v1/joke"];

/// Serve one joke as UTF-8 plain text followed by a newline.
pub async fn get_joke(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let joke = state.jokes.joke(&state.shutdown).await?;
    Ok(HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(format!("{joke}\n")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::dev::ServiceResponse;
    use actix_web::http::StatusCode;
    use actix_web::http::header::{CONTENT_TYPE, RETRY_AFTER};
    use actix_web::{App, test};
    use rstest::rstest;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::domain::Error;
    use crate::domain::ports::{FixtureJokeQuery, JokeQuery, MockJokeQuery};

    async fn call(
        jokes: Arc<dyn JokeQuery>,
        shutdown: CancellationToken,
        uri: &str,
    ) -> ServiceResponse {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(HttpState::new(jokes, shutdown)))
                .service(web::resource(JOKE_PATHS).route(web::get().to(get_joke))),
        )
        .await;
        test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await
    }

    #[rstest]
    #[case::root("/")]
    #[case::versioned("/v1/joke")]
    #[actix_web::test]
    async fn serves_plain_text_with_trailing_newline(#[case] uri: &str) {
        let res = call(Arc::new(FixtureJokeQuery), CancellationToken::new(), uri).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("text/plain; charset=utf-8")
        );
        let body = test::read_body(res).await;
        assert_eq!(body.as_ref(), b"Chuck Norris can divide by zero.\n");
    }

    #[actix_web::test]
    async fn rate_limit_becomes_429_with_retry_after() {
        let mut jokes = MockJokeQuery::new();
        jokes.expect_joke().times(1).returning(|_| {
            Err(Error::RateLimited {
                retry_after: Duration::from_secs(90),
            })
        });

        let res = call(Arc::new(jokes), CancellationToken::new(), "/v1/joke").await;

        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            res.headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok()),
            Some("90")
        );
    }

    #[actix_web::test]
    async fn upstream_failure_becomes_502_json() {
        let mut jokes = MockJokeQuery::new();
        jokes
            .expect_joke()
            .times(1)
            .returning(|_| Err(Error::upstream("joke service timed out: deadline")));

        let res = call(Arc::new(jokes), CancellationToken::new(), "/").await;

        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["status"], "joke service timed out: deadline");
    }

    #[actix_web::test]
    async fn shutdown_token_reaches_the_front_door() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let res = call(Arc::new(FixtureJokeQuery), shutdown, "/").await;

        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
