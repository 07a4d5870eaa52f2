//! Inbound request-rate limiting.
//!
//! A single lock-free token bucket shared by every actix worker caps the
//! whole server at `limit` requests per second with a burst of `limit`.
//! Requests over budget are answered with `429 Too Many Requests` and never
//! reach the handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Instant;

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::RETRY_AFTER;
use actix_web::{Error, HttpResponse};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use serde_json::json;
use tracing::warn;

/// Fixed-point scale: one token is this many units.
const TOKEN: u64 = 1000;
const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Token bucket refilled one token at a time at `rate` per second.
#[derive(Debug)]
pub(crate) struct TokenBucket {
    capacity: u64,
    refill_nanos: u64,
    tokens: AtomicU64,
    last_refill: AtomicU64,
    start: Instant,
}

impl TokenBucket {
    /// A bucket starting full with `burst` tokens. A zero `rate` never
    /// refills.
    pub(crate) fn new(rate: u64, burst: u64) -> Self {
        let capacity = burst.saturating_mul(TOKEN);
        Self {
            capacity,
            refill_nanos: NANOS_PER_SECOND.checked_div(rate).unwrap_or(u64::MAX).max(1),
            tokens: AtomicU64::new(capacity),
            last_refill: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    /// Take one token if available.
    pub(crate) fn try_acquire(&self) -> bool {
        self.refill();
        self.tokens
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(TOKEN)
            })
            .is_ok()
    }

    fn refill(&self) {
        let now = u64::try_from(self.start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        let mut last = self.last_refill.load(Ordering::Acquire);
        loop {
            let intervals = now.saturating_sub(last) / self.refill_nanos;
            if intervals == 0 {
                return;
            }
            let advanced = last.saturating_add(intervals.saturating_mul(self.refill_nanos));
            match self.last_refill.compare_exchange_weak(
                last,
                advanced,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.add_tokens(intervals.saturating_mul(TOKEN));
                    return;
                }
                Err(observed) => last = observed,
            }
        }
    }

    fn add_tokens(&self, amount: u64) {
        // The closure always returns `Some`, so the update cannot fail.
        let _ = self
            .tokens
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(amount).min(self.capacity))
            });
    }
}

/// Middleware rejecting requests beyond `limit` per second.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use laff::middleware::InboundRateLimit;
///
/// let app = App::new().wrap(InboundRateLimit::per_second(10));
/// ```
#[derive(Clone)]
pub struct InboundRateLimit {
    bucket: Arc<TokenBucket>,
}

impl InboundRateLimit {
    /// Allow `limit` requests per second with a burst of `limit`.
    pub fn per_second(limit: u32) -> Self {
        let limit = u64::from(limit);
        Self {
            bucket: Arc::new(TokenBucket::new(limit, limit)),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for InboundRateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = InboundRateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(InboundRateLimitMiddleware {
            service,
            bucket: Arc::clone(&self.bucket),
        }))
    }
}

/// Service wrapper produced by [`InboundRateLimit`].
pub struct InboundRateLimitMiddleware<S> {
    service: S,
    bucket: Arc<TokenBucket>,
}

impl<S, B> Service<ServiceRequest> for InboundRateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if !self.bucket.try_acquire() {
            warn!(path = %req.path(), "inbound rate limit exceeded");
            let response = HttpResponse::TooManyRequests()
                .insert_header((RETRY_AFTER, "1"))
                .json(json!({ "status": "inbound rate limit exceeded" }));
            return Box::pin(ready(Ok(req.into_response(response).map_into_right_body())));
        }
        let fut = self.service.call(req);
        Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
    }
}
