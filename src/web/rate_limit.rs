//! Per-client request rate limiting.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::debug;

use super::HttpError;

/// Tracked clients above which idle ones are dropped.
const RETAIN_THRESHOLD: usize = 10_000;

/// Shared state of the [`rate_limit`] layer: a keyed GCRA limiter per client address.
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<DefaultKeyedRateLimiter<IpAddr>>,
    max: NonZeroU32,
}

impl RateLimit {
    /// Allows `max` requests per minute per client, refilling evenly over the minute.
    pub fn per_minute(max: NonZeroU32) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(max))),
            max,
        }
    }

    pub fn max(&self) -> NonZeroU32 {
        self.max
    }

    /// Records one request from `client`; on refusal returns the seconds until the next slot.
    pub fn check(&self, client: IpAddr) -> Result<(), u64> {
        let result = self.limiter.check_key(&client).map_err(|not_until| {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            wait.as_secs().max(1)
        });
        if self.limiter.len() > RETAIN_THRESHOLD {
            self.limiter.retain_recent();
        }
        result
    }
}

/// The socket peer when known, else the first `x-forwarded-for` hop.
fn client_ip(peer: Option<SocketAddr>, headers: &HeaderMap) -> IpAddr {
    if let Some(peer) = peer {
        return peer.ip();
    }
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Middleware for `axum::middleware::from_fn_with_state`; answers 429 once a client is over its quota.
pub async fn rate_limit(
    State(limit): State<RateLimit>,
    peer: Option<ConnectInfo<SocketAddr>>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_ip(peer.map(|ConnectInfo(addr)| addr), req.headers());
    match limit.check(client) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            debug!(%client, retry_after, "rate limit exceeded");
            let error = HttpError::new(
                StatusCode::TOO_MANY_REQUESTS,
                format!("Rate limit exceeded, retry in {} seconds", retry_after),
            );
            let mut response = error.into_response();
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
    }
}
