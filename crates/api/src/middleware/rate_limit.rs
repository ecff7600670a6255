//! Per-user rate limiting for the import endpoints.

use std::num::NonZeroU32;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use serde_json::json;
use uuid::Uuid;

use crate::app::AppState;
use crate::extractors::UserAuth;

type UserRateLimiter = RateLimiter<Uuid, DefaultKeyedStateStore<Uuid>, DefaultClock>;

const FALLBACK_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(10) {
    Some(v) => v,
    None => unreachable!(),
};

/// Keyed limiter shared by every import route.
pub struct RateLimiterState {
    limiter: UserRateLimiter,
    per_minute: u32,
}

impl RateLimiterState {
    /// A zero limit falls back to 10 requests per minute.
    pub fn new(per_minute: u32) -> Self {
        let rate = NonZeroU32::new(per_minute).unwrap_or(FALLBACK_PER_MINUTE);
        Self {
            limiter: RateLimiter::keyed(Quota::per_minute(rate)),
            per_minute: rate.get(),
        }
    }

    pub fn per_minute(&self) -> u32 {
        self.per_minute
    }

    /// `Err(retry_after_secs)` when `user_id` is over its quota.
    pub fn check(&self, user_id: Uuid) -> Result<(), u64> {
        self.limiter.check_key(&user_id).map_err(|not_until| {
            not_until
                .wait_time_from(self.limiter.clock().now())
                .as_secs()
                .max(1)
        })
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("per_minute", &self.per_minute)
            .field("tracked_users", &self.limiter.len())
            .finish()
    }
}

/// Rejects the request with 429 once the caller exceeds
/// `security.import_rate_limit_per_minute`.
///
/// Authenticates the caller first; the actor is cached in request
/// extensions so the handler does not repeat the lookup.
pub async fn import_rate_limit(
    State(state): State<AppState>,
    user: UserAuth,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Err(retry_after) = state.rate_limiter.check(user.user_id) {
        tracing::warn!(user_id = %user.user_id, retry_after, "Import rate limit exceeded");
        return rate_limited_response(state.rate_limiter.per_minute(), retry_after);
    }
    next.run(req).await
}

fn rate_limited_response(limit: u32, retry_after: u64) -> Response {
    let body = json!({
        "error": "rate_limited",
        "message": format!("Rate limit of {} requests/minute exceeded", limit),
        "retryAfter": retry_after
    });
    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhaustion_per_user() {
        let state = RateLimiterState::new(2);
        let user = Uuid::new_v4();
        assert!(state.check(user).is_ok());
        assert!(state.check(user).is_ok());
        let retry = state.check(user).unwrap_err();
        assert!(retry >= 1);
    }

    #[test]
    fn test_users_are_independent() {
        let state = RateLimiterState::new(1);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(state.check(a).is_ok());
        assert!(state.check(a).is_err());
        assert!(state.check(b).is_ok());
    }

    #[test]
    fn test_zero_limit_falls_back() {
        let state = RateLimiterState::new(0);
        assert_eq!(state.per_minute(), 10);
        assert!(format!("{:?}", state).contains("per_minute: 10"));
    }

    #[test]
    fn test_rate_limited_response() {
        let response = rate_limited_response(10, 42);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}
