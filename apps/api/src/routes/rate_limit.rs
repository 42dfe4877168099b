use std::num::NonZeroU32;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};

use crate::errors::AppError;
use crate::routes::auth::bearer_token;
use crate::state::AppState;

/// Per-caller request quota, keyed by bearer key.
pub struct SearchRateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
    clock: DefaultClock,
}

impl SearchRateLimiter {
    pub fn per_minute(requests: NonZeroU32) -> Self {
        Self {
            limiter: RateLimiter::keyed(Quota::per_minute(requests)),
            clock: DefaultClock::default(),
        }
    }

    /// Takes one request from `key`'s quota, or returns the seconds until one frees up.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.limiter.check_key(&key.to_string()).map_err(|not_until| {
            not_until
                .wait_time_from(self.clock.now())
                .as_secs()
                .max(1)
        })
    }
}

/// Runs after `require_api_key`, so the bearer key is present and valid.
pub async fn limit_search(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = bearer_token(request.headers()).unwrap_or_default();
    if let Err(retry_after_secs) = state.search_limiter.check(key) {
        tracing::warn!("Search rate limit hit, retry in {retry_after_secs}s");
        return Err(AppError::RateLimited { retry_after_secs });
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(per_minute: u32) -> SearchRateLimiter {
        SearchRateLimiter::per_minute(NonZeroU32::new(per_minute).unwrap())
    }

    #[test]
    fn test_quota_exhausts_after_limit() {
        let limiter = limiter(3);
        for _ in 0..3 {
            assert!(limiter.check("key-one").is_ok());
        }
        let retry_after = limiter.check("key-one").unwrap_err();
        assert!((1..=60).contains(&retry_after));
    }

    #[test]
    fn test_keys_have_separate_quotas() {
        let limiter = limiter(1);
        assert!(limiter.check("key-one").is_ok());
        assert!(limiter.check("key-one").is_err());
        assert!(limiter.check("key-two").is_ok());
    }
}
