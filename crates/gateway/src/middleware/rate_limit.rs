//! Rate limiting middleware using token bucket algorithm
//!
//! A single shared bucket for the research routes. Signed links land here
//! from email clients, so legitimate bursts are small; anything past the
//! quota gets the standard JSON error body with a 429.

use axum::{extract::Request, middleware::Next, response::Response};
use deepscout_common::errors::AppError;
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter using governor crate
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Create a new rate limiter
///
/// A zero quota or burst is clamped to one rather than rejected, so a
/// misconfigured limit throttles hard instead of panicking at startup.
pub fn create_rate_limiter(requests_per_second: u32, burst: u32) -> Arc<GlobalRateLimiter> {
    let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(per_second);
    let quota = Quota::per_second(per_second).allow_burst(burst);

    Arc::new(RateLimiter::direct(quota))
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    request: Request,
    next: Next,
    limiter: Arc<GlobalRateLimiter>,
    limit: u32,
) -> Result<Response, AppError> {
    match limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!(limit, "Rate limit exceeded on research routes");
            Err(AppError::RateLimited { limit })
        }
    }
}
