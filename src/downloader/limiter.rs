//! Outbound request rate limiting.

use crate::error::{Error, Result};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

/// Token bucket shared by every fetch of a downloader.
///
/// Replenishes at `rate` tokens per second and holds at most `burst`.
pub(crate) struct RequestLimiter {
    inner: Option<DefaultDirectRateLimiter>,
}

impl fmt::Debug for RequestLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLimiter")
            .field("limited", &self.is_limited())
            .finish()
    }
}

impl RequestLimiter {
    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self { inner: None }
    }

    pub fn new(rate: Option<f64>, burst: u32) -> Result<Self> {
        let Some(rate) = rate else {
            return Ok(Self::unlimited());
        };
        let period = Duration::try_from_secs_f64(1.0 / rate)
            .ok()
            .filter(|p| !p.is_zero())
            .ok_or_else(|| Error::Config(format!("unusable rate limit {} req/s", rate)))?;
        let burst = NonZeroU32::new(burst)
            .ok_or_else(|| Error::Config("rate limit burst must be at least 1".into()))?;
        let quota = Quota::with_period(period)
            .ok_or_else(|| Error::Config(format!("unusable rate limit {} req/s", rate)))?
            .allow_burst(burst);
        Ok(Self {
            inner: Some(RateLimiter::direct(quota)),
        })
    }

    /// Wait for the next token.
    pub async fn until_ready(&self) {
        if let Some(limiter) = &self.inner {
            limiter.until_ready().await;
        }
    }

    pub fn is_limited(&self) -> bool {
        self.inner.is_some()
    }
}
