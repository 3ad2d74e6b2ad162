//! Pacing between entries and retries of individual page loads.
//!
//! # Pacing
//!
//! [`DelayPolicy`] sleeps for a uniformly random duration after every
//! processed entry, success or failure. It never adapts: repeated failures do
//! not lengthen it and success does not skip it.
//!
//! # Page retries
//!
//! [`RetryPolicy`] wraps one page load (navigate, then wait for each ready
//! selector). With `max_retries = 0` a failure is returned immediately.
//! Otherwise the delay before retry `n` is:
//!
//! ```text
//! delay = min(base_delay * 2^(n-1), max_delay) + random_jitter(0..=250ms)
//! ```

use crate::config::{DelayConfig, RetryConfig};
use crate::error::FetchError;
use crate::fetcher::PageFetcher;
use rand::{Rng, rng};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Randomized fixed-interval pause between processed entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayPolicy {
    min: Duration,
    max: Duration,
}

impl DelayPolicy {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Draw the next pause length.
    pub fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let ms = rng().random_range(self.min.as_millis() as u64..=self.max.as_millis() as u64);
        Duration::from_millis(ms)
    }

    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis() as u64, "Pausing before next entry");
            sleep(delay).await;
        }
    }
}

impl From<DelayConfig> for DelayPolicy {
    fn from(c: DelayConfig) -> Self {
        Self::new(Duration::from_millis(c.min_ms), Duration::from_millis(c.max_ms))
    }
}

/// Bounded exponential backoff for page loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryConfig::default().into()
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(c: RetryConfig) -> Self {
        Self {
            max_retries: c.max_retries,
            base_delay: Duration::from_millis(c.base_delay_ms),
            max_delay: Duration::from_millis(c.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Backoff before retry number `attempt` (1-based), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << shift).min(self.max_delay)
    }

    /// Navigate to `url` and wait for every `ready` selector, retrying
    /// transient failures up to `max_retries` times.
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn load_page<F: PageFetcher>(
        &self,
        fetcher: &mut F,
        url: &str,
        ready: &[&str],
        timeout: Duration,
    ) -> Result<(), FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            match try_load(fetcher, url, ready, timeout).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries || !e.is_transient() {
                        if self.max_retries > 0 {
                            error!(
                                attempt,
                                max = self.max_retries,
                                elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                                error = %e,
                                "Page load exhausted retries"
                            );
                        }
                        return Err(e);
                    }

                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = self.backoff(attempt) + Duration::from_millis(jitter_ms);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "Page load failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

async fn try_load<F: PageFetcher>(
    fetcher: &mut F,
    url: &str,
    ready: &[&str],
    timeout: Duration,
) -> Result<(), FetchError> {
    fetcher.navigate(url, timeout).await?;
    for selector in ready {
        fetcher.wait_for(selector, timeout).await?;
    }
    Ok(())
}
