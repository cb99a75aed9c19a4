//! Tiered retry for flaky upstream endpoints.
//!
//! A policy is a list of tiers (here: request window sizes in hours) tried
//! in order, each attempted up to `max_attempts_per_tier` times. Retryable
//! failures move on to the next attempt; anything else aborts immediately.

use std::future::Future;

use crate::errors::UpstreamError;

/// HTTP statuses that indicate a gateway hiccup worth retrying.
pub const GATEWAY_STATUSES: &[u16] = &[502, 503, 504];

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts_per_tier: u32,
    pub tiers: Vec<u32>,
    pub retryable_statuses: &'static [u16],
}

impl RetryPolicy {
    /// Hourly predictions: shrink the window 36 → 30 → 24 h, two tries each.
    pub fn hourly_predictions() -> Self {
        Self {
            max_attempts_per_tier: 2,
            tiers: vec![36, 30, 24],
            retryable_statuses: GATEWAY_STATUSES,
        }
    }

    /// High/low events: a single 48 h window, two tries.
    pub fn high_low_events() -> Self {
        Self {
            max_attempts_per_tier: 2,
            tiers: vec![48],
            retryable_statuses: GATEWAY_STATUSES,
        }
    }

    pub fn max_total_attempts(&self) -> u32 {
        self.max_attempts_per_tier * self.tiers.len() as u32
    }
}

/// Run `op` with each tier value until it succeeds.
///
/// Returns the first success, the first non-retryable error, or the last
/// retryable error once every tier and attempt is used up.
pub async fn retry_with_policy<T, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, UpstreamError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let mut last_err = None;

    for &tier in &policy.tiers {
        for attempt in 1..=policy.max_attempts_per_tier {
            match op(tier).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable(policy.retryable_statuses) => {
                    tracing::debug!(
                        "attempt {}/{} for tier {} failed, retrying: {}",
                        attempt,
                        policy.max_attempts_per_tier,
                        tier,
                        e
                    );
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    Err(last_err.unwrap_or(UpstreamError::Malformed {
        service: "retry",
        message: "retry policy has no tiers".to_string(),
    }))
}
