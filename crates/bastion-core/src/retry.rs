//! Bounded retry with exponential backoff for RPC calls

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{NodeError, SwapError};

/// Errors that know whether a retry could help
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for NodeError {
    fn is_transient(&self) -> bool {
        NodeError::is_transient(self)
    }
}

impl Transient for SwapError {
    fn is_transient(&self) -> bool {
        SwapError::is_transient(self)
    }
}

/// Retry policy for network-bound calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Exponential backoff multiplier (1.0 = fixed delay, >1.0 = exponential)
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 250,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            backoff_multiplier: 1.0,
        }
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::immediate(1)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let millis = self.base_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(millis.max(0.0) as u64)
    }
}

/// Run `op` until it succeeds, fails permanently, or the policy is exhausted.
///
/// Only errors reporting `is_transient()` are retried.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Display,
{
    retry_if(policy, label, |e: &E| e.is_transient(), op).await
}

/// Like [`retry`], with the caller deciding which errors are worth another
/// attempt. State-changing sends use this to avoid re-broadcasting.
pub async fn retry_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    label: &str,
    should_retry: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if should_retry(&e) && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}), retrying in {}ms: {}",
                    label,
                    attempt,
                    max_attempts,
                    delay.as_millis(),
                    e
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_backoff() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay_ms: 100,
            backoff_multiplier: 2.0,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_immediate_has_no_delay() {
        let policy = RetryPolicy::immediate(3);
        assert!(policy.delay_for(1).is_zero());
        assert!(policy.delay_for(7).is_zero());
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<u32, NodeError> =
            retry(&RetryPolicy::immediate(3), "test", || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(NodeError::RateLimited)
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), NodeError> = retry(&RetryPolicy::immediate(2), "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(NodeError::Timeout { secs: 1 })
        })
        .await;
        assert!(matches!(result, Err(NodeError::Timeout { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_if_stops_on_unsafe_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), NodeError> = retry_if(
            &RetryPolicy::immediate(5),
            "send",
            NodeError::is_safe_to_resend,
            || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 1 {
                    Err(NodeError::RateLimited)
                } else {
                    Err(NodeError::Timeout { secs: 1 })
                }
            },
        )
        .await;
        assert!(matches!(result, Err(NodeError::Timeout { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), SwapError> = retry(&RetryPolicy::immediate(5), "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(SwapError::UserRejected)
        })
        .await;
        assert!(matches!(result, Err(SwapError::UserRejected)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
