//! Retry policy for calls against the event source
//!
//! [`RetryPolicy`] is a plain value: attempt budget, delay strategy and a
//! predicate deciding which errors are worth retrying. It drives the
//! `backoff` crate underneath. List mode uses the bounded default; watch
//! mode uses [`RetryPolicy::reconnecting`], which never gives up.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backoff::backoff::Backoff;
use tracing::{info, warn};

use crate::source::SourceError;
use crate::{Error, Result};

/// Attempt budget of a policy that never runs out.
pub const UNLIMITED_ATTEMPTS: u32 = u32::MAX;

/// Wait between two attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayStrategy {
    /// Same delay after every failure
    Fixed(Duration),
    /// Starts at `initial`, doubles after every failure, never exceeds `max`
    Capped { initial: Duration, max: Duration },
}

impl DelayStrategy {
    /// Delay after the `failures`-th failed attempt (1-based).
    pub fn delay_after(&self, failures: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Capped { initial, max } => {
                let factor = 2u32.saturating_pow(failures.saturating_sub(1));
                initial.saturating_mul(factor).min(max)
            }
        }
    }
}

/// How often and how patiently to retry a failing call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: DelayStrategy,
    pub retryable: fn(&SourceError) -> bool,
}

impl Default for RetryPolicy {
    /// Five attempts, two seconds apart, retrying transient errors only.
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: DelayStrategy::Fixed(Duration::from_secs(2)),
            retryable: SourceError::is_transient,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: DelayStrategy) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            ..Self::default()
        }
    }

    /// Retry every failure, permanent ones included, until the call succeeds.
    pub fn persistent(delay: DelayStrategy) -> Self {
        Self {
            max_attempts: UNLIMITED_ATTEMPTS,
            delay,
            retryable: |_| true,
        }
    }

    /// Watch-mode subscribing: starts at two seconds, doubles up to thirty.
    pub fn reconnecting() -> Self {
        Self::persistent(DelayStrategy::Capped {
            initial: Duration::from_secs(2),
            max: Duration::from_secs(30),
        })
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_attempts == UNLIMITED_ATTEMPTS
    }

    pub fn with_retryable(mut self, retryable: fn(&SourceError) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    fn backoff(&self) -> AttemptBudget {
        AttemptBudget {
            max_attempts: (!self.is_unlimited()).then_some(self.max_attempts),
            delay: self.delay,
            failures: 0,
        }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent.
    ///
    /// # Errors
    ///
    /// - [`Error::Source`] for a non-retryable failure, returned immediately
    /// - [`Error::RetryExhausted`] once every attempt failed
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, SourceError>>,
    {
        let attempts = AtomicU32::new(0);
        let retryable = self.retryable;

        let result = backoff::future::retry_notify(
            self.backoff(),
            || {
                attempts.fetch_add(1, Ordering::Relaxed);
                let pending = call();
                async move {
                    pending.await.map_err(|e| {
                        if retryable(&e) {
                            backoff::Error::transient(e)
                        } else {
                            backoff::Error::permanent(e)
                        }
                    })
                }
            },
            |e: SourceError, wait: Duration| {
                info!(
                    operation,
                    attempt = attempts.load(Ordering::Relaxed),
                    error = %e,
                    "Retrying: attempt ended with an error"
                );
                info!("Waiting {:?} to retry...", wait);
            },
        )
        .await;

        result.map_err(|source| {
            let attempts = attempts.load(Ordering::Relaxed);
            if retryable(&source) {
                warn!(operation, attempts, error = %source, "Retry budget exhausted");
                Error::RetryExhausted {
                    operation: operation.to_string(),
                    attempts,
                    source,
                }
            } else {
                Error::Source(source)
            }
        })
    }
}

/// `Backoff` that yields the configured delay until the attempt budget runs out.
#[derive(Debug)]
struct AttemptBudget {
    /// `None` never runs out
    max_attempts: Option<u32>,
    delay: DelayStrategy,
    failures: u32,
}

impl Backoff for AttemptBudget {
    fn reset(&mut self) {
        self.failures = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.failures = self.failures.saturating_add(1);
        if self.max_attempts.is_some_and(|max| self.failures >= max) {
            return None;
        }
        Some(self.delay.delay_after(self.failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 100)]
    #[case(2, 200)]
    #[case(3, 400)]
    #[case(4, 500)]
    #[case(10, 500)]
    fn capped_delay_doubles_up_to_max(#[case] failures: u32, #[case] millis: u64) {
        let strategy = DelayStrategy::Capped {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(500),
        };
        assert_eq!(strategy.delay_after(failures), Duration::from_millis(millis));
    }

    #[test]
    fn budget_allows_max_attempts_minus_one_waits() {
        let mut budget = RetryPolicy::new(5, DelayStrategy::Fixed(Duration::from_secs(2))).backoff();
        let waits: Vec<_> = std::iter::from_fn(|| budget.next_backoff()).collect();
        assert_eq!(waits, vec![Duration::from_secs(2); 4]);

        budget.reset();
        assert_eq!(budget.next_backoff(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn persistent_budget_never_runs_out() {
        let mut budget = RetryPolicy::reconnecting().backoff();
        let waits: Vec<_> = (0..100).map(|_| budget.next_backoff()).collect();

        assert!(waits.iter().all(Option::is_some));
        assert_eq!(waits[0], Some(Duration::from_secs(2)));
        assert_eq!(waits[99], Some(Duration::from_secs(30)));
    }

    #[test]
    fn persistent_policy_retries_permanent_errors() {
        let policy = RetryPolicy::persistent(DelayStrategy::Fixed(Duration::from_millis(1)));
        assert!(policy.is_unlimited());
        assert!((policy.retryable)(&SourceError::permanent("forbidden")));
        assert!(!RetryPolicy::default().is_unlimited());
    }

    #[tokio::test]
    async fn persistent_policy_outlasts_a_long_outage() {
        let policy = RetryPolicy::persistent(DelayStrategy::Fixed(Duration::from_millis(1)));
        let calls = AtomicU32::new(0);

        let result = policy
            .run("subscribe", || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 20 {
                        Err(SourceError::permanent("forbidden"))
                    } else {
                        Ok(call)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 20);
        assert_eq!(calls.load(Ordering::SeqCst), 21);
    }

    #[test]
    fn default_policy_matches_list_mode_contract() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, DelayStrategy::Fixed(Duration::from_secs(2)));
        assert!((policy.retryable)(&SourceError::transient("timeout")));
        assert!(!(policy.retryable)(&SourceError::permanent("bad config")));
    }
}
