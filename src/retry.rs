//! Bounded-attempt retry without backoff.
//!
//! Both ticket issuance and view export retry immediately: a trust ticket is
//! short-lived, so waiting between attempts only makes the next one more
//! likely to fail. The policy therefore only counts attempts, and the
//! combinator [`run_with_attempts`] decides per error through a
//! retryability predicate.
//!
//! # Example
//!
//! ```
//! use viz_export::retry::{RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::with_max_attempts(3);
//! assert_eq!(policy.should_retry(true, 1), RetryDecision::Retry { attempt: 2 });
//! assert!(matches!(
//!     policy.should_retry(true, 3),
//!     RetryDecision::DoNotRetry { .. }
//! ));
//! ```

use std::fmt::Display;
use std::future::Future;

use tracing::{debug, warn};

/// Default maximum attempts for an export.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Decision on whether to make another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Make another attempt immediately.
    Retry {
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Stop and surface the last error.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Attempt budget for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy allowing `max_attempts` total attempts (minimum 1).
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides what to do after `attempt` (1-indexed) failed.
    #[must_use]
    pub fn should_retry(&self, retryable: bool, attempt: u32) -> RetryDecision {
        if !retryable {
            return RetryDecision::DoNotRetry {
                reason: "error is not retryable".to_string(),
            };
        }
        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }
        RetryDecision::Retry {
            attempt: attempt + 1,
        }
    }
}

/// Final failure of [`run_with_attempts`].
#[derive(Debug)]
pub struct Exhausted<E> {
    /// Number of attempts actually made.
    pub attempts: u32,
    /// Error returned by the last attempt.
    pub last: E,
}

/// Runs `operation` until it succeeds, the error is not retryable, or the
/// policy's attempt budget is spent.
///
/// `operation` receives the 1-indexed attempt number.
///
/// # Errors
///
/// Returns [`Exhausted`] with the last error when no attempt succeeded.
pub async fn run_with_attempts<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    is_retryable: P,
    mut operation: F,
) -> Result<T, Exhausted<E>>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => match policy.should_retry(is_retryable(&error), attempt) {
                RetryDecision::Retry { attempt: next } => {
                    warn!(
                        attempt,
                        max_attempts = policy.max_attempts(),
                        error = %error,
                        "attempt failed, retrying"
                    );
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(attempt, %reason, "giving up");
                    return Err(Exhausted {
                        attempts: attempt,
                        last: error,
                    });
                }
            },
        }
    }
}
