//! Bounded retry with a fixed inter-attempt delay.
//!
//! Every attempt, the first one included, waits [`RetryPolicy::delay`] before
//! it is dispatched, so requests leave at a steady cadence no matter how fast
//! the upstream fails. Retries are strictly sequential.
//!
//! Errors are classified into a [`FailureType`]: only
//! [`FailureType::Transient`] failures are retried, everything else is
//! returned on first occurrence.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use photobucket_core::fetch::{FetchError, RetryPolicy, run_with_retry};
//!
//! # async fn example() -> Result<(), FetchError> {
//! let policy = RetryPolicy::new(3, Duration::from_millis(2000));
//! let body = run_with_retry(&policy, "album page", |attempt| async move {
//!     println!("attempt {attempt}");
//!     Ok::<_, FetchError>("<html></html>".to_string())
//! })
//! .await?;
//! # drop(body);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::FetchError;

/// Default number of attempts per logical request.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Default delay before each request to the site and its API (2 seconds).
pub const DEFAULT_SITE_DELAY: Duration = Duration::from_millis(2000);

/// Default delay before each request to the media servers (500 ms).
pub const DEFAULT_MEDIA_DELAY: Duration = Duration::from_millis(500);

/// Classification of fetch failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: connection reset, timeout, any HTTP error status.
    Transient,

    /// Failure that indicates a structural or local problem.
    ///
    /// Examples: undecodable JSON, invalid URL, disk full.
    Permanent,
}

/// Attempt count and fixed delay for one class of requests.
///
/// The site/API and the media CDN each get their own policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_SITE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy. `attempts` below 1 is clamped to 1.
    #[must_use]
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// Maximum number of attempts, including the first.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay waited before every attempt.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Classifies a fetch error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Network | Transient |
/// | Timeout | Transient |
/// | HttpStatus (any) | Transient |
/// | Parse | Permanent |
/// | Io | Permanent |
/// | InvalidUrl | Permanent |
/// | Client | Permanent |
#[must_use]
pub fn classify_error(error: &FetchError) -> FailureType {
    match error {
        FetchError::Network { .. } | FetchError::Timeout { .. } | FetchError::HttpStatus { .. } => {
            FailureType::Transient
        }
        FetchError::Parse { .. }
        | FetchError::Io { .. }
        | FetchError::InvalidUrl { .. }
        | FetchError::Client { .. } => FailureType::Permanent,
    }
}

/// Runs `task` under `policy`, returning the first success or the last error.
///
/// `task` receives the 1-based attempt number. `label` is only used for logs.
///
/// # Errors
///
/// Returns the first permanent error, or the last transient error once all
/// attempts are spent.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut task: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        if !policy.delay.is_zero() {
            tokio::time::sleep(policy.delay).await;
        }
        debug!(label, attempt, max = policy.attempts, "dispatching");

        let error = match task(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if classify_error(&error) == FailureType::Permanent {
            debug!(label, attempt, error = %error, "permanent failure, not retrying");
            return Err(error);
        }
        if attempt >= policy.attempts {
            warn!(label, attempt, error = %error, "attempts exhausted");
            return Err(error);
        }
        warn!(
            label,
            attempt,
            next_attempt = attempt + 1,
            delay_ms = policy.delay.as_millis(),
            error = %error,
            "transient failure, retrying"
        );
    }
}
