//! Retry and backoff policy.
//!
//! One logical request moves through [`AttemptState`]:
//!
//! ```text
//! Attempting --success--------------------------------> Done
//! Attempting --failure, retryable, budget left--------> Waiting --> Attempting
//! Attempting --failure, not retryable or no budget----> Failed
//! ```
//!
//! A failure is retryable when it is a timeout or connection failure, or
//! when its HTTP status is in the policy's retryable set.

use crate::error::{ConfigError, TransportError};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Largest accepted retry limit.
pub const MAX_RETRY_LIMIT: u32 = 10;
/// Smallest accepted retryable status code.
pub const MIN_STATUS_CODE: u16 = 100;
/// Largest accepted retryable status code.
pub const MAX_STATUS_CODE: u16 = 599;
/// Status codes retried by default.
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 5] = [408, 429, 502, 503, 504];

/// Caller-supplied backoff: `(attempt, status, last transport error) -> delay`.
pub type BackoffFn = dyn Fn(u32, Option<u16>, Option<&TransportError>) -> Duration + Send + Sync;

/// How the wait before a retry grows with the attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// `base_delay` every time.
    Fixed,
    /// `base_delay * (attempt + 1)`.
    Linear,
    /// `base_delay * 2^attempt`.
    Exponential,
    /// The caller's backoff function.
    Custom,
}

/// Lifecycle of one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// A transport call is in flight.
    Attempting,
    /// Sleeping before the next attempt.
    Waiting,
    /// A 2xx response was received.
    Done,
    /// The last failure is final.
    Failed,
}

/// Why an attempt failed.
#[derive(Debug, Clone, Copy)]
pub enum AttemptFailure<'a> {
    /// No response was received.
    Transport(&'a TransportError),
    /// The service answered with a non-2xx status.
    Status {
        /// HTTP status.
        code: u16,
        /// Wait requested by the service through `Retry-After`.
        retry_after: Option<Duration>,
    },
}

impl AttemptFailure<'_> {
    fn status(&self) -> Option<u16> {
        match self {
            AttemptFailure::Status { code, .. } => Some(*code),
            AttemptFailure::Transport(_) => None,
        }
    }

    fn transport_error(&self) -> Option<&TransportError> {
        match self {
            AttemptFailure::Transport(err) => Some(err),
            AttemptFailure::Status { .. } => None,
        }
    }
}

/// Retry configuration for requests.
///
/// Setters validate before they mutate, so a rejected change leaves the
/// previous valid state untouched. Once configured, the policy is shared
/// read-only by every request of a client.
#[derive(Clone)]
pub struct RetryPolicy {
    enabled: bool,
    retry_limit: u32,
    base_delay: Duration,
    max_delay: Duration,
    strategy: BackoffStrategy,
    retryable_status_codes: BTreeSet<u16>,
    custom_backoff: Option<Arc<BackoffFn>>,
}

impl RetryPolicy {
    /// Creates the default policy: 3 retries, 1 s exponential backoff
    /// capped at 30 s, retrying 408, 429, 502, 503 and 504.
    pub fn new() -> Self {
        Self {
            enabled: true,
            retry_limit: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            strategy: BackoffStrategy::Exponential,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
            custom_backoff: None,
        }
    }

    /// Creates a policy that never retries.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Sets how many retries follow the first attempt.
    pub fn set_retry_limit(&mut self, limit: u32) -> Result<&mut Self, ConfigError> {
        if limit > MAX_RETRY_LIMIT {
            return Err(ConfigError::RetryLimitOutOfRange {
                limit,
                max: MAX_RETRY_LIMIT,
            });
        }
        self.retry_limit = limit;
        Ok(self)
    }

    /// Sets the base delay the strategy scales.
    pub fn set_base_delay(&mut self, delay: Duration) -> &mut Self {
        self.base_delay = delay;
        self
    }

    /// Caps computed delays (the custom strategy is not capped).
    pub fn set_max_delay(&mut self, delay: Duration) -> &mut Self {
        self.max_delay = delay;
        self
    }

    /// Selects a built-in strategy.
    ///
    /// Selecting [`BackoffStrategy::Custom`] requires a function set
    /// through [`set_custom_backoff`](Self::set_custom_backoff) first.
    pub fn set_backoff_strategy(
        &mut self,
        strategy: BackoffStrategy,
    ) -> Result<&mut Self, ConfigError> {
        if strategy == BackoffStrategy::Custom && self.custom_backoff.is_none() {
            return Err(ConfigError::MissingCustomBackoff);
        }
        self.strategy = strategy;
        Ok(self)
    }

    /// Installs a custom backoff function and switches to [`BackoffStrategy::Custom`].
    pub fn set_custom_backoff<F>(&mut self, backoff: F) -> &mut Self
    where
        F: Fn(u32, Option<u16>, Option<&TransportError>) -> Duration + Send + Sync + 'static,
    {
        self.custom_backoff = Some(Arc::new(backoff));
        self.strategy = BackoffStrategy::Custom;
        self
    }

    /// Replaces the retryable status codes.
    ///
    /// Every code must lie in `100..=599`; one bad code rejects the batch.
    pub fn set_retryable_status_codes<I>(&mut self, codes: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = u16>,
    {
        let codes: BTreeSet<u16> = codes.into_iter().collect();
        if let Some(&code) = codes
            .iter()
            .find(|c| !(MIN_STATUS_CODE..=MAX_STATUS_CODE).contains(*c))
        {
            return Err(ConfigError::StatusCodeOutOfRange {
                code,
                min: MIN_STATUS_CODE,
                max: MAX_STATUS_CODE,
            });
        }
        self.retryable_status_codes = codes;
        Ok(self)
    }

    /// Turns retries on or off.
    pub fn set_enabled(&mut self, enabled: bool) -> &mut Self {
        self.enabled = enabled;
        self
    }

    /// Returns true if retries are on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the retry limit.
    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Returns the base delay.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the delay cap.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Returns the active strategy.
    pub fn backoff_strategy(&self) -> BackoffStrategy {
        self.strategy
    }

    /// Returns an independent copy of the retryable status codes.
    pub fn retryable_status_codes(&self) -> BTreeSet<u16> {
        self.retryable_status_codes.clone()
    }

    /// Returns true if `failure` may be retried at all.
    pub fn is_retryable(&self, failure: &AttemptFailure<'_>) -> bool {
        match failure {
            AttemptFailure::Transport(err) => err.is_retryable(),
            AttemptFailure::Status { code, .. } => self.retryable_status_codes.contains(code),
        }
    }

    /// Computes the wait before retry number `attempt` (0 for the first retry).
    pub fn delay_for_attempt(
        &self,
        attempt: u32,
        status: Option<u16>,
        error: Option<&TransportError>,
    ) -> Duration {
        let delay = match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Linear => self
                .base_delay
                .saturating_mul(attempt.saturating_add(1)),
            BackoffStrategy::Exponential => {
                let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
            BackoffStrategy::Custom => {
                return match &self.custom_backoff {
                    Some(backoff) => backoff(attempt, status, error),
                    None => self.base_delay,
                };
            }
        };
        delay.min(self.max_delay)
    }

    /// Decides whether the failed attempt number `attempt` (0-based) is
    /// followed by another, and after how long.
    ///
    /// Returns `None` when the request should fail with this outcome.
    pub fn next_delay(&self, attempt: u32, failure: &AttemptFailure<'_>) -> Option<Duration> {
        if !self.enabled || attempt >= self.retry_limit || !self.is_retryable(failure) {
            return None;
        }
        let delay = self.delay_for_attempt(attempt, failure.status(), failure.transport_error());
        match failure {
            AttemptFailure::Status {
                retry_after: Some(requested),
                ..
            } if *requested > delay => Some((*requested).min(self.max_delay.max(delay))),
            _ => Some(delay),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("enabled", &self.enabled)
            .field("retry_limit", &self.retry_limit)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("strategy", &self.strategy)
            .field("retryable_status_codes", &self.retryable_status_codes)
            .field("custom_backoff", &self.custom_backoff.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> AttemptFailure<'static> {
        AttemptFailure::Status {
            code,
            retry_after: None,
        }
    }

    #[test]
    fn defaults() {
        let policy = RetryPolicy::default();
        assert!(policy.is_enabled());
        assert_eq!(policy.retry_limit(), 3);
        assert_eq!(policy.backoff_strategy(), BackoffStrategy::Exponential);
        assert_eq!(
            policy.retryable_status_codes(),
            DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect()
        );
    }

    #[test]
    fn retry_limit_bounds() {
        let mut policy = RetryPolicy::new();
        for limit in 0..=MAX_RETRY_LIMIT {
            policy.set_retry_limit(limit).unwrap();
            assert_eq!(policy.retry_limit(), limit);
        }

        policy.set_retry_limit(4).unwrap();
        let err = policy.set_retry_limit(11).unwrap_err();
        assert_eq!(err, ConfigError::RetryLimitOutOfRange { limit: 11, max: 10 });
        assert_eq!(policy.retry_limit(), 4);
    }

    #[test]
    fn one_bad_status_code_rejects_the_batch() {
        let mut policy = RetryPolicy::new();
        let err = policy
            .set_retryable_status_codes([500, 99, 503])
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::StatusCodeOutOfRange {
                code: 99,
                min: 100,
                max: 599
            }
        );
        assert_eq!(
            policy.retryable_status_codes(),
            DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect()
        );

        assert!(policy.set_retryable_status_codes([600]).is_err());
        policy.set_retryable_status_codes([100, 599]).unwrap();
        assert_eq!(policy.retryable_status_codes(), [100, 599].into_iter().collect());
    }

    #[test]
    fn status_code_getter_returns_a_copy() {
        let policy = RetryPolicy::new();
        let mut codes = policy.retryable_status_codes();
        codes.insert(500);
        codes.remove(&429);
        assert!(!policy.retryable_status_codes().contains(&500));
        assert!(policy.retryable_status_codes().contains(&429));
    }

    #[test]
    fn custom_backoff_forces_custom_strategy() {
        for strategy in [
            BackoffStrategy::Fixed,
            BackoffStrategy::Linear,
            BackoffStrategy::Exponential,
        ] {
            let mut policy = RetryPolicy::new();
            policy.set_backoff_strategy(strategy).unwrap();
            policy.set_custom_backoff(|attempt, _, _| Duration::from_millis(7 * u64::from(attempt)));
            assert_eq!(policy.backoff_strategy(), BackoffStrategy::Custom);
            assert_eq!(policy.delay_for_attempt(3, None, None), Duration::from_millis(21));
        }
    }

    #[test]
    fn custom_strategy_without_function_is_rejected() {
        let mut policy = RetryPolicy::new();
        policy.set_backoff_strategy(BackoffStrategy::Linear).unwrap();
        assert_eq!(
            policy.set_backoff_strategy(BackoffStrategy::Custom).unwrap_err(),
            ConfigError::MissingCustomBackoff
        );
        assert_eq!(policy.backoff_strategy(), BackoffStrategy::Linear);
    }

    #[test]
    fn delay_by_strategy() {
        let mut policy = RetryPolicy::new();
        policy
            .set_base_delay(Duration::from_millis(100))
            .set_max_delay(Duration::from_secs(60));

        policy.set_backoff_strategy(BackoffStrategy::Fixed).unwrap();
        assert_eq!(policy.delay_for_attempt(0, None, None), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(4, None, None), Duration::from_millis(100));

        policy.set_backoff_strategy(BackoffStrategy::Linear).unwrap();
        assert_eq!(policy.delay_for_attempt(0, None, None), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2, None, None), Duration::from_millis(300));

        policy.set_backoff_strategy(BackoffStrategy::Exponential).unwrap();
        assert_eq!(policy.delay_for_attempt(0, None, None), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(3, None, None), Duration::from_millis(800));
    }

    #[test]
    fn delay_respects_max() {
        let mut policy = RetryPolicy::new();
        policy
            .set_base_delay(Duration::from_secs(1))
            .set_max_delay(Duration::from_secs(5));
        assert_eq!(policy.delay_for_attempt(10, None, None), Duration::from_secs(5));
        assert_eq!(policy.delay_for_attempt(40, None, None), Duration::from_secs(5));
    }

    #[test]
    fn next_delay_decisions() {
        let mut policy = RetryPolicy::new();
        policy.set_retry_limit(2).unwrap();
        policy.set_base_delay(Duration::from_millis(10));

        assert!(policy.next_delay(0, &status(503)).is_some());
        assert!(policy.next_delay(1, &status(503)).is_some());
        assert!(policy.next_delay(2, &status(503)).is_none());
        assert!(policy.next_delay(0, &status(404)).is_none());

        let timeout = TransportError::timeout("slow");
        assert!(policy.next_delay(0, &AttemptFailure::Transport(&timeout)).is_some());
        let tls = TransportError::other("bad certificate");
        assert!(policy.next_delay(0, &AttemptFailure::Transport(&tls)).is_none());

        policy.set_enabled(false);
        assert!(policy.next_delay(0, &status(503)).is_none());
    }

    #[test]
    fn retry_after_extends_the_delay() {
        let mut policy = RetryPolicy::new();
        policy
            .set_base_delay(Duration::from_millis(10))
            .set_max_delay(Duration::from_secs(2));
        let failure = AttemptFailure::Status {
            code: 429,
            retry_after: Some(Duration::from_secs(1)),
        };
        assert_eq!(policy.next_delay(0, &failure), Some(Duration::from_secs(1)));

        let failure = AttemptFailure::Status {
            code: 429,
            retry_after: Some(Duration::from_secs(120)),
        };
        assert_eq!(policy.next_delay(0, &failure), Some(Duration::from_secs(2)));
    }

    #[test]
    fn custom_backoff_sees_status_and_error() {
        let mut policy = RetryPolicy::new();
        policy.set_custom_backoff(|attempt, status, error| {
            match (status, error) {
                (Some(429), None) => Duration::from_secs(u64::from(attempt) + 10),
                (None, Some(_)) => Duration::from_millis(1),
                _ => Duration::ZERO,
            }
        });
        assert_eq!(policy.next_delay(1, &status(429)), Some(Duration::from_secs(11)));
        let reset = TransportError::connection("reset");
        assert_eq!(
            policy.next_delay(0, &AttemptFailure::Transport(&reset)),
            Some(Duration::from_millis(1))
        );
    }
}
