//! Typed retry policy with exponential backoff
//!
//! Any fallible async call can be wrapped in a [`RetryExecutor`]. Only errors
//! whose [`Transient::is_transient`] returns `true` are retried; every other
//! error surfaces immediately as [`RetryError::Fatal`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Classifies an error as worth retrying
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Retry configuration: attempt bound plus backoff curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first call
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait after the first failed attempt
    #[serde(default = "default_base_delay", with = "humantime_serde")]
    pub base_delay: Duration,

    /// Multiplier applied for every further failed attempt
    #[serde(default = "default_factor")]
    pub factor: f64,

    /// Optional ceiling on a single wait
    #[serde(default, with = "humantime_serde")]
    pub max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            factor: default_factor(),
            max_delay: None,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Wait after the failed attempt with 0-based index `attempt`: `base * factor^attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let secs = self.base_delay.as_secs_f64() * self.factor.powi(attempt as i32);
        let delay = if secs.is_finite() && secs >= 0.0 {
            Duration::from_secs_f64(secs)
        } else {
            Duration::MAX
        };
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Sum of every wait the policy can impose
    pub fn worst_case_wait(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|i| self.delay_for(i))
            .fold(Duration::ZERO, |acc, d| acc.saturating_add(d))
    }
}

/// Outcome of a call that did not succeed
#[derive(Debug, Error)]
pub enum RetryError<E: fmt::Display + fmt::Debug> {
    /// Every attempt failed with a transient error
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// A non-transient error ended the call early
    #[error("{0}")]
    Fatal(E),
}

impl<E: fmt::Display + fmt::Debug> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Fatal(e) => e,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}

/// Hook run between attempts
pub type BetweenAttempts = Arc<dyn Fn() + Send + Sync>;

/// Runs operations under a [`RetryPolicy`]
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    between_attempts: Option<BetweenAttempts>,
    metrics: Arc<RwLock<RetryMetrics>>,
}

impl fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("policy", &self.policy)
            .field("between_attempts", &self.between_attempts.is_some())
            .finish()
    }
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            between_attempts: None,
            metrics: Arc::new(RwLock::new(RetryMetrics::default())),
        }
    }

    /// Run `hook` after every transient failure, before sleeping
    pub fn with_between_attempts(mut self, hook: BetweenAttempts) -> Self {
        self.between_attempts = Some(hook);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an operation, retrying transient failures
    pub async fn execute_with_retry<F, Fut, T, E>(
        &self,
        context: &str,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + fmt::Display + fmt::Debug,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation().await {
                Ok(value) => {
                    self.metrics.write().await.record_success(attempt);
                    return Ok(value);
                }
                Err(err) if !err.is_transient() => {
                    self.metrics.write().await.record_failure(attempt);
                    return Err(RetryError::Fatal(err));
                }
                Err(err) if attempt >= max_attempts => {
                    warn!("{} still failing after {} attempts: {}", context, attempt, err);
                    self.metrics.write().await.record_failure(attempt);
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                Err(err) => {
                    let delay = self.policy.delay_for(attempt - 1);
                    debug!(
                        "Retrying {} (attempt {}/{}) after {:?}: {}",
                        context, attempt, max_attempts, delay, err
                    );

                    if let Some(hook) = &self.between_attempts {
                        hook();
                    }
                    tokio::time::sleep(delay).await;
                    self.metrics.write().await.record_retry(attempt, delay);
                }
            }
        }
    }

    pub async fn metrics(&self) -> RetryMetrics {
        self.metrics.read().await.clone()
    }
}

/// Retry metrics for observability
#[derive(Debug, Clone, Default)]
pub struct RetryMetrics {
    pub total_attempts: u32,
    pub successful_calls: u32,
    pub failed_calls: u32,
    pub retries: Vec<(u32, Duration)>,
}

impl RetryMetrics {
    fn record_success(&mut self, attempts: u32) {
        self.total_attempts += attempts;
        self.successful_calls += 1;
    }

    fn record_failure(&mut self, attempts: u32) {
        self.total_attempts += attempts;
        self.failed_calls += 1;
    }

    fn record_retry(&mut self, attempt: u32, delay: Duration) {
        self.retries.push((attempt, delay));
    }
}

// Default functions for serde
fn default_max_attempts() -> u32 {
    12
}

fn default_base_delay() -> Duration {
    Duration::from_millis(150)
}

fn default_factor() -> f64 {
    1.6
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum TestError {
        Busy,
        Broken,
    }

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                TestError::Busy => write!(f, "busy"),
                TestError::Broken => write!(f, "broken"),
            }
        }
    }

    impl Transient for TestError {
        fn is_transient(&self) -> bool {
            matches!(self, TestError::Busy)
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            factor: 1.0,
            max_delay: None,
        }
    }

    #[test]
    fn test_default_backoff_curve() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 12);
        let secs = |i| policy.delay_for(i).as_secs_f64();
        assert!((secs(0) - 0.150).abs() < 1e-6);
        assert!((secs(1) - 0.240).abs() < 1e-6);
        assert!((secs(2) - 0.384).abs() < 1e-6);
        assert!(policy.worst_case_wait() > Duration::from_secs(40));
    }

    #[test]
    fn test_delay_cap() {
        let policy = RetryPolicy {
            max_delay: Some(Duration::from_millis(200)),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(5), Duration::from_millis(200));
        assert!(policy.delay_for(0) < Duration::from_millis(200));
    }

    #[test]
    fn test_policy_deserializes_humantime() {
        let policy: RetryPolicy =
            serde_yaml::from_str("max_attempts: 3\nbase_delay: 20ms\nfactor: 2.0\n").unwrap();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(20));
        assert_eq!(policy.max_delay, None);
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let pumps = Arc::new(AtomicU32::new(0));
        let pump_counter = pumps.clone();
        let executor = RetryExecutor::new(fast_policy(5)).with_between_attempts(Arc::new(
            move || {
                pump_counter.fetch_add(1, Ordering::SeqCst);
            },
        ));

        let result = executor
            .execute_with_retry("open", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(TestError::Busy)
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(pumps.load(Ordering::SeqCst), 2);
        let metrics = executor.metrics().await;
        assert_eq!(metrics.total_attempts, 3);
        assert_eq!(metrics.retries.len(), 2);
    }

    #[tokio::test]
    async fn test_non_transient_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let executor = RetryExecutor::new(fast_policy(5));

        let result: Result<(), _> = executor
            .execute_with_retry("export", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Broken) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Fatal(TestError::Broken))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_attempts() {
        let executor = RetryExecutor::new(fast_policy(4));

        let result: Result<(), _> = executor
            .execute_with_retry("close", || async { Err(TestError::Busy) })
            .await;

        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 4);
                assert!(matches!(last, TestError::Busy));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
