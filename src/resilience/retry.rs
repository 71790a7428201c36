//! Retry Logic
//!
//! Exponential backoff retry with jitter for client operations.

use parking_lot::Mutex;
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ConfigurationError, FailureInfo};

/// Decides whether a failure at the given attempt index may be retried.
pub type RetryPredicate = Arc<dyn Fn(&FailureInfo, u32) -> bool + Send + Sync>;

/// Invoked before each retry with the failure and the upcoming attempt index.
pub type RetryCallback = Arc<dyn Fn(&FailureInfo, u32) + Send + Sync>;

/// Retry eligibility used when a policy sets no predicate.
///
/// Retries 5xx, 429, 408 and failures carrying a `NETWORK_ERROR` or
/// `TIMEOUT` code.
pub fn default_retry_predicate(failure: &FailureInfo, _attempt: u32) -> bool {
    failure.is_retryable()
}

/// Retry policy. Immutable once built.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Backoff multiplier, greater than 1.
    pub backoff_multiplier: f64,
    /// Scale delays by a random factor in `[0.5, 1.0)`.
    pub jitter: bool,
    retry_predicate: Option<RetryPredicate>,
    on_retry: Option<RetryCallback>,
}

impl RetryPolicy {
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    fn should_retry(&self, failure: &FailureInfo, attempt: u32) -> bool {
        match &self.retry_predicate {
            Some(predicate) => predicate(failure, attempt),
            None => default_retry_predicate(failure, attempt),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            backoff_multiplier: 2.0,
            jitter: true,
            retry_predicate: None,
            on_retry: None,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("jitter", &self.jitter)
            .field("retry_predicate", &self.retry_predicate.is_some())
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

/// Builder for [`RetryPolicy`]. Unset fields keep the defaults.
#[derive(Default)]
pub struct RetryPolicyBuilder {
    max_retries: Option<u32>,
    base_delay: Option<Duration>,
    max_delay: Option<Duration>,
    backoff_multiplier: Option<f64>,
    jitter: Option<bool>,
    retry_predicate: Option<RetryPredicate>,
    on_retry: Option<RetryCallback>,
}

impl RetryPolicyBuilder {
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = Some(delay);
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(multiplier);
        self
    }

    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = Some(jitter);
        self
    }

    pub fn retry_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&FailureInfo, u32) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    pub fn on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FailureInfo, u32) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> Result<RetryPolicy, ConfigurationError> {
        let defaults = RetryPolicy::default();
        let backoff_multiplier = self.backoff_multiplier.unwrap_or(defaults.backoff_multiplier);

        if !backoff_multiplier.is_finite() || backoff_multiplier <= 1.0 {
            return Err(ConfigurationError::InvalidConfig {
                message: format!(
                    "backoff multiplier must be greater than 1, got {}",
                    backoff_multiplier
                ),
            });
        }

        Ok(RetryPolicy {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            base_delay: self.base_delay.unwrap_or(defaults.base_delay),
            max_delay: self.max_delay.unwrap_or(defaults.max_delay),
            backoff_multiplier,
            jitter: self.jitter.unwrap_or(defaults.jitter),
            retry_predicate: self.retry_predicate,
            on_retry: self.on_retry,
        })
    }
}

/// Source of jitter factors in `[0.5, 1.0)`.
pub trait JitterSource: Send + Sync {
    fn factor(&self) -> f64;
}

/// Thread-local RNG jitter.
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn factor(&self) -> f64 {
        rand::thread_rng().gen_range(0.5..1.0)
    }
}

/// Constant jitter factor, clamped into `[0.5, 1.0)`.
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn factor(&self) -> f64 {
        self.0.clamp(0.5, 1.0 - f64::EPSILON)
    }
}

/// Retry statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryStats {
    pub total_attempts: u32,
    pub retries_scheduled: u32,
    pub successful_retries: u32,
    pub failed_operations: u32,
}

/// Runs an operation until it succeeds or the policy gives up.
pub struct RetryExecutor {
    policy: RetryPolicy,
    jitter_source: Arc<dyn JitterSource>,
    stats: Mutex<RetryStats>,
}

impl RetryExecutor {
    /// Create new retry executor.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            jitter_source: Arc::new(RandomJitter),
            stats: Mutex::new(RetryStats::default()),
        }
    }

    /// Replace the random source used for jitter.
    pub fn with_jitter_source(mut self, source: Arc<dyn JitterSource>) -> Self {
        self.jitter_source = source;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Snapshot of the running counters.
    pub fn stats(&self) -> RetryStats {
        self.stats.lock().clone()
    }

    /// Nominal delay before jitter for the given attempt index.
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        let base_ns = self.policy.base_delay.as_nanos() as f64;
        let max_ns = self.policy.max_delay.as_nanos() as f64;
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);

        let delay_ns = (base_ns * self.policy.backoff_multiplier.powi(exponent)).min(max_ns);
        Duration::from_nanos(delay_ns.max(0.0).round() as u64)
    }

    /// Delay actually slept after a failure at the given attempt index.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let nominal = self.nominal_delay(attempt);
        if self.policy.jitter {
            let scaled = nominal.as_nanos() as f64 * self.jitter_source.factor();
            Duration::from_nanos(scaled.floor() as u64)
        } else {
            nominal
        }
    }

    /// Execute an operation with retry logic.
    ///
    /// Performs at most `max_retries + 1` attempts and returns the first
    /// success, or the last failure unchanged.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, FailureInfo>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FailureInfo>>,
    {
        let mut attempt: u32 = 0;

        loop {
            self.stats.lock().total_attempts += 1;

            let failure = match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        self.stats.lock().successful_retries += 1;
                    }
                    return Ok(result);
                }
                Err(failure) => failure,
            };

            if attempt >= self.policy.max_retries || !self.policy.should_retry(&failure, attempt) {
                debug!(
                    attempt,
                    status = failure.status_code,
                    "Giving up after failure: {}",
                    failure.message
                );
                self.stats.lock().failed_operations += 1;
                return Err(failure);
            }

            if let Some(on_retry) = &self.policy.on_retry {
                on_retry(&failure, attempt + 1);
            }

            let delay = self.calculate_delay(attempt);
            warn!(
                attempt = attempt + 1,
                max_retries = self.policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                status = failure.status_code,
                "Retrying after failure: {}",
                failure.message
            );
            self.stats.lock().retries_scheduled += 1;

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
