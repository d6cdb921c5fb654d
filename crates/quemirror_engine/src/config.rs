//! Engine configuration.

use std::time::Duration;

/// Configuration shared by the engines.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Time bound applied to each broker call (connect and per-call I/O).
    pub broker_timeout: Duration,
    /// Retry policy for mirror transactions that fail transiently.
    ///
    /// Only the store transaction is retried; the broker fetch that
    /// produced the message already consumed broker state and is never
    /// reissued.
    pub store_retry: RetryConfig,
    /// Upper bound on messages mirrored per ingestion run, if any.
    pub max_messages: Option<u64>,
}

impl EngineConfig {
    /// Creates a configuration with default bounds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            broker_timeout: Duration::from_secs(30),
            store_retry: RetryConfig::default(),
            max_messages: None,
        }
    }

    /// Sets the broker call timeout.
    #[must_use]
    pub fn with_broker_timeout(mut self, timeout: Duration) -> Self {
        self.broker_timeout = timeout;
        self
    }

    /// Sets the store retry policy.
    #[must_use]
    pub fn with_store_retry(mut self, retry: RetryConfig) -> Self {
        self.store_retry = retry;
        self
    }

    /// Caps the number of messages one ingestion run may mirror.
    #[must_use]
    pub fn with_max_messages(mut self, max: u64) -> Self {
        self.max_messages = Some(max);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Retry policy for transient store failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Creates a policy with the given attempt budget.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }

    /// Creates a policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Calculates the delay before the given retry (1-indexed; attempt 0
    /// is the initial try and has no delay).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let base = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        Duration::from_secs_f64(base.min(self.max_delay.as_secs_f64()))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}
