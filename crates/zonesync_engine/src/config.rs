//! Configuration for the sync engine.

use std::time::Duration;
use zonesync_protocol::{SubscriptionId, ZoneId};

/// Zone the engine syncs when none is configured.
pub const DEFAULT_ZONE: &str = "records-zone";
/// Subscription the engine registers when none is configured.
pub const DEFAULT_SUBSCRIPTION: &str = "records-zone-changes";

/// Configuration for sync operations.
///
/// The zone and subscription identities are fixed for the lifetime of a
/// local state directory; changing them points the engine at a different
/// remote partition while keeping the old cursor.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Zone all records live in.
    pub zone_id: ZoneId,
    /// Subscription that reports changes in the zone.
    pub subscription_id: SubscriptionId,
    /// Whether push signals should wake the receiver (content-available).
    pub wants_content_wake: bool,
    /// Retry policy for callers that opt into retrying pulls.
    pub retry: RetryConfig,
}

impl SyncConfig {
    /// Creates a new sync configuration.
    pub fn new(zone_id: impl Into<String>, subscription_id: impl Into<String>) -> Self {
        Self {
            zone_id: ZoneId::new(zone_id),
            subscription_id: SubscriptionId::new(subscription_id),
            wants_content_wake: true,
            retry: RetryConfig::default(),
        }
    }

    /// Sets whether push signals should wake the receiver.
    pub fn with_content_wake(mut self, wants_content_wake: bool) -> Self {
        self.wants_content_wake = wants_content_wake;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ZONE, DEFAULT_SUBSCRIPTION)
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    /// Calculates the delay before a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);

        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // Up to 25% on top of the base delay
            let jitter = delay_secs * 0.25 * jitter_fraction();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Cheap pseudo-random fraction in `[0, 1)` taken from the clock.
fn jitter_fraction() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}
