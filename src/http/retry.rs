//! Retry policies for HTTP requests.
//!
//! The snapshot fetch deliberately defaults to `RetryPolicy::None`: a failed
//! fetch surfaces as a user-visible notification and is only retried on the
//! next connectivity transition. Callers who want automatic retries inject a
//! policy instead.

use std::time::Duration;

use crate::error::HttpError;

/// Retry policy for an HTTP request.
#[derive(Debug, Clone, Default)]
pub enum RetryPolicy {
    /// No retries — the session controller's default for the snapshot fetch.
    #[default]
    None,
    /// Retry transport failures, 429, and 502/503/504 with backoff.
    Idempotent,
    /// Caller-provided retry parameters.
    Custom(RetryConfig),
}

impl RetryPolicy {
    pub(crate) fn config(&self) -> Option<RetryConfig> {
        match self {
            RetryPolicy::None => None,
            RetryPolicy::Idempotent => Some(RetryConfig::default()),
            RetryPolicy::Custom(c) => Some(c.clone()),
        }
    }
}

/// Parameters for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retry attempts after the initial request.
    pub max_retries: u32,
    /// Delay before the first retry; doubled each attempt thereafter.
    pub base_delay: Duration,
    /// Upper bound on the per-attempt delay.
    pub max_delay: Duration,
    /// Add up to ±25% random jitter to each delay.
    pub jitter: bool,
    /// Server statuses worth retrying.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            jitter: true,
            retryable_statuses: vec![429, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// Whether this error is worth another attempt.
    pub fn should_retry(&self, error: &HttpError) -> bool {
        match error {
            HttpError::ServerError { status, .. } => self.retryable_statuses.contains(status),
            HttpError::RateLimited { .. } => self.retryable_statuses.contains(&429),
            HttpError::Timeout => true,
            HttpError::Reqwest(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }

    /// Delay for a 0-indexed attempt: exponential doubling, capped, jittered.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.min(16);
        let base = self
            .base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay);

        if !self.jitter {
            return base;
        }
        let ms = base.as_millis() as i64;
        let spread = ms / 4;
        let jitter = if spread > 0 {
            rand::random::<i64>().rem_euclid(2 * spread + 1) - spread
        } else {
            0
        };
        Duration::from_millis((ms + jitter).max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_default_is_none() {
        assert!(matches!(RetryPolicy::default(), RetryPolicy::None));
        assert!(RetryPolicy::None.config().is_none());
    }

    #[test]
    fn test_idempotent_retries_rate_limits() {
        let config = RetryPolicy::Idempotent.config().unwrap();
        assert!(config.should_retry(&HttpError::RateLimited {
            retry_after_ms: None
        }));
        assert!(config.should_retry(&HttpError::ServerError {
            status: 503,
            body: String::new()
        }));
        assert!(!config.should_retry(&HttpError::BadRequest("bad symbol".into())));
    }

    #[test]
    fn test_delay_doubles_without_jitter() {
        let config = RetryConfig {
            base_delay: Duration::from_millis(100),
            jitter: false,
            ..Default::default()
        };
        assert_eq!(config.delay_for_attempt(0).as_millis(), 100);
        assert_eq!(config.delay_for_attempt(1).as_millis(), 200);
        assert_eq!(config.delay_for_attempt(2).as_millis(), 400);
    }

    #[test]
    fn test_delay_caps_at_max() {
        let config = RetryConfig {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(2000),
            jitter: false,
            ..Default::default()
        };
        assert_eq!(config.delay_for_attempt(6).as_millis(), 2000);
    }

    #[test]
    fn test_jittered_delay_within_spread() {
        let config = RetryConfig {
            base_delay: Duration::from_millis(400),
            jitter: true,
            ..Default::default()
        };
        for _ in 0..32 {
            let d = config.delay_for_attempt(0).as_millis() as i64;
            assert!((300..=500).contains(&d), "delay {d} outside jitter range");
        }
    }
}
