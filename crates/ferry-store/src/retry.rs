//! Bounded reconnect-on-startup policy.
//!
//! This is the only retry in ferry: a fixed number of connection attempts
//! with a fixed pause between them. Individual reads and writes are never
//! retried; their faults surface as failed outcomes.

use std::future::Future;
use std::time::Duration;

use ferry_core::StoreRole;

use crate::error::StoreError;

/// Connection retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial one).
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }
}

/// Run `attempt` until it succeeds or the budget is spent.
///
/// `NotConfigured` is returned immediately; retrying cannot fix it.
///
/// # Errors
///
/// Returns `StoreError::Connection` carrying the last failure once
/// `max_attempts` attempts have failed.
pub async fn with_connect_retry<T, F, Fut>(
    role: StoreRole,
    config: &RetryConfig,
    mut attempt: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut last_error = String::new();

    for n in 1..=max_attempts {
        match attempt().await {
            Ok(value) => {
                if n > 1 {
                    tracing::info!(%role, attempt = n, "store connected after retry");
                }
                return Ok(value);
            }
            Err(error @ StoreError::NotConfigured(_)) => return Err(error),
            Err(error) => {
                tracing::warn!(%role, attempt = n, max_attempts, %error, "store connect failed");
                last_error = error.to_string();
                if n < max_attempts {
                    tokio::time::sleep(config.backoff).await;
                }
            }
        }
    }

    Err(StoreError::Connection {
        role,
        attempts: max_attempts,
        reason: last_error,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast() -> RetryConfig {
        RetryConfig::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_connect_retry(StoreRole::Origin, &fast(), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(StoreError::Unavailable("refused".into()))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_connect_retry(StoreRole::Target, &fast(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Unavailable("auth rejected".into()))
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.is_connection());
        assert!(err.to_string().contains("target store unreachable after 3 attempt(s)"));
        assert!(err.to_string().contains("auth rejected"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn not_configured_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_connect_retry(StoreRole::Origin, &fast(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::NotConfigured(StoreRole::Origin))
        })
        .await;
        assert!(matches!(result, Err(StoreError::NotConfigured(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
