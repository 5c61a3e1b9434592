//! Rate limit retry and error classification shared by the providers

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};

/// Maximum number of attempts for a rate-limited request
pub(crate) const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
const BACKOFF_BASE_MS: u64 = 1000;

/// Wait used when a 429 carries no retry hint
pub(crate) const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Run `send` until it succeeds, fails with something other than a rate
/// limit, or runs out of attempts
pub(crate) async fn with_rate_limit_retry<T, F, Fut>(mut send: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempts = 0;

    loop {
        attempts += 1;

        match send().await {
            Err(Error::RateLimited(wait_secs)) if attempts < MAX_RETRY_ATTEMPTS => {
                let backoff = calculate_backoff(attempts, wait_secs);
                warn!(
                    attempt = attempts,
                    wait_ms = backoff,
                    "Rate limited, retrying after backoff"
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
            result => return result,
        }
    }
}

/// Whether an error message means "this model can't serve the request right
/// now" so another model may succeed
pub fn is_model_error(msg: &str) -> bool {
    const MODEL_ERROR_PATTERNS: [&str; 7] = [
        "model not found",
        "does not exist",
        "unavailable",
        "not available",
        "overloaded",
        "capacity",
        "no available provider",
    ];

    let msg_lower = msg.to_lowercase();
    MODEL_ERROR_PATTERNS
        .iter()
        .any(|pattern| msg_lower.contains(pattern))
}

/// Exponential backoff in milliseconds, never shorter than the server's hint
pub(crate) fn calculate_backoff(attempt: u32, suggested_wait_secs: u64) -> u64 {
    let base = BACKOFF_BASE_MS * 2u64.pow(attempt.saturating_sub(1));
    let delay = base.max(suggested_wait_secs * 1000);

    // Up to 10% jitter
    let jitter = delay / 10;
    delay + (rand_jitter() % jitter.max(1))
}

fn rand_jitter() -> u64 {
    use std::time::SystemTime;
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64 % 1000)
        .unwrap_or(0)
}

/// Retry hint from a `Retry-After` header value or a JSON error body
pub(crate) fn extract_retry_after(header: Option<&str>, body: &str) -> Option<u64> {
    if let Some(secs) = header.and_then(|h| h.trim().parse::<u64>().ok()) {
        return Some(secs);
    }

    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    json.get("retry_after")
        .or_else(|| json.get("error").and_then(|e| e.get("retry_after")))
        .and_then(|v| v.as_u64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_is_model_error() {
        assert!(is_model_error("Model not found"));
        assert!(is_model_error("The model `gpt-9` does not exist"));
        assert!(is_model_error("Overloaded"));
        assert!(is_model_error("Server at capacity"));
        assert!(!is_model_error("Invalid API key"));
        assert!(!is_model_error("Network timeout"));
    }

    #[test]
    fn test_calculate_backoff() {
        assert!(calculate_backoff(1, 0) >= BACKOFF_BASE_MS);
        assert!(calculate_backoff(2, 0) >= BACKOFF_BASE_MS * 2);
        assert!(calculate_backoff(3, 0) >= BACKOFF_BASE_MS * 4);

        // Server hint wins when larger
        let backoff = calculate_backoff(1, 5);
        assert!(backoff >= 5000);
        assert!(backoff < 5500);
    }

    #[test]
    fn test_extract_retry_after() {
        assert_eq!(extract_retry_after(Some("12"), ""), Some(12));
        assert_eq!(extract_retry_after(None, r#"{"retry_after": 30}"#), Some(30));
        assert_eq!(
            extract_retry_after(None, r#"{"error": {"retry_after": 60}}"#),
            Some(60)
        );
        assert_eq!(extract_retry_after(Some("soon"), r#"{"message": "slow down"}"#), None);
        assert_eq!(extract_retry_after(None, "not json"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_after_rate_limit() {
        let calls = AtomicU32::new(0);

        let result = with_rate_limit_retry(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(Error::RateLimited(1))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = with_rate_limit_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::RateLimited(1)) }
        })
        .await;

        assert!(matches!(result, Err(Error::RateLimited(1))));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRY_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = with_rate_limit_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::LLMError("Unauthorized".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
