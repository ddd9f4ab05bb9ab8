//! Discord request sending with rate-limit handling.

use std::time::Duration;

use crate::NotifyError;

/// Maximum number of retry attempts.
const MAX_RETRIES: u32 = 3;

/// Upper bound on a single rate-limit wait.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Reads Discord's `retry_after` (seconds, fractional) from a 429 body.
pub fn parse_retry_after(body: &serde_json::Value) -> Option<Duration> {
    body.get("retry_after")
        .and_then(serde_json::Value::as_f64)
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| Duration::from_secs_f64(secs).min(MAX_RETRY_AFTER))
}

/// Extracts Discord's error `message`, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(300).collect())
}

/// Sends the request and returns the response body parsed as JSON
/// (`Null` for an empty body).
///
/// 429 responses wait for `retry_after`; 5xx and transient connection
/// errors back off exponentially. Other 4xx responses fail immediately
/// with [`NotifyError::Api`].
pub async fn send<F>(build_request: F) -> Result<serde_json::Value, NotifyError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let mut attempt = 0;

    loop {
        let wait = match build_request().send().await {
            Err(e) if is_transient(&e) && attempt < MAX_RETRIES => {
                log::warn!("  transient error: {e}");
                Duration::from_secs(1u64 << (attempt + 1))
            }
            Err(e) => return Err(NotifyError::Http(e)),
            Ok(response) => {
                let status = response.status();
                let text = response.text().await?;

                if status.is_success() {
                    if text.trim().is_empty() {
                        return Ok(serde_json::Value::Null);
                    }
                    return Ok(serde_json::from_str(&text)?);
                }

                let retryable = status == reqwest::StatusCode::TOO_MANY_REQUESTS
                    || status.is_server_error();
                if !retryable || attempt >= MAX_RETRIES {
                    return Err(NotifyError::Api {
                        status: status.as_u16(),
                        message: error_message(&text),
                    });
                }

                let backoff = Duration::from_secs(1u64 << (attempt + 1));
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after = serde_json::from_str::<serde_json::Value>(&text)
                        .ok()
                        .as_ref()
                        .and_then(parse_retry_after)
                        .unwrap_or(backoff);
                    log::warn!("  rate limited by Discord, waiting {retry_after:?}");
                    retry_after
                } else {
                    log::warn!("  HTTP {status} from Discord");
                    backoff
                }
            }
        };

        attempt += 1;
        log::warn!("  retry {attempt}/{MAX_RETRIES} in {wait:?}...");
        tokio::time::sleep(wait).await;
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_fractional_retry_after() {
        assert_eq!(
            parse_retry_after(&json!({"retry_after": 1.5, "global": false})),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(
            parse_retry_after(&json!({"retry_after": 3600})),
            Some(MAX_RETRY_AFTER)
        );
        assert_eq!(parse_retry_after(&json!({"retry_after": -1})), None);
        assert_eq!(parse_retry_after(&json!({})), None);
    }

    #[test]
    fn error_message_prefers_discord_message() {
        assert_eq!(
            error_message(r#"{"message": "Missing Access", "code": 50001}"#),
            "Missing Access"
        );
        assert_eq!(error_message("bad gateway"), "bad gateway");
    }
}
