//! HTTP retry helpers for the reference feeds.
//!
//! Feed requests go through [`send_json`] so that connection failures,
//! timeouts, rate limiting and server errors are retried with exponential
//! backoff before the run is aborted.

use std::time::Duration;

use crate::SpeciesError;

/// Maximum number of retry attempts for transient HTTP errors.
///
/// Backoff doubles from 2s, so the run gives up after 2 + 4 + 8 = 14s of
/// waiting.
const MAX_RETRIES: u32 = 3;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 300;

/// Sends an HTTP request and parses the response body as JSON.
///
/// `build_request` is called once per attempt because a
/// [`reqwest::RequestBuilder`] is consumed by `send()`.
///
/// # Errors
///
/// Returns [`SpeciesError`] if the request fails after all retries, the
/// server answers with a non-retryable status, or the body is not JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, SpeciesError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send(&build_request).await?;
    let url = response.url().to_string();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
        log::error!("Feed {url} returned invalid JSON: {e}\n  body preview: {preview}");
        SpeciesError::Json(e)
    })
}

/// Sends the request, retrying transient failures with exponential
/// backoff. Returns the first 2xx/3xx response.
#[allow(clippy::future_not_send)]
async fn send<F>(build_request: &F) -> Result<reqwest::Response, SpeciesError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << attempt);
            log::warn!("  retry {attempt}/{MAX_RETRIES} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) if is_transient(&e) && attempt < MAX_RETRIES => {
                log::warn!("  transient error: {e}");
            }
            Err(e) => return Err(SpeciesError::Http(e)),
            Ok(response) => {
                let status = response.status();
                let retryable = status == reqwest::StatusCode::TOO_MANY_REQUESTS
                    || status.is_server_error();

                if retryable && attempt < MAX_RETRIES {
                    log::warn!("  HTTP {status} from {}", response.url());
                } else if retryable || status.is_client_error() {
                    return Err(SpeciesError::Feed {
                        message: format!("HTTP {status} from {}", response.url()),
                    });
                } else {
                    return Ok(response);
                }
            }
        }

        attempt += 1;
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
