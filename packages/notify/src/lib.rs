#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Delivery of nest summaries.
//!
//! Each area's [`AreaSummary`] is sent to its [`NotificationTarget`]:
//! a webhook gets a new message every run, a channel gets one message
//! that the bot edits in place on later runs.

pub mod discord;
pub mod embed;
mod http;

pub use discord::DiscordNotifier;
pub use embed::EmbedStyle;

use nestwatch_area_models::NotificationTarget;
use nestwatch_output::AreaSummary;

/// Errors that can occur while delivering summaries.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Discord rejected the request.
    #[error("Discord API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message returned by Discord.
        message: String,
    },

    /// Delivery is not configured for the target.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what is missing.
        message: String,
    },
}

/// What happened to one summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The target was [`NotificationTarget::None`].
    Skipped,
    /// A new message was posted.
    Posted,
    /// The bot's previous message was edited.
    Edited {
        /// Id of the edited message.
        message_id: String,
    },
}

/// Sends rendered summaries somewhere.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `summary` to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if delivery fails.
    async fn deliver(
        &self,
        target: &NotificationTarget,
        summary: &AreaSummary,
    ) -> Result<Delivery, NotifyError>;
}

/// Delivers every summary in order.
///
/// A failed delivery is logged and the remaining areas are still tried.
/// Returns the number of messages sent.
///
/// # Errors
///
/// Returns the first [`NotifyError`] once all summaries were attempted.
pub async fn deliver_all(
    notifier: &dyn Notifier,
    summaries: &[AreaSummary],
) -> Result<usize, NotifyError> {
    let mut sent = 0;
    let mut first_error = None;

    for summary in summaries {
        match notifier.deliver(&summary.target, summary).await {
            Ok(Delivery::Skipped) => {}
            Ok(Delivery::Posted) => {
                log::info!("[{}] Posted summary of {} nests", summary.area, summary.nests);
                sent += 1;
            }
            Ok(Delivery::Edited { message_id }) => {
                log::info!(
                    "[{}] Updated summary message {message_id} ({} nests)",
                    summary.area,
                    summary.nests
                );
                sent += 1;
            }
            Err(e) => {
                log::error!("[{}] Failed to deliver summary: {e}", summary.area);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    first_error.map_or(Ok(sent), Err)
}
