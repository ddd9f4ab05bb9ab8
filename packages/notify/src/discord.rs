//! Discord webhook and bot-channel delivery.
//!
//! Webhooks post a new message every run. Channel targets are posted to
//! by the bot account: the bot looks up its own id, scans recent channel
//! history for a message it authored and edits that one, otherwise it
//! sends a new message.

use async_trait::async_trait;
use nestwatch_area_models::NotificationTarget;
use nestwatch_output::AreaSummary;
use tokio::sync::OnceCell;

use crate::embed::{EmbedStyle, message_payload};
use crate::http::send;
use crate::{Delivery, Notifier, NotifyError};

/// Discord REST API base URL.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Number of recent channel messages searched for the bot's own message.
const HISTORY_LIMIT: u32 = 50;

/// Delivers summaries to Discord.
pub struct DiscordNotifier {
    client: reqwest::Client,
    token: Option<String>,
    style: EmbedStyle,
    api_base: String,
    bot_user_id: OnceCell<String>,
}

impl DiscordNotifier {
    /// Creates a notifier. `token` is the bot token and is only needed
    /// for channel targets.
    #[must_use]
    pub fn new(client: reqwest::Client, token: Option<String>, style: EmbedStyle) -> Self {
        Self {
            client,
            token: token.filter(|t| !t.trim().is_empty()),
            style,
            api_base: DEFAULT_API_BASE.to_string(),
            bot_user_id: OnceCell::new(),
        }
    }

    /// Overrides the REST API base URL.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn token(&self) -> Result<&str, NotifyError> {
        self.token.as_deref().ok_or_else(|| NotifyError::Config {
            message: "a bot token is required for channel targets".to_string(),
        })
    }

    async fn post_webhook(&self, url: &str, summary: &AreaSummary) -> Result<Delivery, NotifyError> {
        let payload = message_payload(summary, &self.style);
        send(|| self.client.post(url).json(&payload)).await?;
        Ok(Delivery::Posted)
    }

    async fn bot_user_id(&self, token: &str) -> Result<&str, NotifyError> {
        let id = self
            .bot_user_id
            .get_or_try_init(|| async {
                let url = format!("{}/users/@me", self.api_base);
                let me = send(|| authorized(self.client.get(&url), token)).await?;
                me.get("id")
                    .and_then(|id| id.as_str())
                    .map(str::to_string)
                    .ok_or_else(|| NotifyError::Api {
                        status: 200,
                        message: "current user has no id".to_string(),
                    })
            })
            .await?;
        Ok(id.as_str())
    }

    async fn upsert_channel(
        &self,
        channel_id: u64,
        summary: &AreaSummary,
    ) -> Result<Delivery, NotifyError> {
        let token = self.token()?;
        let bot_id = self.bot_user_id(token).await?;
        let payload = message_payload(summary, &self.style);

        let history_url = format!(
            "{}/channels/{channel_id}/messages?limit={HISTORY_LIMIT}",
            self.api_base
        );
        let history = send(|| authorized(self.client.get(&history_url), token)).await?;

        if let Some(message_id) = find_own_message(&history, bot_id) {
            let url = format!(
                "{}/channels/{channel_id}/messages/{message_id}",
                self.api_base
            );
            send(|| authorized(self.client.patch(&url).json(&payload), token)).await?;
            return Ok(Delivery::Edited { message_id });
        }

        let url = format!("{}/channels/{channel_id}/messages", self.api_base);
        send(|| authorized(self.client.post(&url).json(&payload), token)).await?;
        Ok(Delivery::Posted)
    }
}

fn authorized(builder: reqwest::RequestBuilder, token: &str) -> reqwest::RequestBuilder {
    builder.header(reqwest::header::AUTHORIZATION, format!("Bot {token}"))
}

/// Returns the id of the newest message in `history` authored by
/// `author_id`. Discord returns history newest first.
#[must_use]
pub fn find_own_message(history: &serde_json::Value, author_id: &str) -> Option<String> {
    history.as_array()?.iter().find_map(|message| {
        let author = message.get("author")?.get("id")?.as_str()?;
        if author == author_id {
            message.get("id")?.as_str().map(str::to_string)
        } else {
            None
        }
    })
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn deliver(
        &self,
        target: &NotificationTarget,
        summary: &AreaSummary,
    ) -> Result<Delivery, NotifyError> {
        match target {
            NotificationTarget::None => Ok(Delivery::Skipped),
            NotificationTarget::Webhook(url) => self.post_webhook(url, summary).await,
            NotificationTarget::Channel(channel_id) => {
                self.upsert_channel(*channel_id, summary).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn summary(target: NotificationTarget) -> AreaSummary {
        AreaSummary {
            area: "Park".to_string(),
            target,
            title: "Nests in Park".to_string(),
            lines: vec![],
            nests: 0,
        }
    }

    #[test]
    fn finds_newest_own_message() {
        let history = json!([
            {"id": "30", "author": {"id": "someone"}},
            {"id": "20", "author": {"id": "bot"}},
            {"id": "10", "author": {"id": "bot"}},
        ]);
        assert_eq!(find_own_message(&history, "bot"), Some("20".to_string()));
        assert_eq!(find_own_message(&history, "other"), None);
        assert_eq!(find_own_message(&json!({"message": "x"}), "bot"), None);
    }

    #[tokio::test]
    async fn none_target_is_skipped() {
        let notifier = DiscordNotifier::new(reqwest::Client::new(), None, EmbedStyle::default());
        let target = NotificationTarget::None;
        assert_eq!(
            notifier.deliver(&target, &summary(target.clone())).await.unwrap(),
            Delivery::Skipped
        );
    }

    #[tokio::test]
    async fn channel_without_token_is_a_config_error() {
        let notifier = DiscordNotifier::new(
            reqwest::Client::new(),
            Some("  ".to_string()),
            EmbedStyle::default(),
        );
        let target = NotificationTarget::Channel(42);
        assert!(matches!(
            notifier.deliver(&target, &summary(target.clone())).await,
            Err(NotifyError::Config { .. })
        ));
    }

    #[test]
    fn api_base_drops_trailing_slash() {
        let notifier = DiscordNotifier::new(reqwest::Client::new(), None, EmbedStyle::default())
            .with_api_base("http://localhost:1234/api/");
        assert_eq!(notifier.api_base, "http://localhost:1234/api");
    }
}
