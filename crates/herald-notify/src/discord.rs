//! Discord channel webhooks.
//!
//! Each item becomes one embed. Discord accepts at most ten embeds and
//! 6000 characters of embed text per message, so a batch may be split over
//! several messages; a failure part way through fails the whole batch and
//! the already posted messages will be repeated on the next attempt.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use herald_models::{Batch, Item, WatcherName};

use crate::error::{DeliveryError, Result};
use crate::traits::{AlertSink, Notifier};

/// Maximum embeds Discord accepts in one message.
pub const MAX_EMBEDS_PER_MESSAGE: usize = 10;

const TITLE_LIMIT: usize = 256;
const DESCRIPTION_LIMIT: usize = 4096;
const FOOTER_LIMIT: usize = 2048;
const AUTHOR_LIMIT: usize = 256;
const CONTENT_LIMIT: usize = 2000;
const MESSAGE_EMBED_CHARS: usize = 6000;
const ERROR_BODY_LIMIT: usize = 200;

const EMBED_COLOR: u32 = 0x5865F2;
const ALERT_COLOR: u32 = 0xED4245;

/// One rich embed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedText {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

impl Embed {
    /// Characters counted against the per-message embed limit.
    pub fn text_len(&self) -> usize {
        let len = |s: &Option<String>| s.as_deref().map_or(0, |s| s.chars().count());
        len(&self.title)
            + len(&self.description)
            + self.author.as_ref().map_or(0, |a| a.name.chars().count())
            + self.footer.as_ref().map_or(0, |f| f.text.chars().count())
    }
}

/// Body of an execute-webhook request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebhookMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

/// Posts batches to a Discord webhook.
pub struct DiscordWebhookNotifier {
    client: Client,
    url: Url,
    username: Option<String>,
}

impl DiscordWebhookNotifier {
    /// Creates a notifier for the webhook at `url`.
    pub fn new(client: Client, url: Url) -> Self {
        Self {
            client,
            url,
            username: None,
        }
    }

    /// Overrides the display name of posted messages.
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    /// Splits a batch into webhook messages within Discord's limits.
    pub fn render_messages(&self, batch: &Batch) -> Vec<WebhookMessage> {
        let mut messages = Vec::new();
        let mut current: Vec<Embed> = Vec::new();
        let mut chars = 0;

        for embed in batch.items.iter().map(render_embed) {
            let len = embed.text_len();
            if !current.is_empty()
                && (current.len() == MAX_EMBEDS_PER_MESSAGE || chars + len > MESSAGE_EMBED_CHARS)
            {
                messages.push(self.message(std::mem::take(&mut current)));
                chars = 0;
            }
            chars += len;
            current.push(embed);
        }
        if !current.is_empty() {
            messages.push(self.message(current));
        }
        messages
    }

    fn message(&self, embeds: Vec<Embed>) -> WebhookMessage {
        WebhookMessage {
            username: self.username.clone(),
            content: None,
            embeds,
        }
    }

    async fn post(&self, message: &WebhookMessage) -> Result<()> {
        let response = self
            .client
            .post(self.url.clone())
            .json(message)
            .send()
            .await
            .map_err(|e| DeliveryError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DeliveryError::RateLimited {
                retry_after: retry_after(response.headers()),
            });
        }

        let body = truncate(&response.text().await.unwrap_or_default(), ERROR_BODY_LIMIT);
        if status.is_server_error() {
            Err(DeliveryError::Unavailable(format!("status {}: {}", status, body)))
        } else {
            Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl Notifier for DiscordWebhookNotifier {
    async fn deliver(&self, batch: &Batch) -> Result<()> {
        let messages = self.render_messages(batch);
        debug!(
            watcher = %batch.watcher,
            batch = %batch.id,
            messages = messages.len(),
            "posting batch to discord"
        );
        for message in &messages {
            self.post(message).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AlertSink for DiscordWebhookNotifier {
    async fn alert(&self, watcher: &WatcherName, message: &str) {
        let alert = WebhookMessage {
            username: self.username.clone(),
            content: None,
            embeds: vec![Embed {
                title: Some(truncate(&format!("Watcher {} needs attention", watcher), TITLE_LIMIT)),
                description: Some(truncate(message, CONTENT_LIMIT)),
                color: Some(ALERT_COLOR),
                ..Embed::default()
            }],
        };
        if let Err(e) = self.post(&alert).await {
            warn!(watcher = %watcher, error = %e, "failed to post alert to discord");
        }
    }
}

/// Renders one item as an embed from the conventional payload keys.
///
/// A payload that is not an object is shown as the embed description.
pub fn render_embed(item: &Item) -> Embed {
    let field = |key: &str| item.payload.get(key).and_then(Value::as_str);

    let description = match &item.payload {
        Value::Object(_) => field("description").map(str::to_string),
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    };

    Embed {
        title: Some(truncate(field("title").unwrap_or(item.source_id.as_str()), TITLE_LIMIT)),
        url: field("url").map(str::to_string),
        description: description.map(|d| truncate(&d, DESCRIPTION_LIMIT)),
        timestamp: field("timestamp").map(str::to_string),
        color: Some(EMBED_COLOR),
        author: field("author").map(|name| EmbedText {
            name: truncate(name, AUTHOR_LIMIT),
        }),
        footer: field("footer").map(|text| EmbedFooter {
            text: truncate(text, FOOTER_LIMIT),
        }),
        image: field("image").map(|url| EmbedImage {
            url: url.to_string(),
        }),
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

/// Truncates to `max` characters, marking the cut with an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_models::SortKey;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    fn notifier() -> DiscordWebhookNotifier {
        let url = Url::parse("https://discord.com/api/webhooks/1/token").unwrap();
        DiscordWebhookNotifier::new(Client::new(), url).with_username(Some("Herald".to_string()))
    }

    fn batch(payloads: Vec<Value>) -> Batch {
        let items = payloads
            .into_iter()
            .enumerate()
            .map(|(i, p)| Item::new(format!("item-{}", i), SortKey::Sequence(i as u64), p))
            .collect();
        Batch::new(WatcherName::parse("w").unwrap(), items)
    }

    #[test]
    fn test_render_embed_from_payload() {
        let item = Item::new(
            "acme/bot#12",
            SortKey::Sequence(1),
            json!({
                "title": "#12 Bot crashes",
                "url": "https://github.com/acme/bot/issues/12",
                "description": "Steps to reproduce",
                "author": "alice",
                "timestamp": "2024-03-10T12:00:00+00:00",
                "footer": "acme/bot · new issue"
            }),
        );

        let embed = render_embed(&item);

        assert_eq!(embed.title.as_deref(), Some("#12 Bot crashes"));
        assert_eq!(embed.url.as_deref(), Some("https://github.com/acme/bot/issues/12"));
        assert_eq!(embed.author.unwrap().name, "alice");
        assert_eq!(embed.footer.unwrap().text, "acme/bot · new issue");
        assert!(embed.image.is_none());
    }

    #[test]
    fn test_render_embed_plain_payload_uses_source_id() {
        let item = Item::new("patch-7.35", SortKey::Sequence(1), json!("Patch is live"));
        let embed = render_embed(&item);
        assert_eq!(embed.title.as_deref(), Some("patch-7.35"));
        assert_eq!(embed.description.as_deref(), Some("Patch is live"));
    }

    #[test]
    fn test_long_fields_truncated() {
        let item = Item::new(
            "x",
            SortKey::Sequence(1),
            json!({ "title": "t".repeat(300), "description": "d".repeat(5000) }),
        );
        let embed = render_embed(&item);
        let title = embed.title.unwrap();
        assert_eq!(title.chars().count(), TITLE_LIMIT);
        assert!(title.ends_with('…'));
        assert_eq!(embed.description.unwrap().chars().count(), DESCRIPTION_LIMIT);
    }

    #[test]
    fn test_messages_hold_at_most_ten_embeds() {
        let payloads = (0..12).map(|i| json!({ "title": format!("post {}", i) })).collect();
        let messages = notifier().render_messages(&batch(payloads));

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].embeds.len(), 10);
        assert_eq!(messages[1].embeds.len(), 2);
        assert_eq!(messages[0].username.as_deref(), Some("Herald"));
    }

    #[test]
    fn test_messages_split_on_embed_text_limit() {
        let payloads = (0..3)
            .map(|i| json!({ "title": format!("p{}", i), "description": "d".repeat(2500) }))
            .collect();
        let messages = notifier().render_messages(&batch(payloads));

        let sizes: Vec<usize> = messages.iter().map(|m| m.embeds.len()).collect();
        assert_eq!(sizes, vec![2, 1]);
    }

    #[test]
    fn test_message_serialization_skips_empty_fields() {
        let messages = notifier().render_messages(&batch(vec![json!({ "title": "only" })]));
        let value = serde_json::to_value(&messages[0]).unwrap();

        assert!(value.get("content").is_none());
        assert_eq!(value["embeds"][0]["title"], "only");
        assert!(value["embeds"][0].get("url").is_none());
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("1.5"));
        assert_eq!(retry_after(&headers), Some(Duration::from_millis(1500)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("-3"));
        assert_eq!(retry_after(&headers), None);
    }
}
