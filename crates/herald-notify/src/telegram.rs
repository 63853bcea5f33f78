//! Telegram chats via the Bot API.

use async_trait::async_trait;
use serde_json::Value;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::html::escape;
use teloxide::RequestError;
use tracing::{debug, warn};

use herald_models::{Batch, Item, WatcherName};

use crate::error::{DeliveryError, Result};
use crate::traits::{AlertSink, Notifier};

/// Telegram's message length limit.
pub const MESSAGE_LIMIT: usize = 4096;

/// Keeps a single item well under the message limit once markup is added.
const ITEM_DESCRIPTION_LIMIT: usize = 1000;
const ITEM_TITLE_LIMIT: usize = 256;

/// Sends batches to one chat as HTML messages.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    /// Creates a notifier posting to `chat_id`.
    pub fn new(bot: Bot, chat_id: i64) -> Self {
        Self {
            bot,
            chat_id: ChatId(chat_id),
        }
    }

    async fn send(&self, text: String) -> Result<()> {
        self.bot
            .send_message(self.chat_id, text)
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
            .map_err(delivery_error)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, batch: &Batch) -> Result<()> {
        let messages = render_messages(&batch.items);
        debug!(
            watcher = %batch.watcher,
            batch = %batch.id,
            messages = messages.len(),
            "sending batch to telegram"
        );
        for text in messages {
            self.send(text).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AlertSink for TelegramNotifier {
    async fn alert(&self, watcher: &WatcherName, message: &str) {
        let text = format!(
            "⚠️ <b>Watcher {} needs attention</b>\n{}",
            escape(watcher.as_str()),
            escape(&truncate(message, ITEM_DESCRIPTION_LIMIT))
        );
        if let Err(e) = self.send(text).await {
            warn!(watcher = %watcher, error = %e, "failed to send alert to telegram");
        }
    }
}

fn delivery_error(error: RequestError) -> DeliveryError {
    match error {
        RequestError::RetryAfter(_) => DeliveryError::RateLimited { retry_after: None },
        RequestError::Network(e) => DeliveryError::Unavailable(e.to_string()),
        other => DeliveryError::Telegram(other.to_string()),
    }
}

/// Renders one item as an HTML block.
pub fn render_item(item: &Item) -> String {
    let field = |key: &str| item.payload.get(key).and_then(Value::as_str);
    let title = escape(&truncate(
        field("title").unwrap_or(item.source_id.as_str()),
        ITEM_TITLE_LIMIT,
    ));

    let mut block = match field("url") {
        Some(url) => format!("<b><a href=\"{}\">{}</a></b>", escape(url), title),
        None => format!("<b>{}</b>", title),
    };

    let description = match &item.payload {
        Value::String(s) => Some(s.as_str()),
        _ => field("description"),
    };
    if let Some(description) = description {
        block.push('\n');
        block.push_str(&escape(&truncate(description, ITEM_DESCRIPTION_LIMIT)));
    }
    if let Some(footer) = field("footer") {
        block.push_str(&format!("\n<i>{}</i>", escape(footer)));
    }
    block
}

/// Packs item blocks into as few messages as fit the length limit.
pub fn render_messages(items: &[Item]) -> Vec<String> {
    let mut messages = Vec::new();
    let mut current = String::new();

    for block in items.iter().map(render_item) {
        let needed = if current.is_empty() {
            block.chars().count()
        } else {
            current.chars().count() + 2 + block.chars().count()
        };
        if !current.is_empty() && needed > MESSAGE_LIMIT {
            messages.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&block);
    }
    if !current.is_empty() {
        messages.push(current);
    }
    messages
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
