//! JSON Feed adapter, used for patch-note blogs and release pages.
//!
//! See <https://www.jsonfeed.org/version/1.1/>.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use herald_models::{Checkpoint, Item, SortKey};

use crate::error::SourceError;
use crate::http::get_json;
use crate::text::{strip_html, truncate, DESCRIPTION_LIMIT};
use crate::traits::{timestamp_position, AdapterInfo, SourceAdapter};

/// Top-level feed document.
#[derive(Debug, Clone, Deserialize)]
pub struct Feed {
    #[serde(default)]
    pub title: Option<String>,
    pub items: Vec<FeedItem>,
}

/// One feed entry.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedItem {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content_text: Option<String>,
    #[serde(default)]
    pub content_html: Option<String>,
    #[serde(default)]
    pub date_published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub authors: Vec<FeedAuthor>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Feed entry author.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedAuthor {
    #[serde(default)]
    pub name: Option<String>,
}

/// Reports feed entries published since the checkpoint.
pub struct JsonFeedAdapter {
    info: AdapterInfo,
    client: Client,
    url: String,
}

impl JsonFeedAdapter {
    /// Creates an adapter for the feed at `url`.
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            info: AdapterInfo {
                id: "json_feed".to_string(),
                description: format!("feed {}", url),
            },
            client,
            url,
        }
    }

    /// Converts feed entries into items published strictly after `after`.
    ///
    /// Entries without a publication date cannot be ordered and are skipped.
    pub fn to_items(&self, feed: Feed, after: DateTime<Utc>) -> Vec<Item> {
        let feed_title = feed.title.clone();
        feed.items
            .into_iter()
            .filter_map(|entry| {
                let published = match entry.date_published {
                    Some(ts) => ts,
                    None => {
                        debug!(id = %entry.id, "skipping undated feed entry");
                        return None;
                    }
                };
                (published > after).then(|| to_item(entry, published, feed_title.as_deref()))
            })
            .collect()
    }
}

fn to_item(entry: FeedItem, published: DateTime<Utc>, feed_title: Option<&str>) -> Item {
    let description = entry
        .summary
        .or(entry.content_text)
        .or_else(|| entry.content_html.as_deref().map(strip_html))
        .filter(|d| !d.trim().is_empty());

    let mut payload = json!({
        "title": entry.title.unwrap_or_else(|| entry.id.clone()),
        "timestamp": published.to_rfc3339(),
    });
    if let Some(url) = entry.url {
        payload["url"] = json!(url);
    }
    if let Some(description) = description {
        payload["description"] = json!(truncate(&description, DESCRIPTION_LIMIT));
    }
    if let Some(author) = entry.authors.into_iter().find_map(|a| a.name) {
        payload["author"] = json!(author);
    }
    if let Some(image) = entry.image {
        payload["image"] = json!(image);
    }
    if let Some(feed_title) = feed_title {
        payload["footer"] = json!(feed_title);
    }

    Item::new(entry.id, SortKey::Timestamp(published), payload)
}

#[async_trait]
impl SourceAdapter for JsonFeedAdapter {
    fn info(&self) -> &AdapterInfo {
        &self.info
    }

    async fn fetch_since(&self, checkpoint: &Checkpoint) -> Result<Vec<Item>, SourceError> {
        let since = timestamp_position(checkpoint)?;
        let feed: Feed = get_json(self.client.get(&self.url), &self.url).await?;
        Ok(self.to_items(feed, since))
    }
}
