//! Dota 2 patch list adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use herald_models::{Checkpoint, Item, SortKey};

use crate::error::SourceError;
use crate::http::get_json;
use crate::traits::{timestamp_position, AdapterInfo, SourceAdapter};

/// Official patch list datafeed.
pub const DEFAULT_PATCH_LIST_URL: &str =
    "https://www.dota2.com/datafeed/patchnoteslist?language=english";

const PATCH_PAGE_BASE: &str = "https://www.dota2.com/patches/";

/// Response of the patch list datafeed.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchList {
    pub patches: Vec<Patch>,
    #[serde(default)]
    pub success: Option<bool>,
}

/// One patch entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Patch {
    pub patch_number: String,
    #[serde(default)]
    pub patch_name: Option<String>,
    /// Unix seconds.
    pub patch_timestamp: i64,
}

/// Reports Dota 2 patches released since the checkpoint.
pub struct DotaPatchAdapter {
    info: AdapterInfo,
    client: Client,
    url: String,
}

impl DotaPatchAdapter {
    /// Creates an adapter for the official datafeed.
    pub fn new(client: Client) -> Self {
        Self::with_url(client, DEFAULT_PATCH_LIST_URL)
    }

    /// Creates an adapter for a mirror of the datafeed.
    pub fn with_url(client: Client, url: impl Into<String>) -> Self {
        Self {
            info: AdapterInfo {
                id: "dota_patches".to_string(),
                description: "Dota 2 patch releases".to_string(),
            },
            client,
            url: url.into(),
        }
    }

    /// Converts the patch list into items released strictly after `after`.
    pub fn to_items(&self, list: PatchList, after: DateTime<Utc>) -> Result<Vec<Item>, SourceError> {
        if list.success == Some(false) {
            return Err(SourceError::transient("patch list reported success=false"));
        }

        let mut items = Vec::new();
        for patch in list.patches {
            let released = DateTime::<Utc>::from_timestamp(patch.patch_timestamp, 0).ok_or_else(|| {
                SourceError::fatal(format!(
                    "patch {} has invalid timestamp {}",
                    patch.patch_number, patch.patch_timestamp
                ))
            })?;
            if released <= after {
                continue;
            }

            let name = patch.patch_name.unwrap_or_else(|| patch.patch_number.clone());
            items.push(Item::new(
                format!("dota-{}", patch.patch_number),
                SortKey::Timestamp(released),
                json!({
                    "title": format!("Dota 2 patch {}", name),
                    "url": format!("{}{}", PATCH_PAGE_BASE, patch.patch_number),
                    "description": format!("Gameplay update {} is live.", patch.patch_number),
                    "timestamp": released.to_rfc3339(),
                    "footer": "Dota 2",
                }),
            ));
        }
        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for DotaPatchAdapter {
    fn info(&self) -> &AdapterInfo {
        &self.info
    }

    async fn fetch_since(&self, checkpoint: &Checkpoint) -> Result<Vec<Item>, SourceError> {
        let since = timestamp_position(checkpoint)?;
        let list: PatchList = get_json(self.client.get(&self.url), "dota patch list").await?;
        self.to_items(list, since)
    }
}
