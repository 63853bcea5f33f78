//! The watcher settings file.
//!
//! `watchers.json` lists every watcher together with its cadence, retry and
//! batching limits, the source it polls and where notifications go. Secrets
//! are never stored inline when avoidable: sections name the environment
//! variable holding them.
//!
//! ```json
//! {
//!   "api": { "port": 8765 },
//!   "alerts": { "kind": "discord_webhook", "webhook_url_env": "HERALD_ADMIN_WEBHOOK" },
//!   "watchers": [
//!     {
//!       "name": "herald-issues",
//!       "cadence": { "every_secs": 300 },
//!       "max_retries": 20,
//!       "source": { "kind": "github_issues", "owner": "acme", "repo": "bot", "token_env": "GITHUB_TOKEN" },
//!       "notify": { "kind": "discord_webhook", "webhook_url_env": "ISSUES_WEBHOOK" }
//!     },
//!     {
//!       "name": "dota-patches",
//!       "cadence": { "daily_at": "18:00", "once_per_day": true },
//!       "source": { "kind": "dota_patches" },
//!       "notify": { "kind": "telegram", "chat_id": -100123 }
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use herald_models::watcher::{DEFAULT_BATCH_BYTE_LIMIT, DEFAULT_BATCH_ITEM_LIMIT};
use herald_models::{Cadence, WatcherConfig, WatcherName};

use crate::error::{ConfigError, Result};

/// Default environment variable holding the Telegram bot token.
pub const DEFAULT_TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8765
}

fn default_backoff_base_secs() -> u64 {
    30
}

fn default_backoff_cap_secs() -> u64 {
    30 * 60
}

fn default_batch_item_limit() -> usize {
    DEFAULT_BATCH_ITEM_LIMIT
}

fn default_batch_byte_limit() -> usize {
    DEFAULT_BATCH_BYTE_LIMIT
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_telegram_token_env() -> String {
    DEFAULT_TELEGRAM_TOKEN_ENV.to_string()
}

/// Top-level settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Status API settings.
    #[serde(default)]
    pub api: ApiSettings,
    /// Dedicated destination for failure alerts. When absent, alerts go to
    /// each watcher's own notification channel.
    #[serde(default)]
    pub alerts: Option<NotifySettings>,
    /// Watcher definitions.
    pub watchers: Vec<WatcherSettings>,
}

/// Status API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Whether to serve the status API.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed to call the API from a browser; `*` allows any.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// One watcher entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatcherSettings {
    pub name: String,
    pub cadence: CadenceSettings,
    /// Absent means retry forever.
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    #[serde(default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,
    #[serde(default = "default_batch_item_limit")]
    pub batch_item_limit: usize,
    #[serde(default = "default_batch_byte_limit")]
    pub batch_byte_limit: usize,
    pub source: SourceSettings,
    pub notify: NotifySettings,
}

/// Cadence as written in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CadenceSettings {
    /// `{ "every_secs": 300 }`
    Every { every_secs: u64 },
    /// `{ "daily_at": "18:00", "once_per_day": true }` (UTC)
    Daily {
        daily_at: String,
        #[serde(default)]
        once_per_day: bool,
    },
}

/// Which external system a watcher polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSettings {
    /// New issues of a GitHub repository.
    GithubIssues {
        owner: String,
        repo: String,
        /// Environment variable holding a GitHub token.
        #[serde(default)]
        token_env: Option<String>,
        /// Also report pull requests (the issues API returns both).
        #[serde(default)]
        include_pull_requests: bool,
        /// Override for GitHub Enterprise or tests.
        #[serde(default)]
        api_base: Option<String>,
    },
    /// A JSON Feed (https://jsonfeed.org), e.g. a game's patch-notes blog.
    JsonFeed { url: String },
    /// The Dota 2 patch list datafeed.
    DotaPatches {
        #[serde(default)]
        url: Option<String>,
    },
}

/// Where a watcher's batches (and, by default, its alerts) are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotifySettings {
    /// A Discord channel webhook.
    DiscordWebhook {
        #[serde(default)]
        webhook_url: Option<String>,
        #[serde(default)]
        webhook_url_env: Option<String>,
        /// Display name override for posted messages.
        #[serde(default)]
        username: Option<String>,
    },
    /// A Telegram chat via the Bot API.
    Telegram {
        #[serde(default = "default_telegram_token_env")]
        bot_token_env: String,
        chat_id: i64,
    },
    /// Write notifications to the log only.
    Log,
}

impl Settings {
    /// Loads and validates a settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses settings from a JSON string without touching the filesystem.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let settings: Settings =
            serde_json::from_str(content).map_err(|source| ConfigError::Parse {
                path: "<inline>".into(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks names are unique and every section is usable.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for watcher in &self.watchers {
            if !seen.insert(watcher.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate watcher name {:?}",
                    watcher.name
                )));
            }
            watcher.to_config()?;
            watcher.notify.validate()?;
            watcher.source.validate()?;
        }
        if let Some(alerts) = &self.alerts {
            alerts.validate()?;
        }
        Ok(())
    }
}

impl WatcherSettings {
    /// Builds the runtime watcher definition.
    pub fn to_config(&self) -> Result<WatcherConfig> {
        let name = WatcherName::parse(&self.name)?;
        let cadence = match &self.cadence {
            CadenceSettings::Every { every_secs } => {
                Cadence::Every(Duration::from_secs(*every_secs))
            }
            CadenceSettings::Daily {
                daily_at,
                once_per_day,
            } => Cadence::Daily {
                at: Cadence::parse_time_of_day(daily_at)?,
                once_per_day: *once_per_day,
            },
        };

        let config = WatcherConfig::new(name, cadence)
            .with_max_retries(self.max_retries)
            .with_backoff(
                Duration::from_secs(self.backoff_base_secs),
                Duration::from_secs(self.backoff_cap_secs),
            )
            .with_batch_limits(self.batch_item_limit, self.batch_byte_limit);
        config.validate()?;
        Ok(config)
    }
}

impl SourceSettings {
    fn validate(&self) -> Result<()> {
        match self {
            SourceSettings::GithubIssues {
                owner,
                repo,
                api_base,
                ..
            } => {
                if owner.is_empty() || repo.is_empty() {
                    return Err(ConfigError::Invalid(
                        "github_issues requires owner and repo".to_string(),
                    ));
                }
                if let Some(base) = api_base {
                    parse_url(base)?;
                }
                Ok(())
            }
            SourceSettings::JsonFeed { url } => parse_url(url).map(|_| ()),
            SourceSettings::DotaPatches { url } => match url {
                Some(url) => parse_url(url).map(|_| ()),
                None => Ok(()),
            },
        }
    }
}

impl NotifySettings {
    fn validate(&self) -> Result<()> {
        match self {
            NotifySettings::DiscordWebhook {
                webhook_url,
                webhook_url_env,
                ..
            } => match (webhook_url, webhook_url_env) {
                (Some(url), _) => parse_url(url).map(|_| ()),
                (None, Some(_)) => Ok(()),
                (None, None) => Err(ConfigError::Invalid(
                    "discord_webhook requires webhook_url or webhook_url_env".to_string(),
                )),
            },
            NotifySettings::Telegram { bot_token_env, .. } => {
                if bot_token_env.is_empty() {
                    return Err(ConfigError::Invalid(
                        "telegram requires bot_token_env".to_string(),
                    ));
                }
                Ok(())
            }
            NotifySettings::Log => Ok(()),
        }
    }

    /// Resolves the Discord webhook URL, reading the environment if needed.
    ///
    /// Returns `None` for non-Discord destinations.
    pub fn webhook_url(&self) -> Result<Option<Url>> {
        match self {
            NotifySettings::DiscordWebhook {
                webhook_url,
                webhook_url_env,
                ..
            } => {
                let raw = match (webhook_url, webhook_url_env) {
                    (Some(url), _) => url.clone(),
                    (None, Some(var)) => require_env(var)?,
                    (None, None) => {
                        return Err(ConfigError::Invalid(
                            "discord_webhook requires webhook_url or webhook_url_env".to_string(),
                        ))
                    }
                };
                parse_url(&raw).map(Some)
            }
            _ => Ok(None),
        }
    }
}

/// Reads a required environment variable.
pub fn require_env(var: &str) -> Result<String> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnv(var.to_string()))
}

fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::Invalid(format!("bad url {:?}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Invalid(format!(
            "unsupported url scheme {:?} in {:?}",
            other, raw
        ))),
    }
}
