//! Per-watcher routing of batches and alerts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use teloxide::Bot;
use tracing::{info, warn};

use herald_core::settings::require_env;
use herald_core::{ConfigError, NotifySettings, Settings};
use herald_models::{Batch, WatcherName};

use crate::discord::DiscordWebhookNotifier;
use crate::error::{DeliveryError, Result};
use crate::log::LogNotifier;
use crate::telegram::TelegramNotifier;
use crate::traits::{AlertSink, Channel, Notifier};

/// Dispatches each batch to the channel configured for its watcher.
///
/// Alerts go to the dedicated alert channel when one is set, otherwise to
/// the watcher's own channel.
#[derive(Default)]
pub struct RoutingNotifier {
    routes: HashMap<WatcherName, Arc<dyn Channel>>,
    alerts: Option<Arc<dyn Channel>>,
}

impl RoutingNotifier {
    /// Creates a notifier with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds routes for every watcher in `settings`.
    ///
    /// With `dry_run`, every route and the alert channel log instead of sending.
    pub fn from_settings(
        settings: &Settings,
        client: Client,
        dry_run: bool,
    ) -> std::result::Result<Self, ConfigError> {
        let mut builder = ChannelBuilder::new(client);
        let mut routing = Self::new();

        for watcher in &settings.watchers {
            let name = WatcherName::parse(&watcher.name)?;
            let channel = if dry_run {
                Arc::new(LogNotifier::new()) as Arc<dyn Channel>
            } else {
                builder.build(&watcher.notify)?
            };
            routing.add_route(name, channel);
        }

        if let Some(alerts) = &settings.alerts {
            let channel = if dry_run {
                Arc::new(LogNotifier::new()) as Arc<dyn Channel>
            } else {
                builder.build(alerts)?
            };
            routing = routing.with_alert_channel(channel);
        }

        info!(routes = routing.routes.len(), dry_run, "notification routes ready");
        Ok(routing)
    }

    /// Routes a watcher's batches (and alerts, by default) to `channel`.
    pub fn add_route(&mut self, watcher: WatcherName, channel: Arc<dyn Channel>) {
        self.routes.insert(watcher, channel);
    }

    /// Sends all alerts to `channel`.
    pub fn with_alert_channel(mut self, channel: Arc<dyn Channel>) -> Self {
        self.alerts = Some(channel);
        self
    }

    /// Returns true if the watcher has a route.
    pub fn has_route(&self, watcher: &WatcherName) -> bool {
        self.routes.contains_key(watcher)
    }
}

#[async_trait]
impl Notifier for RoutingNotifier {
    async fn deliver(&self, batch: &Batch) -> Result<()> {
        match self.routes.get(&batch.watcher) {
            Some(channel) => channel.deliver(batch).await,
            None => Err(DeliveryError::NoRoute(batch.watcher.to_string())),
        }
    }
}

#[async_trait]
impl AlertSink for RoutingNotifier {
    async fn alert(&self, watcher: &WatcherName, message: &str) {
        match self.alerts.as_ref().or_else(|| self.routes.get(watcher)) {
            Some(channel) => channel.alert(watcher, message).await,
            None => warn!(watcher = %watcher, "no alert channel: {}", message),
        }
    }
}

/// Builds channels, sharing one bot per Telegram token.
struct ChannelBuilder {
    client: Client,
    bots: HashMap<String, Bot>,
}

impl ChannelBuilder {
    fn new(client: Client) -> Self {
        Self {
            client,
            bots: HashMap::new(),
        }
    }

    fn build(
        &mut self,
        settings: &NotifySettings,
    ) -> std::result::Result<Arc<dyn Channel>, ConfigError> {
        match settings {
            NotifySettings::DiscordWebhook { username, .. } => {
                let url = settings.webhook_url()?.ok_or_else(|| {
                    ConfigError::Invalid("discord_webhook without a webhook url".to_string())
                })?;
                Ok(Arc::new(
                    DiscordWebhookNotifier::new(self.client.clone(), url)
                        .with_username(username.clone()),
                ))
            }
            NotifySettings::Telegram {
                bot_token_env,
                chat_id,
            } => {
                let bot = match self.bots.get(bot_token_env) {
                    Some(bot) => bot.clone(),
                    None => {
                        let bot = Bot::new(require_env(bot_token_env)?);
                        self.bots.insert(bot_token_env.clone(), bot.clone());
                        bot
                    }
                };
                Ok(Arc::new(TelegramNotifier::new(bot, *chat_id)))
            }
            NotifySettings::Log => Ok(Arc::new(LogNotifier::new())),
        }
    }
}

/// Builds a standalone channel from one `notify` section.
pub fn build_channel(
    settings: &NotifySettings,
    client: Client,
) -> std::result::Result<Arc<dyn Channel>, ConfigError> {
    ChannelBuilder::new(client).build(settings)
}
