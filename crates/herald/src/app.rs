//! Application wiring and lifecycle.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use herald_adapters::{http, AdapterRegistry};
use herald_api::{ApiConfig, AppState};
use herald_core::{ConfigError, Settings};
use herald_notify::RoutingNotifier;
use herald_persistence::CheckpointStore;
use herald_runtime::{RuntimeError, Scheduler};

/// Errors that stop the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for application wiring.
pub type Result<T> = std::result::Result<T, AppError>;

/// Command-line overrides applied on top of the settings file.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Log notifications instead of sending them.
    pub dry_run: bool,
    /// Never start the status API.
    pub no_api: bool,
    /// Port override for the status API.
    pub port: Option<u16>,
}

/// A configured, not yet started Herald instance.
pub struct App {
    scheduler: Scheduler,
    api: Option<ApiConfig>,
}

impl App {
    /// Builds adapters, notifiers and the scheduler from settings.
    pub async fn build(
        settings: &Settings,
        store: Arc<dyn CheckpointStore>,
        options: &Options,
    ) -> Result<Self> {
        let client = http::build_client(http::DEFAULT_TIMEOUT)?;
        let adapters = AdapterRegistry::from_settings(settings, client.clone())?;
        let notifier = Arc::new(RoutingNotifier::from_settings(
            settings,
            client,
            options.dry_run,
        )?);

        let mut scheduler = Scheduler::new(store, notifier.clone(), notifier);
        for watcher in &settings.watchers {
            let config = watcher.to_config()?;
            let adapter = adapters.get(&watcher.name).ok_or_else(|| {
                ConfigError::Invalid(format!("no adapter for watcher {}", watcher.name))
            })?;
            info!(
                watcher = %config.name,
                source = %adapter.info().description,
                "registering watcher"
            );
            scheduler.register(config, adapter).await?;
        }

        let api = if settings.api.enabled && !options.no_api {
            let config = ApiConfig::from_settings(&settings.api);
            Some(match options.port {
                Some(port) => config.with_port(port),
                None => config,
            })
        } else {
            None
        };

        Ok(Self { scheduler, api })
    }

    /// The scheduler, for inspection before `run`.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Status API configuration, if the API will be served.
    pub fn api_config(&self) -> Option<&ApiConfig> {
        self.api.as_ref()
    }

    /// Runs until Ctrl+C, then drains in-flight deliveries.
    pub async fn run(mut self) -> Result<()> {
        self.scheduler.start().await?;

        if let Some(config) = self.api.take() {
            let state = AppState::new(config.clone(), self.scheduler.handle());
            tokio::spawn(async move {
                if let Err(e) = herald_api::serve(config, state).await {
                    error!(error = %e, "status API stopped");
                }
            });
        }

        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C, shutting down");
        }
        info!("shutting down, waiting for in-flight deliveries");
        self.scheduler.stop().await?;
        info!("stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_persistence::MemoryCheckpointStore;

    const SETTINGS: &str = r#"{
        "api": { "port": 9100 },
        "watchers": [
            {
                "name": "dota-patches",
                "cadence": { "daily_at": "18:00" },
                "source": { "kind": "dota_patches" },
                "notify": { "kind": "log" }
            },
            {
                "name": "blog",
                "cadence": { "every_secs": 600 },
                "source": { "kind": "json_feed", "url": "https://example.com/feed.json" },
                "notify": { "kind": "discord_webhook", "webhook_url": "https://discord.com/api/webhooks/1/abc" }
            }
        ]
    }"#;

    fn store() -> Arc<dyn CheckpointStore> {
        Arc::new(MemoryCheckpointStore::new())
    }

    #[tokio::test]
    async fn test_build_registers_every_watcher() {
        let settings = Settings::from_json_str(SETTINGS).unwrap();
        let app = App::build(&settings, store(), &Options::default())
            .await
            .unwrap();

        let names: Vec<String> = app
            .scheduler()
            .snapshots()
            .await
            .into_iter()
            .map(|s| s.name.to_string())
            .collect();
        assert_eq!(names, vec!["blog", "dota-patches"]);
        assert!(!app.scheduler().is_started());
        assert_eq!(app.api_config().unwrap().port, 9100);
    }

    #[tokio::test]
    async fn test_cli_overrides_api() {
        let settings = Settings::from_json_str(SETTINGS).unwrap();

        let options = Options {
            port: Some(9200),
            ..Options::default()
        };
        let app = App::build(&settings, store(), &options).await.unwrap();
        assert_eq!(app.api_config().unwrap().bind_address(), "127.0.0.1:9200");

        let options = Options {
            no_api: true,
            dry_run: true,
            ..Options::default()
        };
        let app = App::build(&settings, store(), &options).await.unwrap();
        assert!(app.api_config().is_none());
    }
}
