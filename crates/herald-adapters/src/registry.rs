//! Adapter registry: one source adapter per configured watcher.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use tracing::warn;

use herald_core::{ConfigError, Settings, SourceSettings};

use crate::dota::DotaPatchAdapter;
use crate::github::GithubIssuesAdapter;
use crate::json_feed::JsonFeedAdapter;
use crate::traits::SourceAdapter;

/// Registry of source adapters keyed by watcher name.
///
/// Adapters are stored as `Arc<dyn SourceAdapter>` so the scheduler can hand
/// them to watcher tasks.
///
/// # Example
///
/// ```ignore
/// use herald_adapters::AdapterRegistry;
///
/// let registry = AdapterRegistry::from_settings(&settings, client)?;
/// for name in registry.list() {
///     let adapter = registry.get(name).unwrap();
///     println!("{}: {}", name, adapter.info().description);
/// }
/// ```
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an adapter for every watcher in `settings`, sharing one HTTP client.
    pub fn from_settings(settings: &Settings, client: Client) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for watcher in &settings.watchers {
            let adapter = build_adapter(&watcher.source, client.clone());
            registry.register(watcher.name.clone(), adapter);
        }
        Ok(registry)
    }

    /// Registers the adapter for a watcher, replacing any previous one.
    pub fn register(&mut self, watcher: impl Into<String>, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(watcher.into(), adapter);
    }

    /// Gets the adapter for a watcher.
    pub fn get(&self, watcher: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(watcher).cloned()
    }

    /// Lists the watchers that have an adapter, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.adapters.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered adapters.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Returns true if no adapters are registered.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Builds the adapter described by one `source` section.
pub fn build_adapter(source: &SourceSettings, client: Client) -> Arc<dyn SourceAdapter> {
    match source {
        SourceSettings::GithubIssues {
            owner,
            repo,
            token_env,
            include_pull_requests,
            api_base,
        } => {
            let token = token_env.as_deref().and_then(|var| match std::env::var(var) {
                Ok(token) if !token.is_empty() => Some(token),
                _ => {
                    warn!(var, "github token variable not set, using unauthenticated requests");
                    None
                }
            });
            let mut adapter = GithubIssuesAdapter::new(client, owner, repo)
                .with_token(token)
                .including_pull_requests(*include_pull_requests);
            if let Some(base) = api_base {
                adapter = adapter.with_api_base(base.as_str());
            }
            Arc::new(adapter)
        }
        SourceSettings::JsonFeed { url } => Arc::new(JsonFeedAdapter::new(client, url.as_str())),
        SourceSettings::DotaPatches { url } => match url {
            Some(url) => Arc::new(DotaPatchAdapter::with_url(client, url.as_str())),
            None => Arc::new(DotaPatchAdapter::new(client)),
        },
    }
}
