//! Herald Core - shared configuration for all Herald crates.
//!
//! - **config**: state directory layout and environment loading
//! - **settings**: the `watchers.json` settings file describing every watcher,
//!   its source and where its notifications go

pub mod config;
pub mod error;
pub mod settings;

pub use config::{
    checkpoints_dir, config_dir, ensure_all_dirs, env_file, expand_path, load_env, settings_file,
    state_dir,
};
pub use error::{ConfigError, Result};
pub use settings::{
    ApiSettings, CadenceSettings, NotifySettings, Settings, SourceSettings, WatcherSettings,
};
