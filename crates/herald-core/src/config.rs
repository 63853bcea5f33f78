//! Shared configuration paths for Herald.
//!
//! # Storage Structure
//!
//! ```text
//! ~/.herald/
//! ├── config/        # watchers.json and .env.local
//! └── checkpoints/   # one JSON checkpoint per watcher
//! ```
//!
//! # Environment Variables
//!
//! - `HERALD_STATE_DIR`: Override the base state directory
//! - `HERALD_CONFIG_DIR`: Override the config directory
//! - `HERALD_CHECKPOINT_DIR`: Override the checkpoint directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::debug;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "HERALD_STATE_DIR";

/// Environment variable for custom config directory.
pub const CONFIG_DIR_ENV: &str = "HERALD_CONFIG_DIR";

/// Environment variable for custom checkpoint directory.
pub const CHECKPOINT_DIR_ENV: &str = "HERALD_CHECKPOINT_DIR";

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".herald";

const CONFIG_SUBDIR: &str = "config";
const CHECKPOINTS_SUBDIR: &str = "checkpoints";

static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Get the Herald state directory.
///
/// Resolved once per process from:
/// 1. `HERALD_STATE_DIR` if set
/// 2. `~/.herald` if a home directory is available
/// 3. `.herald` in the current directory
pub fn state_dir() -> PathBuf {
    STATE_DIR_CACHE
        .get_or_init(|| {
            std::env::var(STATE_DIR_ENV)
                .map(|p| expand_path(&p))
                .unwrap_or_else(|_| {
                    dirs::home_dir()
                        .map(|h| h.join(DEFAULT_STATE_DIR))
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
                })
        })
        .clone()
}

/// Get the config directory (`~/.herald/config/` or `HERALD_CONFIG_DIR`).
pub fn config_dir() -> PathBuf {
    std::env::var(CONFIG_DIR_ENV)
        .map(|p| expand_path(&p))
        .unwrap_or_else(|_| state_dir().join(CONFIG_SUBDIR))
}

/// Get the checkpoint directory (`~/.herald/checkpoints/` or `HERALD_CHECKPOINT_DIR`).
pub fn checkpoints_dir() -> PathBuf {
    std::env::var(CHECKPOINT_DIR_ENV)
        .map(|p| expand_path(&p))
        .unwrap_or_else(|_| state_dir().join(CHECKPOINTS_SUBDIR))
}

/// Default settings file path.
pub fn settings_file() -> PathBuf {
    config_dir().join("watchers.json")
}

/// Environment file for secrets (webhook URLs, tokens).
pub fn env_file() -> PathBuf {
    config_dir().join(".env.local")
}

/// Expands `~` and environment variables in a user-supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

/// Loads secrets into the process environment.
///
/// The config-directory `.env.local` is read first, then `.env.local` or
/// `.env` in the working directory. Variables already set are kept.
pub fn load_env() {
    load_env_from(&env_file());
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());
}

fn load_env_from(path: &Path) {
    if path.exists() {
        if let Err(e) = dotenvy::from_path(path) {
            debug!(path = %path.display(), error = %e, "failed to load env file");
        }
    }
}

/// Ensure the state directory layout exists.
///
/// # Errors
/// Returns an error if any directory cannot be created.
pub fn ensure_all_dirs() -> std::io::Result<()> {
    std::fs::create_dir_all(config_dir())?;
    std::fs::create_dir_all(checkpoints_dir())?;
    Ok(())
}
