//! Herald binary.
//!
//! Start watching with:
//! ```bash
//! herald --config ~/.herald/config/watchers.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use herald::{App, Options};
use herald_core::{config, Settings};
use herald_persistence::JsonCheckpointStore;
use tracing_subscriber::EnvFilter;

/// Herald - announce new items from watched sources exactly once
#[derive(Parser, Debug)]
#[command(name = "herald", version)]
#[command(about = "Watches sources for new items and announces each one exactly once")]
struct Args {
    /// Settings file (default: ~/.herald/config/watchers.json)
    #[arg(short, long, env = "HERALD_CONFIG")]
    config: Option<String>,

    /// Log notifications instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Do not serve the status API
    #[arg(long)]
    no_api: bool,

    /// Status API port (overrides the settings file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    config::load_env();

    // RUST_LOG wins over -v
    let filter = match args.verbose {
        0 => "herald=info,herald_runtime=info,teloxide=warn",
        1 => "herald=debug,herald_runtime=debug,herald_adapters=debug,herald_notify=debug",
        2 => "herald=trace,herald_runtime=trace,herald_adapters=trace,herald_notify=trace",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let settings_path: PathBuf = match args.config.as_deref() {
        Some(raw) => config::expand_path(raw),
        None => config::settings_file(),
    };
    let settings = match Settings::load(&settings_path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(path = %settings_path.display(), error = %e, "failed to load settings");
            return Err(e.into());
        }
    };

    if let Err(e) = config::ensure_all_dirs() {
        tracing::warn!(error = %e, "Failed to create all directories");
    }
    let store = Arc::new(JsonCheckpointStore::new(config::checkpoints_dir()));

    let options = Options {
        dry_run: args.dry_run,
        no_api: args.no_api,
        port: args.port,
    };
    let app = App::build(&settings, store, &options).await?;

    println!("\nHerald");
    println!("   Watchers: {}", settings.watchers.len());
    if args.dry_run {
        println!("   Mode: dry run (notifications are logged)");
    }
    if let Some(api) = app.api_config() {
        println!("   Status API: http://{}/api/health", api.bind_address());
    }
    println!("   Press Ctrl+C to stop\n");

    app.run().await?;
    Ok(())
}
