//! HTTP status API for Herald.
//!
//! A small read-mostly surface over the running scheduler:
//! - `GET /api/health` - liveness plus watcher counts
//! - `GET /api/watchers` - state of every watcher
//! - `GET /api/watchers/:name` - state of one watcher
//! - `POST /api/watchers/:name/resume` - lift a suspension
//!
//! # Example
//!
//! ```ignore
//! use herald_api::{serve, ApiConfig, AppState};
//!
//! let state = AppState::new(ApiConfig::default(), scheduler.handle());
//! tokio::spawn(serve(ApiConfig::default(), state));
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod types;

pub use config::ApiConfig;
pub use error::{ApiError, Result};
pub use router::{create_router, serve};
pub use state::AppState;
