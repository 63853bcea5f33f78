//! Herald - wiring for the `herald` binary.
//!
//! Turns a parsed settings file into a running scheduler with its adapters,
//! notifiers and optional status API.

pub mod app;

pub use app::{App, AppError, Options};
