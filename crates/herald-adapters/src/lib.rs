//! Source adapters for Herald.
//!
//! An adapter knows how to ask one external system "what appeared since
//! this checkpoint?" and how to classify its own failures as transient
//! (retry with backoff) or fatal (suspend the watcher).
//!
//! # Key Concepts
//!
//! - **SourceAdapter**: trait every adapter implements
//! - **SourceError**: failure tagged `Transient` or `Fatal`
//! - **AdapterRegistry**: builds one adapter per configured watcher
//!
//! # Payload conventions
//!
//! Adapters emit items whose payload is a JSON object using these keys,
//! which the notifiers know how to render: `title`, `url`, `description`,
//! `author`, `timestamp` (RFC 3339), `footer`.

pub mod dota;
pub mod error;
pub mod github;
pub mod http;
pub mod json_feed;
pub mod registry;
pub mod text;
pub mod traits;

pub use dota::DotaPatchAdapter;
pub use error::SourceError;
pub use github::GithubIssuesAdapter;
pub use json_feed::JsonFeedAdapter;
pub use registry::{build_adapter, AdapterRegistry};
pub use traits::{AdapterInfo, SourceAdapter};
