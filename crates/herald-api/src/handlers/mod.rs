//! API request handlers.

pub mod health;
pub mod watchers;

pub use health::*;
pub use watchers::*;
