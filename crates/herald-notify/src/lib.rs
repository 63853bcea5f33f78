//! Notification delivery for Herald.
//!
//! Watchers hand finished batches to a [`Notifier`] and report the start of
//! a failure episode (or a suspension) to an [`AlertSink`]. Every concrete
//! destination here implements both, so a channel that receives a watcher's
//! updates can also receive its alerts.
//!
//! - [`DiscordWebhookNotifier`]: embeds posted to a channel webhook
//! - [`TelegramNotifier`]: HTML messages sent by a bot
//! - [`LogNotifier`]: tracing output only, used for dry runs
//! - [`RoutingNotifier`]: picks the destination by watcher name

pub mod discord;
pub mod error;
pub mod log;
pub mod routing;
pub mod telegram;
pub mod traits;

pub use discord::DiscordWebhookNotifier;
pub use error::{DeliveryError, Result};
pub use log::LogNotifier;
pub use routing::{build_channel, RoutingNotifier};
pub use telegram::TelegramNotifier;
pub use traits::{AlertSink, Channel, Notifier};
