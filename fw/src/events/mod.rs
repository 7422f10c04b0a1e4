//! Feed activity events
//!
//! The ingestion loop reports every outcome to an [`EventBus`]; consumers
//! (the terminal notifier, tests) subscribe to receive them.

mod bus;
mod notifier;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus};
pub use notifier::{render_event, spawn_notifier};
pub use types::FeedEvent;
