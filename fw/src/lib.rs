//! feedwatch - fanout feed subscriber with an interactive console
//!
//! Two activities share one process:
//!
//! - the **ingestion loop** ([`ingest`]) pulls payloads from a [`feed`],
//!   decodes them into [`domain::Record`]s and writes them to the store;
//! - the **command interface** ([`repl`]) answers operator commands such as
//!   `last` from the same store.
//!
//! The [`store::Store`] is the only state the two share. It serializes
//! writes and reads behind one lock, so a reader always sees a whole record
//! and no write is lost.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use feedwatch::{EventBus, IngestLoop, Store, feed::ChannelFeed};
//!
//! let store = Arc::new(Store::default());
//! let (tx, feed) = ChannelFeed::pair(16);
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let handle = IngestLoop::new(feed, store.clone(), EventBus::default()).spawn(shutdown_rx);
//! tx.send(br#"{"value": 42, "unit": "USD"}"#.to_vec()).await?;
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod events;
pub mod feed;
pub mod ingest;
pub mod remote;
pub mod repl;
pub mod store;

pub use config::Config;
pub use domain::{DecodeError, Record};
pub use events::{EventBus, FeedEvent};
pub use feed::{Feed, FeedError};
pub use ingest::{IngestLoop, IngestSummary, StopReason};
pub use remote::{LastItemClient, RemoteError};
pub use repl::{ReplError, ReplSession, SessionEnd};
pub use store::{Store, StoreOptions};
