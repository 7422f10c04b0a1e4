//! Inbound payload feeds
//!
//! A [`Feed`] is an unbounded, lazily pulled sequence of raw payloads. It
//! ends (`Ok(None)`) only when the underlying source is closed.
//!
//! - [`AmqpFeed`] - fanout exchange subscription on a RabbitMQ broker
//! - [`ReplayFeed`] - newline-delimited payloads read from a file
//! - [`ChannelFeed`] - payloads pushed through an in-process channel

mod amqp;
mod channel;
mod replay;

use async_trait::async_trait;
use thiserror::Error;

pub use amqp::AmqpFeed;
pub use channel::ChannelFeed;
pub use replay::ReplayFeed;

/// Errors raised while obtaining or reading a feed
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Subscription setup failed: {0}")]
    Subscribe(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of raw payloads for the ingestion loop
#[async_trait]
pub trait Feed: Send {
    /// Wait for the next payload
    ///
    /// Returns `Ok(None)` once the feed has been closed by its source.
    async fn next_payload(&mut self) -> Result<Option<Vec<u8>>, FeedError>;

    /// Human readable description of the source, for logs
    fn describe(&self) -> String;

    /// Release the underlying source
    async fn close(&mut self) {}
}
