//! AMQP (RabbitMQ) fanout subscription
//!
//! Binds a server-named, exclusive, auto-delete queue to a fanout exchange
//! and consumes with automatic acknowledgement. There is no reconnect: when
//! the consumer stream ends or errors, the feed is finished.

use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    Channel, Connection, ConnectionProperties, Consumer, ExchangeKind,
    options::{BasicConsumeOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::FieldTable,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Feed, FeedError};
use crate::config::AmqpConfig;

/// Live subscription to a fanout exchange
pub struct AmqpFeed {
    connection: Connection,
    // the consumer stops delivering once its channel is dropped
    _channel: Channel,
    consumer: Consumer,
    exchange: String,
    queue: String,
}

impl AmqpFeed {
    /// Connect and subscribe to the configured exchange
    pub async fn subscribe(config: &AmqpConfig) -> Result<Self, FeedError> {
        debug!(exchange = %config.exchange, "AmqpFeed::subscribe: called");

        let connection = Connection::connect(&config.url, ConnectionProperties::default())
            .await
            .map_err(|e| FeedError::Connection(format!("Failed to connect: {}", e)))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| FeedError::Connection(format!("Failed to create channel: {}", e)))?;

        channel
            .exchange_declare(
                &config.exchange,
                ExchangeKind::Fanout,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| FeedError::Subscribe(format!("Failed to declare exchange: {}", e)))?;

        let queue = channel
            .queue_declare(
                "",
                QueueDeclareOptions {
                    exclusive: true,
                    auto_delete: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| FeedError::Subscribe(format!("Failed to declare queue: {}", e)))?;
        let queue = queue.name().as_str().to_string();

        channel
            .queue_bind(
                &queue,
                &config.exchange,
                "",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| FeedError::Subscribe(format!("Failed to bind queue: {}", e)))?;

        let consumer_tag = format!("feedwatch-{}", Uuid::now_v7());
        let consumer = channel
            .basic_consume(
                &queue,
                &consumer_tag,
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| FeedError::Subscribe(format!("Failed to start consumer: {}", e)))?;

        info!(exchange = %config.exchange, %queue, %consumer_tag, "Subscribed to fanout exchange");

        Ok(Self {
            connection,
            _channel: channel,
            consumer,
            exchange: config.exchange.clone(),
            queue,
        })
    }
}

#[async_trait]
impl Feed for AmqpFeed {
    async fn next_payload(&mut self) -> Result<Option<Vec<u8>>, FeedError> {
        match self.consumer.next().await {
            Some(Ok(delivery)) => {
                debug!(len = delivery.data.len(), "AmqpFeed: delivery");
                Ok(Some(delivery.data))
            }
            Some(Err(e)) => Err(FeedError::Delivery(e.to_string())),
            None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        format!("amqp:{}/{}", self.exchange, self.queue)
    }

    async fn close(&mut self) {
        if let Err(e) = self.connection.close(200, "feedwatch shutting down").await {
            warn!(error = %e, "Failed to close AMQP connection");
        }
    }
}
