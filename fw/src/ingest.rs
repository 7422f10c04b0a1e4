//! Ingestion loop
//!
//! Pulls payloads from a [`Feed`], decodes them, and writes each decoded
//! record into the shared [`Store`]. Malformed payloads are reported and
//! skipped; they never touch the store and never stop the loop.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::Record;
use crate::events::{EventBus, FeedEvent};
use crate::feed::Feed;
use crate::store::Store;

/// Counters reported when the loop finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Payloads pulled from the feed
    pub received: u64,
    /// Payloads decoded and written to the store
    pub decoded: u64,
    /// Payloads rejected as malformed
    pub rejected: u64,
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The feed source closed
    FeedClosed,
    /// The feed failed to deliver
    FeedError,
    /// Shutdown was signalled
    Shutdown,
}

/// The background consumer of a feed
pub struct IngestLoop {
    feed: Box<dyn Feed>,
    store: Arc<Store>,
    events: EventBus,
    summary: IngestSummary,
}

impl IngestLoop {
    pub fn new(feed: impl Feed + 'static, store: Arc<Store>, events: EventBus) -> Self {
        Self {
            feed: Box::new(feed),
            store,
            events,
            summary: IngestSummary::default(),
        }
    }

    /// Run on a dedicated tokio task
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<(IngestSummary, StopReason)> {
        tokio::spawn(self.run(shutdown))
    }

    /// Consume the feed until it closes or `shutdown` flips to true
    ///
    /// Dropping the shutdown sender also stops the loop.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> (IngestSummary, StopReason) {
        let source = self.feed.describe();
        info!(%source, "Ingestion loop starting");

        let reason = loop {
            if *shutdown.borrow() {
                break StopReason::Shutdown;
            }

            let next = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break StopReason::Shutdown;
                    }
                    continue;
                }
                next = self.feed.next_payload() => next,
            };

            match next {
                Ok(Some(payload)) => self.handle_payload(&payload),
                Ok(None) => {
                    info!(%source, "Feed closed by source");
                    self.events.emit(FeedEvent::FeedClosed {
                        reason: format!("{} closed", source),
                    });
                    break StopReason::FeedClosed;
                }
                Err(e) => {
                    warn!(%source, error = %e, "Feed failed, ingestion stopping");
                    self.events.emit(FeedEvent::FeedClosed { reason: e.to_string() });
                    break StopReason::FeedError;
                }
            }
        };

        if reason == StopReason::Shutdown {
            debug!(%source, "Ingestion loop: shutdown requested, closing feed");
            self.feed.close().await;
        }

        info!(
            %source,
            ?reason,
            received = self.summary.received,
            decoded = self.summary.decoded,
            rejected = self.summary.rejected,
            "Ingestion loop stopped"
        );
        (self.summary, reason)
    }

    fn handle_payload(&mut self, payload: &[u8]) {
        self.summary.received += 1;
        let received_at = Utc::now();

        match Record::decode(payload) {
            Ok(record) => {
                let record = self.store.write(record);
                self.summary.decoded += 1;
                debug!(summary = %record.summary(), "Ingested record");
                self.events.emit(FeedEvent::RecordReceived { record, received_at });
            }
            Err(error) => {
                self.summary.rejected += 1;
                warn!(%error, "Skipping malformed payload");
                self.events.emit(FeedEvent::DecodeFailed { error, received_at });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ChannelFeed;
    use std::time::Duration;

    fn payload(value: u64, unit: &str) -> Vec<u8> {
        format!(r#"{{"indicator_id": "I", "country_iso3_code": "USA", "value": {}, "unit": "{}"}}"#, value, unit)
            .into_bytes()
    }

    #[tokio::test]
    async fn test_decoded_payloads_reach_store() {
        let store = Arc::new(Store::default());
        let (tx, feed) = ChannelFeed::pair(16);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = IngestLoop::new(feed, Arc::clone(&store), EventBus::default()).spawn(shutdown_rx);

        tx.send(payload(1, "USD")).await.unwrap();
        tx.send(payload(2, "EUR")).await.unwrap();
        drop(tx);

        let (summary, reason) = handle.await.unwrap();
        assert_eq!(reason, StopReason::FeedClosed);
        assert_eq!(summary.decoded, 2);
        assert_eq!(store.read_latest().map(|r| r.value), Some(2));
        assert_eq!(store.read_history().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_payloads_are_skipped() {
        let store = Arc::new(Store::default());
        let (tx, feed) = ChannelFeed::pair(16);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = IngestLoop::new(feed, Arc::clone(&store), EventBus::default()).spawn(shutdown_rx);

        tx.send(b"not json".to_vec()).await.unwrap();
        tx.send(payload(42, "USD")).await.unwrap();
        tx.send(br#"{"value": -1}"#.to_vec()).await.unwrap();
        tx.send(br#"{"unit": 9}"#.to_vec()).await.unwrap();
        drop(tx);

        let (summary, _) = handle.await.unwrap();
        assert_eq!(
            summary,
            IngestSummary {
                received: 4,
                decoded: 1,
                rejected: 3
            }
        );
        let latest = store.read_latest().unwrap();
        assert_eq!(latest.value, 42);
        assert_eq!(latest.unit, "USD");
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_only_malformed_leaves_store_empty() {
        let store = Arc::new(Store::default());
        let (tx, feed) = ChannelFeed::pair(4);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = IngestLoop::new(feed, Arc::clone(&store), EventBus::default()).spawn(shutdown_rx);

        tx.send(b"{".to_vec()).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert!(store.read_latest().is_none());
    }

    #[tokio::test]
    async fn test_events_follow_store_writes() {
        let store = Arc::new(Store::default());
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let (tx, feed) = ChannelFeed::pair(4);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = IngestLoop::new(feed, Arc::clone(&store), bus).spawn(shutdown_rx);

        tx.send(b"bad".to_vec()).await.unwrap();
        tx.send(payload(5, "kg")).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert!(matches!(events.recv().await.unwrap(), FeedEvent::DecodeFailed { .. }));
        match events.recv().await.unwrap() {
            FeedEvent::RecordReceived { record, .. } => {
                let latest = store.read_latest().unwrap();
                assert!(Arc::ptr_eq(&record, &latest));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(events.recv().await.unwrap(), FeedEvent::FeedClosed { .. }));
    }

    #[tokio::test]
    async fn test_shutdown_stops_idle_loop() {
        let store = Arc::new(Store::default());
        let (_tx, feed) = ChannelFeed::pair(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = IngestLoop::new(feed, store, EventBus::default()).spawn(shutdown_rx);

        shutdown_tx.send(true).unwrap();

        let (_, reason) = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("ingestion loop should stop on shutdown")
            .unwrap();
        assert_eq!(reason, StopReason::Shutdown);
    }

    #[tokio::test]
    async fn test_arrival_order_is_preserved() {
        let store = Arc::new(Store::default());
        let (tx, feed) = ChannelFeed::pair(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = IngestLoop::new(feed, Arc::clone(&store), EventBus::default()).spawn(shutdown_rx);

        let producer = tokio::spawn(async move {
            for v in 0..500u64 {
                tx.send(payload(v, "u")).await.unwrap();
            }
        });

        // concurrent readers only ever see whole records
        for _ in 0..200 {
            if let Some(r) = store.read_latest() {
                assert_eq!(r.unit, "u");
                assert_eq!(r.country_iso3_code, "USA");
            }
            tokio::task::yield_now().await;
        }

        producer.await.unwrap();
        handle.await.unwrap();

        let values: Vec<u64> = store.read_history().iter().map(|r| r.value).collect();
        assert_eq!(values, (0..500).collect::<Vec<_>>());
        assert_eq!(store.read_latest().map(|r| r.value), Some(499));
    }
}
