//! In-process channel feed

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Feed, FeedError};

/// Feed backed by an mpsc receiver; closes when every sender is dropped
pub struct ChannelFeed {
    rx: mpsc::Receiver<Vec<u8>>,
}

impl ChannelFeed {
    pub fn new(rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { rx }
    }

    /// Create a feed together with the sender that drives it
    pub fn pair(capacity: usize) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl Feed for ChannelFeed {
    async fn next_payload(&mut self) -> Result<Option<Vec<u8>>, FeedError> {
        Ok(self.rx.recv().await)
    }

    fn describe(&self) -> String {
        "channel".to_string()
    }
}
