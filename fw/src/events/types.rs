//! Event types emitted by the ingestion loop

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{DecodeError, Record};

/// Something observable that happened on the inbound feed
#[derive(Clone, Debug)]
pub enum FeedEvent {
    /// A payload decoded and was written to the store
    RecordReceived {
        record: Arc<Record>,
        received_at: DateTime<Utc>,
    },
    /// A payload was malformed and skipped
    DecodeFailed {
        error: DecodeError,
        received_at: DateTime<Utc>,
    },
    /// The feed ended; no further records will arrive
    FeedClosed { reason: String },
}

impl FeedEvent {
    /// Stable name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RecordReceived { .. } => "record_received",
            Self::DecodeFailed { .. } => "decode_failed",
            Self::FeedClosed { .. } => "feed_closed",
        }
    }
}
