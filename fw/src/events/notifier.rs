//! Terminal notifier for feed events
//!
//! Prints a short line per arrival so the operator sees activity while the
//! REPL waits for input.

use colored::Colorize;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{EventBus, FeedEvent};

/// Render an event as a single terminal line
pub fn render_event(event: &FeedEvent) -> String {
    match event {
        FeedEvent::RecordReceived { record, received_at } => format!(
            "{} {} {}",
            "new message".bright_green(),
            received_at.format("%H:%M:%S").to_string().dimmed(),
            record.summary()
        ),
        FeedEvent::DecodeFailed { error, .. } => format!("{} {}", "skipped:".yellow(), error),
        FeedEvent::FeedClosed { reason } => format!("{} {}", "feed closed:".red(), reason),
    }
}

/// Spawn a task printing every bus event to stdout
///
/// Ends when the bus is dropped or after a `FeedClosed` event.
pub fn spawn_notifier(bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        debug!("notifier: started");
        loop {
            match rx.recv().await {
                Ok(event) => {
                    println!("{}", render_event(&event));
                    if matches!(event, FeedEvent::FeedClosed { .. }) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "notifier: lagged behind feed");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("notifier: stopped");
    })
}
