//! File replay feed
//!
//! Reads one payload per line, skipping blank lines, so a captured feed can
//! be replayed without a broker.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

use super::{Feed, FeedError};

pub struct ReplayFeed {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    interval: Option<Duration>,
    delivered: u64,
}

impl ReplayFeed {
    /// Open a replay file; `interval` spaces out deliveries
    pub async fn open(path: impl AsRef<Path>, interval: Option<Duration>) -> Result<Self, FeedError> {
        let path = path.as_ref().to_path_buf();
        debug!(?path, ?interval, "ReplayFeed::open: called");
        let file = File::open(&path).await?;
        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            interval,
            delivered: 0,
        })
    }
}

#[async_trait]
impl Feed for ReplayFeed {
    async fn next_payload(&mut self) -> Result<Option<Vec<u8>>, FeedError> {
        while let Some(line) = self.lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let (Some(interval), true) = (self.interval, self.delivered > 0) {
                tokio::time::sleep(interval).await;
            }
            self.delivered += 1;
            return Ok(Some(line.into_bytes()));
        }
        debug!(path = ?self.path, delivered = self.delivered, "ReplayFeed: end of file");
        Ok(None)
    }

    fn describe(&self) -> String {
        format!("replay:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_replay_skips_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{\"value\": 1}}").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "   ").unwrap();
        writeln!(file, "garbage").unwrap();

        let mut feed = ReplayFeed::open(file.path(), None).await.unwrap();

        assert_eq!(feed.next_payload().await.unwrap(), Some(b"{\"value\": 1}".to_vec()));
        assert_eq!(feed.next_payload().await.unwrap(), Some(b"garbage".to_vec()));
        assert_eq!(feed.next_payload().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let result = ReplayFeed::open("/nonexistent/feedwatch/replay.jsonl", None).await;
        assert!(matches!(result, Err(FeedError::Io(_))));
    }
}
