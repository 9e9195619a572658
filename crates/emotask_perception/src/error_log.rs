//! Application errors from a tailed log file.
//!
//! Only lines written after the watcher starts count. A file that shrinks
//! was truncated and a file with a new identity was rotated; either way
//! reading restarts from the top. Partial trailing lines wait for their
//! newline.

use crate::source::EventSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use emotask_limbic::IngestEvent;
use regex::RegexSet;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

pub struct ErrorLogWatcher {
    name: String,
    path: PathBuf,
    patterns: RegexSet,
    interval: Duration,
    offset: AtomicU64,
    /// Identity of the file `offset` points into.
    identity: AtomicU64,
}

impl ErrorLogWatcher {
    pub fn new(path: PathBuf, patterns: &[String], interval: Duration) -> Result<Self> {
        let patterns = RegexSet::new(patterns).context("Invalid error pattern")?;
        Ok(Self {
            name: format!("error-log:{}", path.display()),
            path,
            patterns,
            interval,
            offset: AtomicU64::new(0),
            identity: AtomicU64::new(0),
        })
    }

    /// Open the log and read its length and identity from the same handle,
    /// so a rotation between the two can't mix up files.
    async fn open(&self) -> Result<(File, u64, u64)> {
        let file = File::open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let meta = file
            .metadata()
            .await
            .with_context(|| format!("Failed to stat {}", self.path.display()))?;
        Ok((file, meta.len(), file_identity(&meta)))
    }
}

#[cfg(unix)]
fn file_identity(meta: &std::fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    // Device in the high bits keeps inodes from different filesystems apart.
    meta.ino() ^ meta.dev().rotate_left(32)
}

// Without inodes only truncation is detectable.
#[cfg(not(unix))]
fn file_identity(_meta: &std::fs::Metadata) -> u64 {
    0
}

#[async_trait]
impl EventSource for ErrorLogWatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn prepare(&self) -> Result<()> {
        let (_, len, identity) = self.open().await?;
        self.offset.store(len, Ordering::Release);
        self.identity.store(identity, Ordering::Release);
        Ok(())
    }

    async fn poll(&self) -> Result<Vec<IngestEvent>> {
        let (mut file, len, identity) = self.open().await?;
        let mut offset = self.offset.load(Ordering::Acquire);
        if identity != self.identity.swap(identity, Ordering::AcqRel) {
            tracing::debug!("{} was replaced, reading the new file from the start", self.name);
            offset = 0;
        } else if len < offset {
            tracing::debug!("{} shrank, rereading from the start", self.name);
            offset = 0;
        }
        if len == offset {
            self.offset.store(offset, Ordering::Release);
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = Vec::with_capacity((len - offset) as usize);
        file.take(len - offset).read_to_end(&mut buf).await?;

        let complete = match buf.iter().rposition(|b| *b == b'\n') {
            Some(last_newline) => &buf[..=last_newline],
            None => &buf[..0],
        };
        let matches = String::from_utf8_lossy(complete)
            .lines()
            .filter(|line| self.patterns.is_match(line))
            .count();
        self.offset
            .store(offset + complete.len() as u64, Ordering::Release);

        if matches > 0 {
            tracing::debug!("{}: {} error lines", self.name, matches);
        }
        Ok(vec![IngestEvent::ApplicationError; matches])
    }
}
