//! Device arrival/removal by watching device directories.
//!
//! The kernel adds and removes one entry per device under directories such as
//! `/sys/bus/usb/devices`. Any difference between two polls of a directory's
//! listing is reported as a single device change. A directory that cannot be
//! listed on some poll keeps its previous listing, so a read failure never
//! looks like every device in it was unplugged.

use crate::source::EventSource;
use anyhow::Result;
use async_trait::async_trait;
use emotask_limbic::IngestEvent;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

type Listing = BTreeSet<PathBuf>;

pub struct DeviceWatcher {
    name: String,
    dirs: Vec<PathBuf>,
    interval: Duration,
    /// Last good listing per directory.
    known: Mutex<BTreeMap<PathBuf, Listing>>,
}

impl DeviceWatcher {
    pub fn new(dirs: Vec<PathBuf>, interval: Duration) -> Self {
        let name = format!(
            "devices:{}",
            dirs.iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join(",")
        );
        Self {
            name,
            dirs,
            interval,
            known: Mutex::new(BTreeMap::new()),
        }
    }

    /// Listings of every directory that could be read in full.
    async fn scan(&self) -> BTreeMap<PathBuf, Listing> {
        let mut listings = BTreeMap::new();
        for dir in &self.dirs {
            match list(dir).await {
                Ok(entries) => {
                    listings.insert(dir.clone(), entries);
                }
                Err(e) => tracing::debug!("Cannot list {}: {}", dir.display(), e),
            }
        }
        listings
    }

    fn known(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, Listing>> {
        self.known.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn list(dir: &Path) -> std::io::Result<Listing> {
    let mut listing = tokio::fs::read_dir(dir).await?;
    let mut entries = BTreeSet::new();
    while let Some(entry) = listing.next_entry().await? {
        entries.insert(entry.path());
    }
    Ok(entries)
}

#[async_trait]
impl EventSource for DeviceWatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn prepare(&self) -> Result<()> {
        let listings = self.scan().await;
        if listings.is_empty() {
            anyhow::bail!("none of the device directories can be read");
        }
        tracing::debug!(
            "{}: baseline of {} devices",
            self.name,
            listings.values().map(BTreeSet::len).sum::<usize>()
        );
        *self.known() = listings;
        Ok(())
    }

    async fn poll(&self) -> Result<Vec<IngestEvent>> {
        let fresh = self.scan().await;
        if fresh.is_empty() {
            anyhow::bail!("none of the device directories can be read");
        }

        let mut known = self.known();
        let mut added = 0;
        let mut removed = 0;
        for (dir, entries) in fresh {
            // A directory seen for the first time only sets its baseline.
            if let Some(previous) = known.get(&dir) {
                added += entries.difference(previous).count();
                removed += previous.difference(&entries).count();
            }
            known.insert(dir, entries);
        }

        if added + removed == 0 {
            return Ok(Vec::new());
        }
        tracing::debug!("{}: {} added, {} removed", self.name, added, removed);
        Ok(vec![IngestEvent::DeviceChanged])
    }
}
