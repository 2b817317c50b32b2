//! Changeset fixtures and an in-memory revision store

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use history_prefetch::{
    Change, ChangeType, Changeset, ChangesetId, ContentFetcher, Error, Item, Result,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Server path shared by every fixture revision
pub const SERVER_PATH: &str = "$/Project/src/annotate.rs";

/// Changeset id of the first fixture revision
pub const FIRST_CHANGESET: i64 = 26274;

/// A changeset carrying a single edit of [`SERVER_PATH`]
pub fn changeset(id: i64) -> Changeset {
    let base = DateTime::<Utc>::from_timestamp(1_430_736_199, 0).unwrap_or_default();
    Changeset {
        id: ChangesetId(id),
        committer: format!("DOMAIN\\dev{}", id % 3),
        created_at: base + ChronoDuration::minutes(id - FIRST_CHANGESET),
        comment: Some(format!("edit {id}")),
        changes: vec![Change {
            change_type: if id == FIRST_CHANGESET {
                ChangeType::Add
            } else {
                ChangeType::Edit
            },
            item: Item {
                server_path: SERVER_PATH.to_string(),
                changeset_id: ChangesetId(id),
                content_key: format!("{id}/annotate.rs"),
            },
        }],
    }
}

/// `n` consecutive changesets, oldest first
pub fn history(n: usize) -> Vec<Changeset> {
    (0..n as i64).map(|i| changeset(FIRST_CHANGESET + i)).collect()
}

/// File content the fixture store holds for a revision
pub fn revision_text(id: ChangesetId) -> String {
    (0..=(id.0 - FIRST_CHANGESET))
        .map(|line| format!("line {line} as of changeset {id}\n"))
        .collect()
}

/// In-memory revision store with configurable latency and failures
#[derive(Default)]
pub struct MemoryStore {
    latency: Duration,
    latency_overrides: HashMap<i64, Duration>,
    failing: HashSet<i64>,
    downloads: Mutex<Vec<ChangesetId>>,
}

impl MemoryStore {
    /// Store answering instantly
    pub fn new() -> Self {
        Self::default()
    }

    /// Store answering every request after `latency`
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Make one changeset slower than the rest
    pub fn slow_on(mut self, id: i64, latency: Duration) -> Self {
        self.latency_overrides.insert(id, latency);
        self
    }

    /// Make downloads of one changeset fail
    pub fn failing_on(mut self, id: i64) -> Self {
        self.failing.insert(id);
        self
    }

    /// Changesets downloaded so far, in request order
    pub fn downloads(&self) -> Vec<ChangesetId> {
        self.downloads.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ContentFetcher for MemoryStore {
    async fn download(&self, item: &Item, destination: &Path) -> Result<()> {
        if let Ok(mut downloads) = self.downloads.lock() {
            downloads.push(item.changeset_id);
        }

        let latency = self
            .latency_overrides
            .get(&item.changeset_id.0)
            .copied()
            .unwrap_or(self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.failing.contains(&item.changeset_id.0) {
            return Err(Error::Other(format!(
                "server refused {} at {}",
                item.server_path, item.changeset_id
            )));
        }

        tokio::fs::write(destination, revision_text(item.changeset_id)).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
