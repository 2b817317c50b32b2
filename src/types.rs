//! Core types and events for history-prefetch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a changeset in the versioned store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangesetId(pub i64);

impl ChangesetId {
    /// Create a new ChangesetId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ChangesetId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ChangesetId> for i64 {
    fn from(id: ChangesetId) -> Self {
        id.0
    }
}

impl PartialEq<i64> for ChangesetId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for ChangesetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of change a changeset applied to an item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Item was added
    Add,
    /// Item content was edited
    Edit,
    /// Item was renamed or moved
    Rename,
    /// Item was deleted
    Delete,
    /// Item was branched from another path
    Branch,
    /// Changes were merged into the item
    Merge,
    /// A deleted item was restored
    Undelete,
}

/// A versioned file as it existed at one changeset
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Path of the file in the versioned store (e.g. `$/Project/src/main.rs`)
    pub server_path: String,
    /// Changeset this version of the item belongs to
    pub changeset_id: ChangesetId,
    /// Opaque handle a [`ContentFetcher`](crate::fetcher::ContentFetcher) resolves to content
    pub content_key: String,
}

/// A single change recorded in a changeset
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// What kind of change was made
    pub change_type: ChangeType,
    /// The item version produced by the change
    pub item: Item,
}

/// A changeset from the history of one file
///
/// The history provider requires every changeset to carry exactly one change:
/// the revision of the file being walked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    /// Changeset identifier
    pub id: ChangesetId,
    /// Who committed the changeset
    pub committer: String,
    /// When the changeset was created
    pub created_at: DateTime<Utc>,
    /// Check-in comment
    #[serde(default)]
    pub comment: Option<String>,
    /// Changes recorded in this changeset
    pub changes: Vec<Change>,
}

impl Changeset {
    /// The only change in this changeset, or `None` if it has zero or several
    pub fn sole_change(&self) -> Option<&Change> {
        match self.changes.as_slice() {
            [change] => Some(change),
            _ => None,
        }
    }
}

/// Event emitted while the provider walks a history
///
/// Events are informational; nothing in the provider depends on anyone
/// receiving them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A fetch was scheduled for a position
    FetchScheduled {
        /// Position in the history
        position: usize,
        /// Changeset being fetched
        changeset: ChangesetId,
    },

    /// A fetch finished and its scratch file holds the revision content
    FetchCompleted {
        /// Position in the history
        position: usize,
        /// Changeset that was fetched
        changeset: ChangesetId,
    },

    /// A fetch failed
    FetchFailed {
        /// Position in the history
        position: usize,
        /// Changeset that failed to fetch
        changeset: ChangesetId,
        /// Error message
        error: String,
    },

    /// A position was disposed and its scratch file removed
    SlotDisposed {
        /// Position in the history
        position: usize,
    },
}
