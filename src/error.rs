//! Error types for history-prefetch
//!
//! This module provides the error taxonomy for the library:
//! - Construction errors (invalid configuration, malformed changesets)
//! - Usage errors (querying the provider without a current revision)
//! - Fetch failures surfaced at the position that failed
//! - Aggregated scratch-file cleanup failures from teardown

use crate::types::ChangesetId;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for history-prefetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for history-prefetch
///
/// Each variant carries enough context to identify the changeset or position
/// involved without consulting the provider.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "window_size")
        key: Option<String>,
    },

    /// A changeset handed to the provider does not carry exactly one change
    #[error("expected exactly 1 change, but got {changes} for changeset {id}")]
    MalformedChangeset {
        /// The offending changeset
        id: ChangesetId,
        /// The number of changes it actually carries
        changes: usize,
    },

    /// The provider was queried before the first advance or after exhaustion
    #[error("no current element")]
    NoCurrentElement,

    /// Fetching a revision failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Iteration was already aborted by a fetch failure at `position`
    #[error("iteration aborted by fetch failure at position {position}")]
    IterationAborted {
        /// The position whose fetch failed
        position: usize,
    },

    /// One or more scratch files could not be deleted
    #[error("cleanup error: {0}")]
    Cleanup(#[from] CleanupError),

    /// Revision content not found in the backing store
    #[error("not found: {0}")]
    NotFound(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// A failed fetch for one position in the history
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fetch of changeset {changeset} at position {position} failed: {reason}")]
pub struct FetchError {
    /// Position in the ordered history
    pub position: usize,
    /// Changeset whose content was being fetched
    pub changeset: ChangesetId,
    /// Why the fetch failed
    pub reason: String,
}

/// A scratch file that could not be removed
#[derive(Debug, Clone)]
pub struct CleanupFailure {
    /// Position the scratch file belonged to
    pub position: usize,
    /// Path of the leaked file
    pub path: PathBuf,
    /// The underlying I/O error message
    pub reason: String,
}

/// Aggregate of every scratch file teardown failed to remove
///
/// Teardown never stops at the first failure; it collects them all and
/// reports them together once every slot has been visited.
#[derive(Debug, Clone, Default)]
pub struct CleanupError {
    /// Individual failures, in position order
    pub failures: Vec<CleanupFailure>,
}

impl CleanupError {
    /// Paths of the leaked scratch files
    pub fn leaked_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.failures.iter().map(|f| &f.path)
    }
}

impl fmt::Display for CleanupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to delete {} scratch file(s)", self.failures.len())?;
        if let Some(first) = self.failures.first() {
            write!(f, " (first: {}: {})", first.path.display(), first.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for CleanupError {}
