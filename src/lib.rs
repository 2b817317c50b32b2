//! # history-prefetch
//!
//! Ordered, prefetching access to the revisions of a file held in a versioned
//! store where every fetch costs a round trip.
//!
//! ## Design Philosophy
//!
//! history-prefetch is designed to be:
//! - **Bounded** - A fixed window of downloads runs ahead of the reader, never more
//! - **Ordered** - Revisions are exposed strictly in history order
//! - **Leak-free** - Scratch files are removed as soon as the reader can no longer see them
//! - **Library-first** - The store is reached through a [`ContentFetcher`] the host supplies
//!
//! ## Quick Start
//!
//! ```no_run
//! use history_prefetch::{DirectoryFetcher, HistoryProvider, PrefetchConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let changesets = Vec::new(); // oldest first, one change each
//!     let fetcher = Arc::new(DirectoryFetcher::new("/srv/mirror"));
//!
//!     let mut history = HistoryProvider::new(
//!         changesets,
//!         fetcher,
//!         PrefetchConfig::with_window_size(8),
//!     )?;
//!
//!     while history.advance().await? {
//!         let changeset = history.current_changeset()?;
//!         let path = history.current_content_path()?;
//!         println!("{} -> {}", changeset.id, path.display());
//!     }
//!
//!     history.close().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Revision content fetchers
pub mod fetcher;
/// Windowed history provider
pub mod history;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::PrefetchConfig;
pub use error::{CleanupError, CleanupFailure, Error, FetchError, Result};
pub use fetcher::{ContentFetcher, DirectoryFetcher};
pub use history::{HistoryProvider, Revision, WindowStats};
pub use types::{Change, ChangeType, Changeset, ChangesetId, Event, Item};
