//! Windowed history walking with asynchronous prefetch
//!
//! [`HistoryProvider`] walks the revisions of one file in order while keeping
//! a fixed number of downloads running ahead of the reader.
//!
//! ## Window
//!
//! With a window of `W`, construction schedules positions `0..W`. Every
//! successful [`advance`](HistoryProvider::advance) to position `c` schedules
//! position `c + W`, so once warmed up the reader only waits when a fetch is
//! slower than the time spent consuming the revisions before it. A semaphore
//! with `W` permits bounds how many downloads actually run at once.
//!
//! ## Reclamation lags one position behind
//!
//! ```text
//!            reclaim_to        cursor
//!                 |              |
//!   [disposed ...][c - 1: alive][c: exposed][c + 1 .. c + W: fetching]
//! ```
//!
//! `advance` disposes every position strictly below the one the caller was
//! looking at *before* the call. The revision exposed by the previous call is
//! therefore still on disk after the next one returns, and only goes away one
//! call later. Everything left over is disposed by
//! [`close`](HistoryProvider::close), or by `Drop` as a last resort.
//!
//! ## Usage
//!
//! ```no_run
//! use history_prefetch::{DirectoryFetcher, HistoryProvider, PrefetchConfig};
//! use std::sync::Arc;
//!
//! # async fn walk(changesets: Vec<history_prefetch::Changeset>) -> history_prefetch::Result<()> {
//! let fetcher = Arc::new(DirectoryFetcher::new("/srv/mirror"));
//! let mut history = HistoryProvider::new(changesets, fetcher, PrefetchConfig::default())?;
//!
//! while let Some(revision) = history.next_revision().await? {
//!     let text = tokio::fs::read_to_string(revision.path).await?;
//!     println!("{} by {}: {} bytes", revision.changeset.id, revision.changeset.committer, text.len());
//! }
//!
//! history.close().await
//! # }
//! ```

mod fetch_task;
mod provider;
mod slot;


pub use provider::{HistoryProvider, Revision, WindowStats};
