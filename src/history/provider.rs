//! The windowed history provider.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, broadcast, oneshot};
use tracing::{debug, error, trace, warn};

use super::fetch_task::{FetchGauge, FetchTask};
use super::slot::{Slot, SlotState};
use crate::config::PrefetchConfig;
use crate::error::{CleanupError, CleanupFailure, Error, FetchError, Result};
use crate::fetcher::ContentFetcher;
use crate::types::{Changeset, Event, Item};

/// Where the read cursor is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cursor {
    BeforeStart,
    At(usize),
    Exhausted,
}

/// A revision exposed by [`HistoryProvider::next_revision`]
///
/// Borrowed from the provider; the scratch file stays on disk at least until
/// the next call that advances the provider.
#[derive(Debug, Clone, Copy)]
pub struct Revision<'a> {
    /// Position in the ordered history
    pub position: usize,
    /// The changeset that produced this revision
    pub changeset: &'a Changeset,
    /// The item version whose content was fetched
    pub item: &'a Item,
    /// Scratch file holding the revision content
    pub path: &'a Path,
}

/// Snapshot of the provider's window state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowStats {
    /// Number of revisions in the history
    pub len: usize,
    /// Position currently exposed, if any
    pub position: Option<usize>,
    /// Positions that have had a fetch scheduled
    pub scheduled: usize,
    /// Every position below this one has been disposed by `advance`
    pub reclaimed: usize,
    /// Downloads running right now
    pub in_flight: usize,
    /// Most downloads ever running at the same time
    pub peak_in_flight: usize,
    /// Configured window size
    pub window_size: usize,
}

/// Forward-only walk over a file's history with bounded look-ahead fetching
///
/// See the [module documentation](super) for the window and reclamation rules.
///
/// Construct it inside a Tokio runtime. Call [`close`](Self::close) when done;
/// if the provider is dropped instead, scratch files are still removed, but
/// those belonging to fetches still running are removed in the background
/// once the fetch finishes and cleanup failures go unreported.
pub struct HistoryProvider {
    pub(super) slots: Vec<Slot>,
    cursor: Cursor,
    /// Position an interrupted `advance` was waiting on.
    pending: Option<usize>,
    /// All positions below `reclaimed` are disposed.
    reclaimed: usize,
    scheduled: usize,
    /// Position whose fetch failure ended the walk.
    aborted: Option<usize>,
    /// Cleanup failures from `advance`, reported by `close`.
    leaks: Vec<CleanupFailure>,
    fetcher: Arc<dyn ContentFetcher>,
    config: PrefetchConfig,
    scratch_dir: PathBuf,
    permits: Arc<Semaphore>,
    gauge: Arc<FetchGauge>,
    event_tx: broadcast::Sender<Event>,
    /// Runtime the fetches run on; deferred cleanup is spawned here on drop.
    runtime: Handle,
}

impl HistoryProvider {
    /// Create a provider over `changesets` and start fetching the first window
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `config` fails validation
    /// - [`Error::MalformedChangeset`] if any changeset does not carry exactly
    ///   one change; nothing is fetched in that case
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(
        changesets: Vec<Changeset>,
        fetcher: Arc<dyn ContentFetcher>,
        config: PrefetchConfig,
    ) -> Result<Self> {
        config.validate()?;

        let slots = changesets
            .into_iter()
            .map(Slot::try_from_changeset)
            .collect::<Result<Vec<_>>>()?;

        let (event_tx, _rx) = broadcast::channel(config.event_capacity);

        let mut provider = Self {
            slots,
            cursor: Cursor::BeforeStart,
            pending: None,
            reclaimed: 0,
            scheduled: 0,
            aborted: None,
            leaks: Vec::new(),
            fetcher,
            scratch_dir: config.effective_scratch_dir(),
            permits: Arc::new(Semaphore::new(config.window_size)),
            gauge: Arc::new(FetchGauge::default()),
            event_tx,
            runtime: Handle::current(),
            config,
        };

        let initial = provider.config.window_size.min(provider.slots.len());
        for position in 0..initial {
            provider.schedule(position);
        }

        debug!(
            revisions = provider.slots.len(),
            window_size = provider.config.window_size,
            fetcher = provider.fetcher.name(),
            scratch_dir = ?provider.scratch_dir,
            "history provider created"
        );

        Ok(provider)
    }

    /// Move to the next revision, waiting for its fetch if necessary
    ///
    /// Returns `Ok(false)` once the history is exhausted, and on every call
    /// after that.
    ///
    /// Cancel safe: if the returned future is dropped while waiting, the
    /// current position is unchanged and the next call waits on the same
    /// revision again.
    ///
    /// # Errors
    ///
    /// - [`Error::Fetch`] if the fetch for the new position failed. The
    ///   position is still current: its changeset can be inspected, its
    ///   content path reports the same error.
    /// - [`Error::IterationAborted`] on any call after a fetch failure.
    pub async fn advance(&mut self) -> Result<bool> {
        if let Some(position) = self.aborted {
            return Err(Error::IterationAborted { position });
        }

        // An interrupted wait resumes on the same position; the cursor only
        // moves once that position has settled.
        let position = match self.pending {
            Some(position) => position,
            None => match self.begin_advance().await {
                Some(position) => position,
                None => return Ok(false),
            },
        };

        self.slots[position].settle(position).await;
        self.pending = None;
        self.cursor = Cursor::At(position);

        if let Some(err) = self.slots[position].fetch_error() {
            let err = err.clone();
            error!(
                position,
                changeset = err.changeset.0,
                error = %err.reason,
                "history walk aborted by fetch failure"
            );
            self.aborted = Some(position);
            return Err(Error::Fetch(err));
        }

        trace!(
            position,
            changeset = self.slots[position].changeset_id.0,
            "advanced"
        );
        Ok(true)
    }

    /// Advance and return the new current revision, or `None` when exhausted
    pub async fn next_revision(&mut self) -> Result<Option<Revision<'_>>> {
        if !self.advance().await? {
            return Ok(None);
        }

        let position = self.current_position()?;
        Ok(Some(Revision {
            position,
            changeset: self.current_changeset()?,
            item: &self.slots[position].item,
            path: self.current_content_path()?,
        }))
    }

    /// The changeset at the current position
    ///
    /// # Errors
    ///
    /// [`Error::NoCurrentElement`] before the first successful advance, after
    /// exhaustion, or after [`close`](Self::close).
    pub fn current_changeset(&self) -> Result<&Changeset> {
        let position = self.current_position()?;
        self.slots[position]
            .changeset
            .as_ref()
            .ok_or(Error::NoCurrentElement)
    }

    /// The item version at the current position
    pub fn current_item(&self) -> Result<&Item> {
        let position = self.current_position()?;
        match self.slots[position].state {
            SlotState::Disposed => Err(Error::NoCurrentElement),
            _ => Ok(&self.slots[position].item),
        }
    }

    /// Scratch file holding the content at the current position
    ///
    /// Valid until the next call that advances the provider.
    ///
    /// # Errors
    ///
    /// [`Error::NoCurrentElement`] as for [`current_changeset`](Self::current_changeset),
    /// or [`Error::Fetch`] if this position's fetch failed.
    pub fn current_content_path(&self) -> Result<&Path> {
        let position = self.current_position()?;
        match &self.slots[position].state {
            SlotState::Ready { scratch } => Ok(&**scratch),
            SlotState::Failed { error, .. } => Err(Error::Fetch(error.clone())),
            _ => Err(Error::NoCurrentElement),
        }
    }

    /// Dispose every position, waiting for outstanding fetches first
    ///
    /// Safe to call at any point of the walk and more than once. After it
    /// returns no scratch file created by this provider remains, unless an
    /// error reports it.
    ///
    /// # Errors
    ///
    /// [`Error::Cleanup`] listing every scratch file that could not be
    /// deleted, here or during earlier `advance` calls. Teardown visits every
    /// position regardless.
    pub async fn close(&mut self) -> Result<()> {
        let mut disposed = 0usize;
        for position in 0..self.slots.len() {
            if self.dispose(position).await {
                disposed += 1;
            }
        }
        self.reclaimed = self.slots.len();
        self.cursor = Cursor::Exhausted;
        self.pending = None;

        debug!(
            revisions = self.slots.len(),
            disposed,
            leaked = self.leaks.len(),
            "history provider closed"
        );

        if self.leaks.is_empty() {
            Ok(())
        } else {
            Err(CleanupError {
                failures: std::mem::take(&mut self.leaks),
            }
            .into())
        }
    }

    /// Subscribe to provider events
    ///
    /// Only events sent after subscribing are received. Fetch completions for
    /// the first window are not sent before the caller's task yields.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Number of revisions in the history
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the history has no revisions
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Position currently exposed, if any
    pub fn position(&self) -> Option<usize> {
        match self.cursor {
            Cursor::At(position) => Some(position),
            _ => None,
        }
    }

    /// Configured window size
    pub fn window_size(&self) -> usize {
        self.config.window_size
    }

    /// Snapshot of the window state
    pub fn stats(&self) -> WindowStats {
        WindowStats {
            len: self.slots.len(),
            position: self.position(),
            scheduled: self.scheduled,
            reclaimed: self.reclaimed,
            in_flight: self.gauge.in_flight(),
            peak_in_flight: self.gauge.peak(),
            window_size: self.config.window_size,
        }
    }

    /// Reclaim behind the exposed position and schedule the window ahead of
    /// the next one. Returns the position to wait on, or `None` once exhausted.
    async fn begin_advance(&mut self) -> Option<usize> {
        // The position exposed before this call stays readable; only what is
        // strictly behind it is reclaimed.
        let reclaim_to = match self.cursor {
            Cursor::BeforeStart => 0,
            Cursor::At(position) => position,
            Cursor::Exhausted => self.slots.len(),
        };
        self.reclaim_below(reclaim_to).await;

        let position = match self.cursor {
            Cursor::BeforeStart => 0,
            Cursor::At(position) => position + 1,
            Cursor::Exhausted => return None,
        };
        if position >= self.slots.len() {
            self.cursor = Cursor::Exhausted;
            trace!(revisions = self.slots.len(), "history exhausted");
            return None;
        }

        let ahead = position + self.config.window_size;
        if ahead < self.slots.len() {
            self.schedule(ahead);
        }
        // Only reachable if an earlier window was never scheduled.
        if self.slots[position].is_vacant() {
            self.schedule(position);
        }

        self.pending = Some(position);
        Some(position)
    }

    fn current_position(&self) -> Result<usize> {
        self.position().ok_or(Error::NoCurrentElement)
    }

    /// Allocate a scratch file for `position` and spawn its fetch.
    ///
    /// No-op unless the slot is vacant. A scratch allocation failure is
    /// recorded as the position's fetch failure.
    fn schedule(&mut self, position: usize) {
        let slot = &mut self.slots[position];
        if !slot.is_vacant() {
            return;
        }
        self.scheduled += 1;
        let changeset = slot.changeset_id;

        let scratch = match tempfile::Builder::new()
            .prefix(&self.config.scratch_prefix)
            .tempfile_in(&self.scratch_dir)
        {
            Ok(file) => file.into_temp_path(),
            Err(e) => {
                warn!(
                    position,
                    changeset = changeset.0,
                    scratch_dir = ?self.scratch_dir,
                    error = %e,
                    "failed to allocate scratch file"
                );
                let reason = format!("failed to allocate scratch file: {e}");
                slot.state = SlotState::Failed {
                    scratch: None,
                    error: FetchError {
                        position,
                        changeset,
                        reason: reason.clone(),
                    },
                };
                self.event_tx
                    .send(Event::FetchFailed {
                        position,
                        changeset,
                        error: reason,
                    })
                    .ok();
                return;
            }
        };

        let (signal_tx, signal_rx) = oneshot::channel();
        let task = FetchTask {
            position,
            changeset,
            item: slot.item.clone(),
            destination: scratch.to_path_buf(),
            fetcher: Arc::clone(&self.fetcher),
            permits: Arc::clone(&self.permits),
            gauge: Arc::clone(&self.gauge),
            event_tx: self.event_tx.clone(),
            signal: signal_tx,
        };
        slot.state = SlotState::Fetching {
            scratch,
            signal: signal_rx,
        };

        self.event_tx
            .send(Event::FetchScheduled {
                position,
                changeset,
            })
            .ok();
        trace!(position, changeset = changeset.0, "fetch scheduled");

        task.spawn();
    }

    /// Dispose every position in `self.reclaimed..end`.
    async fn reclaim_below(&mut self, end: usize) {
        let end = end.min(self.slots.len());
        while self.reclaimed < end {
            self.dispose(self.reclaimed).await;
            self.reclaimed += 1;
        }
    }

    /// Dispose one position. Returns whether it had not been disposed yet.
    async fn dispose(&mut self, position: usize) -> bool {
        let slot = &mut self.slots[position];
        if slot.is_disposed() {
            return false;
        }

        if let Some(failure) = slot.dispose(position).await {
            warn!(
                position,
                path = ?failure.path,
                error = %failure.reason,
                "failed to delete scratch file"
            );
            self.leaks.push(failure);
        }

        self.event_tx.send(Event::SlotDisposed { position }).ok();
        trace!(position, "slot disposed");
        true
    }
}

impl Drop for HistoryProvider {
    fn drop(&mut self) {
        let mut deferred = 0usize;

        // The stored handle is usable from threads outside the runtime.
        for slot in &mut self.slots {
            let Some((scratch, signal)) = slot.take_outstanding() else {
                continue;
            };
            deferred += 1;
            self.runtime.spawn(async move {
                // Keep the file until the fetch writing it is done.
                let _ = signal.await;
                drop(scratch);
            });
        }

        if deferred > 0 {
            debug!(
                deferred,
                "history provider dropped with fetches outstanding, deferring their cleanup"
            );
        }
        // Remaining scratch files are deleted as their slots drop.
    }
}

impl std::fmt::Debug for HistoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryProvider")
            .field("len", &self.slots.len())
            .field("cursor", &self.cursor)
            .field("pending", &self.pending)
            .field("reclaimed", &self.reclaimed)
            .field("scheduled", &self.scheduled)
            .field("aborted", &self.aborted)
            .field("window_size", &self.config.window_size)
            .field("fetcher", &self.fetcher.name())
            .finish()
    }
}
