//! Per-position state owned by the provider.

use std::io;

use tempfile::TempPath;
use tokio::sync::oneshot;

use super::fetch_task::FetchOutcome;
use crate::error::{CleanupFailure, Error, FetchError, Result};
use crate::types::{Changeset, ChangesetId, Item};

/// Lifecycle of one position. Transitions only move forward:
/// `Vacant -> Fetching -> Ready | Failed -> Disposed` (or `Vacant -> Disposed`).
pub(super) enum SlotState {
    Vacant,
    Fetching {
        scratch: TempPath,
        signal: oneshot::Receiver<FetchOutcome>,
    },
    Ready {
        scratch: TempPath,
    },
    Failed {
        scratch: Option<TempPath>,
        error: FetchError,
    },
    Disposed,
}

pub(super) struct Slot {
    pub(super) changeset_id: ChangesetId,
    pub(super) item: Item,
    pub(super) changeset: Option<Changeset>,
    pub(super) state: SlotState,
}

impl Slot {
    /// Build a slot, rejecting changesets that do not carry exactly one change.
    pub(super) fn try_from_changeset(changeset: Changeset) -> Result<Self> {
        let item = match changeset.sole_change() {
            Some(change) => change.item.clone(),
            None => {
                return Err(Error::MalformedChangeset {
                    id: changeset.id,
                    changes: changeset.changes.len(),
                });
            }
        };

        Ok(Self {
            changeset_id: changeset.id,
            item,
            changeset: Some(changeset),
            state: SlotState::Vacant,
        })
    }

    pub(super) fn is_vacant(&self) -> bool {
        matches!(self.state, SlotState::Vacant)
    }

    pub(super) fn is_disposed(&self) -> bool {
        matches!(self.state, SlotState::Disposed)
    }

    pub(super) fn fetch_error(&self) -> Option<&FetchError> {
        match &self.state {
            SlotState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Wait for an outstanding fetch to signal and record its outcome.
    ///
    /// No-op unless the slot is `Fetching`. The receiver is awaited in place,
    /// so dropping this future leaves the slot untouched.
    pub(super) async fn settle(&mut self, position: usize) {
        let received = match &mut self.state {
            SlotState::Fetching { signal, .. } => signal.await,
            _ => return,
        };

        let SlotState::Fetching { scratch, .. } =
            std::mem::replace(&mut self.state, SlotState::Disposed)
        else {
            return;
        };

        let changeset = self.changeset_id;
        let failure = |reason: String| FetchError {
            position,
            changeset,
            reason,
        };

        self.state = match received {
            Ok(Ok(())) => SlotState::Ready { scratch },
            Ok(Err(reason)) => SlotState::Failed {
                scratch: Some(scratch),
                error: failure(reason),
            },
            Err(_) => SlotState::Failed {
                scratch: Some(scratch),
                error: failure("fetch task ended without reporting a result".to_string()),
            },
        };
    }

    /// Wait for any outstanding fetch, then delete the scratch file and drop
    /// the changeset.
    ///
    /// Returns the failure if the scratch file could not be removed.
    pub(super) async fn dispose(&mut self, position: usize) -> Option<CleanupFailure> {
        self.settle(position).await;
        self.changeset = None;

        let scratch = match std::mem::replace(&mut self.state, SlotState::Disposed) {
            SlotState::Ready { scratch } => Some(scratch),
            SlotState::Failed { scratch, .. } => scratch,
            _ => None,
        };

        scratch.and_then(|scratch| remove_scratch(position, scratch))
    }

    /// Hand an outstanding fetch's scratch file and signal to the caller,
    /// leaving the slot disposed. Used when the provider is dropped without
    /// being closed.
    pub(super) fn take_outstanding(
        &mut self,
    ) -> Option<(TempPath, oneshot::Receiver<FetchOutcome>)> {
        if !matches!(self.state, SlotState::Fetching { .. }) {
            return None;
        }
        self.changeset = None;
        match std::mem::replace(&mut self.state, SlotState::Disposed) {
            SlotState::Fetching { scratch, signal } => Some((scratch, signal)),
            _ => None,
        }
    }
}

fn remove_scratch(position: usize, scratch: TempPath) -> Option<CleanupFailure> {
    let path = scratch.to_path_buf();
    match scratch.close() {
        Ok(()) => None,
        // A fetcher may replace or remove its destination; nothing left to leak.
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => Some(CleanupFailure {
            position,
            path,
            reason: e.to_string(),
        }),
    }
}
