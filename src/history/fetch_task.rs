//! Fetch task -- downloads one revision and signals completion exactly once.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Semaphore, broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, trace};

use crate::fetcher::ContentFetcher;
use crate::types::{ChangesetId, Event, Item};

/// What a fetch task reports through its signal: `Err` carries the failure reason.
pub(super) type FetchOutcome = std::result::Result<(), String>;

/// Counts downloads that hold a window permit and are running right now.
#[derive(Debug, Default)]
pub(super) struct FetchGauge {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FetchGauge {
    pub(super) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(super) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(self: &Arc<Self>) -> ActiveFetch {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ActiveFetch {
            gauge: Arc::clone(self),
        }
    }
}

/// Decrements the gauge when dropped, including when the fetcher panics.
struct ActiveFetch {
    gauge: Arc<FetchGauge>,
}

impl Drop for ActiveFetch {
    fn drop(&mut self) {
        self.gauge.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One scheduled download.
///
/// The task owns the sending half of its position's one-shot signal. It sends
/// exactly once on success or failure; if the fetcher panics the sender is
/// dropped instead, which the receiving side treats as a failure.
pub(super) struct FetchTask {
    pub(super) position: usize,
    pub(super) changeset: ChangesetId,
    pub(super) item: Item,
    pub(super) destination: PathBuf,
    pub(super) fetcher: Arc<dyn ContentFetcher>,
    pub(super) permits: Arc<Semaphore>,
    pub(super) gauge: Arc<FetchGauge>,
    pub(super) event_tx: broadcast::Sender<Event>,
    pub(super) signal: oneshot::Sender<FetchOutcome>,
}

impl FetchTask {
    /// Run the task on the Tokio worker pool.
    pub(super) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let FetchTask {
            position,
            changeset,
            item,
            destination,
            fetcher,
            permits,
            gauge,
            event_tx,
            signal,
        } = self;

        let outcome = match permits.acquire().await {
            Ok(_permit) => {
                let _active = gauge.enter();
                trace!(
                    position,
                    changeset = changeset.0,
                    fetcher = fetcher.name(),
                    ?destination,
                    "fetching revision"
                );
                fetcher
                    .download(&item, &destination)
                    .await
                    .map_err(|e| e.to_string())
            }
            Err(e) => Err(format!("fetch window closed: {e}")),
        };

        match &outcome {
            Ok(()) => {
                trace!(position, changeset = changeset.0, "revision fetched");
                event_tx
                    .send(Event::FetchCompleted {
                        position,
                        changeset,
                    })
                    .ok();
            }
            Err(reason) => {
                error!(
                    position,
                    changeset = changeset.0,
                    path = %item.server_path,
                    error = %reason,
                    "failed to fetch revision"
                );
                event_tx
                    .send(Event::FetchFailed {
                        position,
                        changeset,
                        error: reason.clone(),
                    })
                    .ok();
            }
        }

        if signal.send(outcome).is_err() {
            trace!(position, "nobody waiting for fetch result");
        }
    }
}
