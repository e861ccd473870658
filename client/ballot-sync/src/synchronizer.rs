use std::sync::Arc;

use ballot_interface::services::chain::ChainReader;
use ballot_interface::Snapshot;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::cycle::read_snapshot;
use crate::session::Connection;
use crate::state::{CycleStats, CycleTicket, CycleVerdict, SyncState, Trigger, ViewState};

type CycleFuture = BoxFuture<'static, (CycleTicket, Result<Snapshot, String>)>;

/// The synchronizer task stopped, so the awaited state can never be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("the synchronizer stopped")]
pub struct SyncStopped;

/// Requests out-of-band synchronization cycles.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    sender: mpsc::UnboundedSender<()>,
}

impl RefreshHandle {
    /// Asks for a new cycle. Ignored while disconnected or once the synchronizer stopped.
    pub fn request(&self) {
        if self.sender.send(()).is_err() {
            debug!("Synchronizer is gone, refresh request dropped");
        }
    }
}

/// Read side of a running [`Synchronizer`].
#[derive(Debug, Clone)]
pub struct SyncHandle {
    view: watch::Receiver<ViewState>,
    stats: watch::Receiver<CycleStats>,
    refresh: RefreshHandle,
}

impl SyncHandle {
    /// The current view.
    pub fn view(&self) -> ViewState {
        self.view.borrow().clone()
    }

    /// Receiver notified whenever the view changes.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view.clone()
    }

    /// Current cycle counters.
    pub fn stats(&self) -> CycleStats {
        *self.stats.borrow()
    }

    /// A handle to request refreshes with.
    pub fn refresher(&self) -> RefreshHandle {
        self.refresh.clone()
    }

    /// Asks for a new cycle.
    pub fn refresh(&self) {
        self.refresh.request();
    }

    /// Waits until the view satisfies `predicate` and returns it.
    pub async fn wait_for_view(
        &self,
        mut predicate: impl FnMut(&ViewState) -> bool,
    ) -> Result<ViewState, SyncStopped> {
        let mut receiver = self.view.clone();
        let view = receiver
            .wait_for(|v| predicate(v))
            .await
            .map_err(|_| SyncStopped)?
            .clone();
        Ok(view)
    }

    /// Waits until the counters satisfy `predicate` and returns them.
    pub async fn wait_for_stats(
        &self,
        mut predicate: impl FnMut(&CycleStats) -> bool,
    ) -> Result<CycleStats, SyncStopped> {
        let mut receiver = self.stats.clone();
        let stats = *receiver
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| SyncStopped)?;
        Ok(stats)
    }
}

/// Keeps the [`ViewState`] in sync with the contract.
///
/// The synchronizer runs as a single task. It owns the [`SyncState`] and starts a cycle on
/// every connection change, every new block and every refresh request. Cycles run
/// concurrently with each other and with the event loop. Their results are applied in the
/// task in whatever order they complete, and [`SyncState`] drops every result that was
/// superseded in the meantime.
pub struct Synchronizer<R: ChainReader> {
    reader: Arc<R>,
    state: SyncState,
    view: watch::Sender<ViewState>,
    stats: watch::Sender<CycleStats>,
    refresh: mpsc::UnboundedReceiver<()>,
}

impl<R: ChainReader> Synchronizer<R> {
    /// Creates a synchronizer reading through `reader`, and its handle.
    pub fn new(reader: Arc<R>, config: &SyncConfig) -> (Self, SyncHandle) {
        let state = SyncState::new(config.soft_warning_after_failures);
        let (view, view_receiver) = watch::channel(state.view().clone());
        let (stats, stats_receiver) = watch::channel(state.stats());
        let (refresh_sender, refresh) = mpsc::unbounded_channel();

        let synchronizer = Self {
            reader,
            state,
            view,
            stats,
            refresh,
        };
        let handle = SyncHandle {
            view: view_receiver,
            stats: stats_receiver,
            refresh: RefreshHandle {
                sender: refresh_sender,
            },
        };
        (synchronizer, handle)
    }

    /// Runs until the wallet session is dropped.
    ///
    /// `connection` follows the wallet session and `blocks` carries the latest block height.
    /// Cycles still in flight when the session goes away are dropped unfinished.
    pub async fn run(
        mut self,
        mut connection: watch::Receiver<Option<Connection>>,
        mut blocks: watch::Receiver<u64>,
    ) {
        let mut in_flight: FuturesUnordered<CycleFuture> = FuturesUnordered::new();
        let mut blocks_open = true;

        let initial = *connection.borrow_and_update();
        self.on_connection(initial, &mut in_flight);
        // Heights seen before the first connection do not need a cycle of their own.
        let _ = blocks.borrow_and_update();

        loop {
            tokio::select! {
                changed = connection.changed() => {
                    if changed.is_err() {
                        info!("Wallet session closed, stopping synchronizer");
                        break;
                    }
                    let current = *connection.borrow_and_update();
                    self.on_connection(current, &mut in_flight);
                }
                changed = blocks.changed(), if blocks_open => {
                    match changed {
                        Ok(()) => {
                            let height = *blocks.borrow_and_update();
                            self.begin(Trigger::NewBlock(height), &mut in_flight);
                        }
                        Err(_) => {
                            debug!("Block source closed");
                            blocks_open = false;
                        }
                    }
                }
                Some(()) = self.refresh.recv() => {
                    self.begin(Trigger::Refresh, &mut in_flight);
                }
                Some((ticket, outcome)) = in_flight.next(), if !in_flight.is_empty() => {
                    self.finish(ticket, outcome);
                }
            }
        }
    }

    fn on_connection(
        &mut self,
        current: Option<Connection>,
        in_flight: &mut FuturesUnordered<CycleFuture>,
    ) {
        match current {
            Some(connection) => {
                let ticket = self.state.connect(connection);
                self.spawn_cycle(ticket, in_flight);
            }
            None => self.state.disconnect(),
        }
        self.publish();
    }

    fn begin(&mut self, trigger: Trigger, in_flight: &mut FuturesUnordered<CycleFuture>) {
        if let Some(ticket) = self.state.begin_cycle(trigger) {
            self.spawn_cycle(ticket, in_flight);
            self.publish();
        }
    }

    fn spawn_cycle(&self, ticket: CycleTicket, in_flight: &mut FuturesUnordered<CycleFuture>) {
        let reader = self.reader.clone();
        in_flight.push(
            async move {
                let outcome = read_snapshot(reader.as_ref(), ticket.address)
                    .await
                    .map_err(|e| e.to_string());
                (ticket, outcome)
            }
            .boxed(),
        );
    }

    fn finish(&mut self, ticket: CycleTicket, outcome: Result<Snapshot, String>) {
        let verdict = self.state.complete(ticket, outcome);
        match verdict {
            CycleVerdict::Applied => {
                debug!(seq = ticket.seq, trigger = ?ticket.trigger, "Snapshot applied")
            }
            CycleVerdict::Failed | CycleVerdict::Discarded => {}
        }
        self.publish();
    }

    fn publish(&self) {
        let view = self.state.view();
        self.view.send_if_modified(|current| {
            if current != view {
                *current = view.clone();
                true
            } else {
                false
            }
        });
        self.stats.send_replace(self.state.stats());
    }
}
