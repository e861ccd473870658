use ballot_interface::{Address, Snapshot};
use tracing::{debug, warn};

use crate::session::Connection;

/// What caused a synchronization cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A wallet connected, or switched to another account.
    Connected,
    /// The node reported a new block.
    NewBlock(u64),
    /// A transaction was confirmed or the user asked for a refresh.
    Refresh,
}

/// A cycle that was started and must be handed back to [`SyncState::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTicket {
    /// Strictly increasing sequence number of the cycle.
    pub seq: u64,
    /// Address the cycle reads state for.
    pub address: Address,
    /// What started the cycle.
    pub trigger: Trigger,
}

/// What happened to the result of a completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleVerdict {
    /// The cycle was the latest one and its snapshot is now the view.
    Applied,
    /// The cycle was the latest one but a read failed. The previous snapshot is kept.
    Failed,
    /// A newer cycle was started, or the wallet disconnected, while this one was in flight.
    Discarded,
}

/// Counters over the lifetime of a synchronizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Cycles started.
    pub initiated: u64,
    /// Cycles whose snapshot was published.
    pub applied: u64,
    /// Cycles whose result was dropped because it was superseded.
    pub discarded: u64,
    /// Latest cycles that failed.
    pub failed: u64,
}

/// The state of a connected account as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedView {
    /// The connected account.
    pub connection: Connection,
    /// Latest consistent contract state for the account.
    pub snapshot: Snapshot,
    /// Set once reads kept failing for a while. Cleared by the next successful cycle.
    pub warning: Option<String>,
}

/// Everything the presentation layer renders from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewState {
    /// No wallet is connected and no contract reads are made.
    #[default]
    Disconnected,
    /// A wallet is connected.
    Connected(ConnectedView),
}

impl ViewState {
    /// The snapshot of the connected account, if any.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            ViewState::Disconnected => None,
            ViewState::Connected(view) => Some(&view.snapshot),
        }
    }

    /// True while a wallet is connected and a cycle is in flight.
    pub fn is_loading(&self) -> bool {
        self.snapshot().map_or(false, |s| s.is_loading)
    }
}

/// Sequencing rules of the synchronizer, without any I/O.
///
/// Every started cycle gets the next sequence number. Only the result of the most recently
/// started cycle is ever applied, so the view can never go back to older state once newer
/// state was requested. Connecting and disconnecting also advance the sequence, which
/// invalidates every cycle started for the previous account.
#[derive(Debug)]
pub struct SyncState {
    latest_seq: u64,
    connection: Option<Connection>,
    view: ViewState,
    loaded: bool,
    consecutive_failures: u32,
    soft_warning_after: u32,
    stats: CycleStats,
}

impl SyncState {
    /// Creates a disconnected state. After `soft_warning_after` consecutive failed cycles the
    /// view carries a warning.
    pub fn new(soft_warning_after: u32) -> Self {
        Self {
            latest_seq: 0,
            connection: None,
            view: ViewState::Disconnected,
            loaded: false,
            consecutive_failures: 0,
            soft_warning_after: soft_warning_after.max(1),
            stats: CycleStats::default(),
        }
    }

    /// The view to render.
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Lifetime counters.
    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    /// The current connection.
    pub fn connection(&self) -> Option<Connection> {
        self.connection
    }

    /// Sequence number of the most recently started cycle, 0 if none was started.
    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    /// Switches to `connection` and starts a cycle for it.
    ///
    /// Reconnecting the same account keeps the data already shown. Any other account starts
    /// from an empty loading snapshot: state read for one address is never shown for another.
    pub fn connect(&mut self, connection: Connection) -> CycleTicket {
        if self.connection.map(|c| c.address) != Some(connection.address) {
            self.loaded = false;
            self.consecutive_failures = 0;
            self.view = ViewState::Connected(ConnectedView {
                connection,
                snapshot: Snapshot::loading(),
                warning: None,
            });
        } else if let ViewState::Connected(view) = &mut self.view {
            view.connection = connection;
        }
        self.connection = Some(connection);
        self.start(connection.address, Trigger::Connected)
    }

    /// Forgets the connection. Results of cycles still in flight will be discarded.
    pub fn disconnect(&mut self) {
        if self.connection.take().is_some() {
            // Invalidate in-flight cycles without starting a new one.
            self.latest_seq += 1;
        }
        self.loaded = false;
        self.consecutive_failures = 0;
        self.view = ViewState::Disconnected;
    }

    /// Starts a cycle for the current connection. Returns `None` while disconnected.
    pub fn begin_cycle(&mut self, trigger: Trigger) -> Option<CycleTicket> {
        let address = self.connection?.address;
        Some(self.start(address, trigger))
    }

    fn start(&mut self, address: Address, trigger: Trigger) -> CycleTicket {
        self.latest_seq += 1;
        self.stats.initiated += 1;
        if let ViewState::Connected(view) = &mut self.view {
            if !view.snapshot.is_loading {
                view.snapshot = view.snapshot.with_loading(true);
            }
        }
        let ticket = CycleTicket {
            seq: self.latest_seq,
            address,
            trigger,
        };
        debug!(?ticket, "Cycle started");
        ticket
    }

    /// Hands back the result of a cycle.
    ///
    /// `outcome` carries the freshly read snapshot or a description of the failed read.
    pub fn complete(
        &mut self,
        ticket: CycleTicket,
        outcome: Result<Snapshot, String>,
    ) -> CycleVerdict {
        let current = self.connection.map(|c| c.address);
        if ticket.seq != self.latest_seq || current != Some(ticket.address) {
            debug!(
                seq = ticket.seq,
                latest = self.latest_seq,
                "Discarding superseded cycle"
            );
            self.stats.discarded += 1;
            return CycleVerdict::Discarded;
        }

        let ViewState::Connected(view) = &mut self.view else {
            self.stats.discarded += 1;
            return CycleVerdict::Discarded;
        };

        match outcome {
            Ok(snapshot) => {
                view.snapshot = snapshot.with_loading(false);
                view.warning = None;
                self.loaded = true;
                self.consecutive_failures = 0;
                self.stats.applied += 1;
                CycleVerdict::Applied
            }
            Err(error) => {
                self.consecutive_failures += 1;
                self.stats.failed += 1;
                warn!(
                    seq = ticket.seq,
                    failures = self.consecutive_failures,
                    %error,
                    "Synchronization cycle failed"
                );
                // Without any successful read there is nothing to show but the loading state.
                if self.loaded {
                    view.snapshot = view.snapshot.with_loading(false);
                }
                if self.consecutive_failures >= self.soft_warning_after {
                    view.warning = Some(format!("Unable to refresh contract state: {error}"));
                }
                CycleVerdict::Failed
            }
        }
    }
}
