//! View-state synchronization for the ballot client.
//!
//! The [`Synchronizer`] turns block ticks, wallet connection changes and refresh requests into
//! sequence-numbered read cycles and publishes exactly one consistent [`ViewState`] at a time.
//! [`TxSubmitter`] tracks state-changing calls and asks the synchronizer for a refresh once
//! they are confirmed. The [`presentation`] module derives what the user is shown and allowed
//! to do from both.
#![deny(missing_docs)]

pub mod config;
mod controller;
mod cycle;
pub mod presentation;
mod session;
mod state;
mod submitter;
mod synchronizer;
mod ticker;

pub use config::SyncConfig;
pub use controller::{BallotController, IntentError};
pub use cycle::{read_snapshot, CycleError};
pub use session::{Connection, WalletSession};
pub use state::{
    ConnectedView, CycleStats, CycleTicket, CycleVerdict, SyncState, Trigger, ViewState,
};
pub use submitter::{Claim, SubmitError, TxFailure, TxPhase, TxStage, TxSubmitter};
pub use synchronizer::{RefreshHandle, SyncHandle, SyncStopped, Synchronizer};
pub use ticker::BlockTicker;
