use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ballot_interface::address::{parse_address, AddressError};
use ballot_interface::revert::extract_reason;
use ballot_interface::services::wallet::{TxReceipt, Wallet, WalletError};
use ballot_interface::{BallotCall, TxHash};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::synchronizer::RefreshHandle;

const RECEIPT_REVERTED: &str = "Transaction reverted";

/// Why a submitted call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxFailure {
    /// The contract rejected the call. `reason` is the revert reason as shown to the user.
    #[error("{reason}")]
    Reverted {
        /// Human readable revert reason.
        reason: String,
    },
    /// The node could not be reached. The message is only logged.
    #[error("Network error, please try again")]
    Transport {
        /// Raw transport error.
        message: String,
    },
}

/// Lifecycle of one state-changing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxStage {
    /// Nothing submitted.
    #[default]
    Idle,
    /// Waiting for the wallet to sign and broadcast.
    Submitting,
    /// Broadcast, waiting to be included in a block.
    Pending,
    /// Included in a block and executed successfully.
    Confirmed,
    /// Rejected by the contract or lost in transport.
    Failed,
}

/// Externally visible state of a [`TxSubmitter`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TxPhase {
    /// Nothing submitted, or the last result was acknowledged.
    #[default]
    Idle,
    /// The wallet is asked to sign and broadcast `call`.
    Submitting {
        /// The submitted call.
        call: BallotCall,
    },
    /// The transaction was broadcast.
    Pending {
        /// The submitted call.
        call: BallotCall,
        /// Hash of the broadcast transaction.
        tx_hash: TxHash,
    },
    /// The transaction was included in a block and did not revert.
    Confirmed {
        /// The submitted call.
        call: BallotCall,
        /// Receipt of the transaction.
        receipt: TxReceipt,
    },
    /// The call failed.
    Failed {
        /// The submitted call.
        call: BallotCall,
        /// What went wrong.
        failure: TxFailure,
    },
}

impl TxPhase {
    /// Coarse stage of the phase.
    pub fn stage(&self) -> TxStage {
        match self {
            TxPhase::Idle => TxStage::Idle,
            TxPhase::Submitting { .. } => TxStage::Submitting,
            TxPhase::Pending { .. } => TxStage::Pending,
            TxPhase::Confirmed { .. } => TxStage::Confirmed,
            TxPhase::Failed { .. } => TxStage::Failed,
        }
    }

    /// True between the start of a submission and its terminal phase.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TxPhase::Submitting { .. } | TxPhase::Pending { .. })
    }

    /// The failure to show, if the last submission failed.
    pub fn failure(&self) -> Option<&TxFailure> {
        match self {
            TxPhase::Failed { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

/// A submission could not be started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The supplied address is not well formed. Nothing was sent.
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),
    /// A previous submission of this submitter is still in flight.
    #[error("a transaction is already in flight")]
    Busy,
}

/// A submission that owns its [`TxSubmitter`] and has published [`TxPhase::Submitting`].
///
/// Returned by [`TxSubmitter::claim`] and consumed by [`TxSubmitter::drive`].
#[derive(Debug)]
#[must_use = "a claimed submitter stays in flight until the claim is driven"]
pub struct Claim {
    call: BallotCall,
    generation: u64,
}

impl Claim {
    /// The claimed call.
    pub fn call(&self) -> BallotCall {
        self.call
    }
}

/// Drives state-changing calls through their lifecycle.
///
/// Each user action owns one submitter, so at most one transaction per action is in flight.
/// A confirmed transaction requests a refresh from the synchronizer: the snapshot is never
/// patched locally.
pub struct TxSubmitter<W: Wallet> {
    wallet: Arc<W>,
    phase: watch::Sender<TxPhase>,
    // Only read or changed while the `phase` lock is held.
    generation: AtomicU64,
    refresh: RefreshHandle,
}

impl<W: Wallet> TxSubmitter<W> {
    /// Creates an idle submitter signing with `wallet`.
    pub fn new(wallet: Arc<W>, refresh: RefreshHandle) -> Self {
        let (phase, _) = watch::channel(TxPhase::Idle);
        Self {
            wallet,
            phase,
            generation: AtomicU64::new(0),
            refresh,
        }
    }

    /// The current phase.
    pub fn phase(&self) -> TxPhase {
        self.phase.borrow().clone()
    }

    /// Receiver notified on every phase change.
    pub fn subscribe(&self) -> watch::Receiver<TxPhase> {
        self.phase.subscribe()
    }

    /// Validates `input` and submits `registerVoter(input)`.
    pub async fn register_voter(&self, input: &str) -> Result<TxPhase, SubmitError> {
        let voter = parse_address(input.trim())?;
        self.submit(BallotCall::RegisterVoter(voter)).await
    }

    /// Submits `vote(candidate_id)`.
    pub async fn vote(&self, candidate_id: u64) -> Result<TxPhase, SubmitError> {
        self.submit(BallotCall::Vote(candidate_id)).await
    }

    /// Claims the submitter and drives `call` to a terminal phase, which is returned.
    pub async fn submit(&self, call: BallotCall) -> Result<TxPhase, SubmitError> {
        let claim = self.claim(call)?;
        Ok(self.drive(claim).await)
    }

    /// Moves the submitter to [`TxPhase::Submitting`] for `call`.
    ///
    /// The check and the transition are one step, so of two concurrent claims at most one
    /// succeeds. Nothing is sent until the claim is driven.
    pub fn claim(&self, call: BallotCall) -> Result<Claim, SubmitError> {
        let mut generation = None;
        self.phase.send_if_modified(|phase| {
            if phase.is_in_flight() {
                return false;
            }
            generation = Some(self.generation.load(Ordering::SeqCst));
            *phase = TxPhase::Submitting { call };
            true
        });
        let generation = generation.ok_or(SubmitError::Busy)?;
        Ok(Claim { call, generation })
    }

    /// Sends the claimed call and follows it to a terminal phase, which is returned.
    ///
    /// A rejected signature request returns to [`TxPhase::Idle`] without reporting an error.
    /// If the submitter is abandoned while the call is in flight the outcome is returned but
    /// no longer published.
    pub async fn drive(&self, claim: Claim) -> TxPhase {
        let Claim { call, generation } = claim;
        info!(%call, "Submitting transaction");

        let tx_hash = match self.wallet.send(call).await {
            Ok(tx_hash) => tx_hash,
            Err(error) => {
                let phase = failed(call, error);
                self.settle(generation, phase.clone());
                return phase;
            }
        };
        info!(%call, ?tx_hash, "Transaction broadcast");
        self.settle(generation, TxPhase::Pending { call, tx_hash });

        let phase = match self.wallet.wait_for_receipt(tx_hash).await {
            Ok(receipt) if receipt.success => TxPhase::Confirmed { call, receipt },
            Ok(receipt) => {
                warn!(%call, ?tx_hash, block = ?receipt.block_number, "Transaction reverted");
                TxPhase::Failed {
                    call,
                    failure: TxFailure::Reverted {
                        reason: RECEIPT_REVERTED.to_string(),
                    },
                }
            }
            Err(error) => failed(call, error),
        };

        let published = self.settle(generation, phase.clone());
        if published && matches!(phase, TxPhase::Confirmed { .. }) {
            info!(%call, ?tx_hash, "Transaction confirmed");
            self.refresh.request();
        }
        phase
    }

    /// Acknowledges a terminal phase and returns to [`TxPhase::Idle`]. Does nothing while a
    /// transaction is in flight.
    pub fn reset(&self) {
        self.phase.send_if_modified(|phase| {
            if phase.is_in_flight() || *phase == TxPhase::Idle {
                false
            } else {
                *phase = TxPhase::Idle;
                true
            }
        });
    }

    /// Stops tracking the current transaction, for example because the wallet disconnected.
    /// The submitter is idle afterwards and the outcome of the abandoned transaction is
    /// ignored.
    pub fn abandon(&self) {
        self.phase.send_modify(|phase| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *phase = TxPhase::Idle;
        });
    }

    /// Publishes `phase` unless the submission started in `generation` was abandoned.
    fn settle(&self, generation: u64, phase: TxPhase) -> bool {
        self.phase.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *current = phase;
            true
        })
    }
}

fn failed(call: BallotCall, error: WalletError) -> TxPhase {
    let failure = match error {
        WalletError::Rejected => {
            info!(%call, "Signature request rejected");
            return TxPhase::Idle;
        }
        WalletError::Reverted { message } => {
            let reason = extract_reason(&message).to_string();
            warn!(%call, %reason, "Transaction rejected by the contract");
            TxFailure::Reverted { reason }
        }
        WalletError::Transport { message } => {
            warn!(%call, error = %message, "Transaction could not be submitted");
            TxFailure::Transport { message }
        }
    };
    TxPhase::Failed { call, failure }
}
