use std::sync::Arc;

use ballot_interface::services::wallet::Wallet;
use ballot_interface::BallotCall;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::presentation::{Intent, RegisterDialog, Screen};
use crate::session::{Connection, WalletSession};
use crate::state::ViewState;
use crate::submitter::{Claim, SubmitError, TxPhase, TxSubmitter};
use crate::synchronizer::SyncHandle;

/// An intent that is not allowed in the current state. Nothing was sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentError {
    /// The action needs a connected wallet.
    #[error("connect a wallet first")]
    NotConnected,
    /// The contract state is still loading.
    #[error("the ballot is still loading")]
    Loading,
    /// The connected account cannot vote right now.
    #[error("voting is not available for this account")]
    VoteUnavailable,
    /// No candidate with that id is listed.
    #[error("there is no candidate {0}")]
    UnknownCandidate(u64),
    /// Only the admin registers voters.
    #[error("only the admin can register voters")]
    NotAdmin,
    /// The address typed into the dialog is not valid. The dialog shows the error.
    #[error("invalid voter address")]
    InvalidAddress,
    /// The submission could not be started.
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Applies user intents to the wallet session and the transaction submitters.
///
/// Submissions run on their own tasks, so the controller keeps accepting intents while a
/// transaction is pending. Their progress shows up through [`BallotController::screen`].
pub struct BallotController<W: Wallet> {
    wallet: Arc<W>,
    session: Arc<WalletSession>,
    sync: SyncHandle,
    vote: Arc<TxSubmitter<W>>,
    registration: Arc<TxSubmitter<W>>,
    dialog: RegisterDialog,
}

impl<W: Wallet> BallotController<W> {
    /// Creates a controller for `wallet`. The wallet starts disconnected.
    pub fn new(wallet: Arc<W>, session: Arc<WalletSession>, sync: SyncHandle) -> Self {
        let vote = Arc::new(TxSubmitter::new(wallet.clone(), sync.refresher()));
        let registration = Arc::new(TxSubmitter::new(wallet.clone(), sync.refresher()));
        Self {
            wallet,
            session,
            sync,
            vote,
            registration,
            dialog: RegisterDialog::default(),
        }
    }

    /// The screen for the current state.
    pub fn screen(&self) -> Screen {
        Screen::render(
            &self.sync.view(),
            &self.vote.phase(),
            &self.registration.phase(),
            &self.dialog,
        )
    }

    /// Receivers notified whenever something on screen may have changed.
    pub fn watchers(
        &self,
    ) -> (
        watch::Receiver<ViewState>,
        watch::Receiver<TxPhase>,
        watch::Receiver<TxPhase>,
    ) {
        (
            self.sync.subscribe(),
            self.vote.subscribe(),
            self.registration.subscribe(),
        )
    }

    /// The submitter used for votes.
    pub fn vote_submitter(&self) -> &Arc<TxSubmitter<W>> {
        &self.vote
    }

    /// The submitter used for voter registrations.
    pub fn registration_submitter(&self) -> &Arc<TxSubmitter<W>> {
        &self.registration
    }

    /// Applies `intent`.
    ///
    /// Returns the task of a started submission, if the intent started one. The submission is
    /// already in [`TxPhase::Submitting`] when this returns. Returns `Ok(None)` for
    /// [`Intent::Quit`] and every intent that completes immediately.
    pub fn handle(
        &mut self,
        intent: Intent,
    ) -> Result<Option<JoinHandle<TxPhase>>, IntentError> {
        debug!(?intent, "Handling intent");
        match intent {
            Intent::Connect => {
                self.session.connect(Connection::of(self.wallet.as_ref()));
                Ok(None)
            }
            Intent::Disconnect => {
                self.session.disconnect();
                self.vote.abandon();
                self.registration.abandon();
                self.dialog.close();
                Ok(None)
            }
            Intent::Refresh => {
                self.connected()?;
                self.sync.refresh();
                Ok(None)
            }
            Intent::Vote(candidate_id) => self.vote(candidate_id).map(Some),
            Intent::OpenRegisterDialog => {
                self.require_admin()?;
                self.registration.reset();
                self.dialog.open();
                Ok(None)
            }
            Intent::CloseRegisterDialog => {
                self.dialog.close();
                self.registration.reset();
                Ok(None)
            }
            Intent::RegisterVoter(input) => self.register(&input).map(Some),
            Intent::Quit => Ok(None),
        }
    }

    fn connected(&self) -> Result<ViewState, IntentError> {
        match self.sync.view() {
            ViewState::Disconnected => Err(IntentError::NotConnected),
            view => Ok(view),
        }
    }

    fn require_admin(&self) -> Result<(), IntentError> {
        let view = self.connected()?;
        match view.snapshot() {
            Some(snapshot) if snapshot.is_admin => Ok(()),
            _ => Err(IntentError::NotAdmin),
        }
    }

    fn vote(
        &mut self,
        candidate_id: u64,
    ) -> Result<JoinHandle<TxPhase>, IntentError> {
        let view = self.connected()?;
        let Some(snapshot) = view.snapshot() else {
            return Err(IntentError::NotConnected);
        };
        if snapshot.is_loading {
            return Err(IntentError::Loading);
        }
        if !snapshot.voter.can_vote() {
            return Err(IntentError::VoteUnavailable);
        }
        if snapshot.candidate(candidate_id).is_none() {
            return Err(IntentError::UnknownCandidate(candidate_id));
        }
        let claim = self.vote.claim(BallotCall::Vote(candidate_id))?;
        Ok(spawn(&self.vote, claim))
    }

    fn register(
        &mut self,
        input: &str,
    ) -> Result<JoinHandle<TxPhase>, IntentError> {
        self.require_admin()?;
        if !self.dialog.open {
            self.dialog.open();
        }
        let voter = self
            .dialog
            .validate(input)
            .ok_or(IntentError::InvalidAddress)?;
        let claim = self
            .registration
            .claim(BallotCall::RegisterVoter(voter))?;
        Ok(spawn(&self.registration, claim))
    }
}

/// Drives a claimed submission on its own task. The claim already shows on screen.
fn spawn<W: Wallet>(submitter: &Arc<TxSubmitter<W>>, claim: Claim) -> JoinHandle<TxPhase> {
    let submitter = submitter.clone();
    tokio::spawn(async move { submitter.drive(claim).await })
}
