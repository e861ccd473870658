//! What the user sees and may do, derived from the view state and the submitters.
//!
//! Rendering is a pure function of its inputs. The presentation layer never reads the chain
//! and never keeps contract data of its own.
use std::fmt;
use std::str::FromStr;

use ballot_interface::address::{checksummed, parse_address, AddressError};
use ballot_interface::chains::supported_chain;
use ballot_interface::display::to_display_u64;
use ballot_interface::{Address, Candidate};
use thiserror::Error;

use crate::state::ViewState;
use crate::submitter::{TxPhase, TxStage};

const REGISTERED_NOTICE: &str = "Registered!";
const CONNECT_PROMPT: &str = "Please connect wallet to vote.";

/// A user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Connect the wallet.
    Connect,
    /// Disconnect the wallet.
    Disconnect,
    /// Vote for the candidate with this id.
    Vote(u64),
    /// Open the voter registration dialog.
    OpenRegisterDialog,
    /// Close the voter registration dialog.
    CloseRegisterDialog,
    /// Register the address typed into the dialog.
    RegisterVoter(String),
    /// Re-read the contract now.
    Refresh,
    /// Leave the client.
    Quit,
}

/// A line of input is not a known command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentParseError {
    /// Nothing was typed.
    #[error("empty command")]
    Empty,
    /// The command is not known.
    #[error("unknown command `{0}`, try `help`")]
    Unknown(String),
    /// The command needs an argument.
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    /// The candidate id is not a number.
    #[error("invalid candidate id `{0}`")]
    InvalidCandidate(String),
}

impl FromStr for Intent {
    type Err = IntentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = words.next().ok_or(IntentParseError::Empty)?;
        let argument = words.next();

        match command.to_ascii_lowercase().as_str() {
            "connect" => Ok(Intent::Connect),
            "disconnect" => Ok(Intent::Disconnect),
            "vote" => {
                let id = argument.ok_or(IntentParseError::MissingArgument("vote"))?;
                id.parse()
                    .map(Intent::Vote)
                    .map_err(|_| IntentParseError::InvalidCandidate(id.to_string()))
            }
            "open-register" => Ok(Intent::OpenRegisterDialog),
            "close-register" => Ok(Intent::CloseRegisterDialog),
            "register" => argument
                .map(|address| Intent::RegisterVoter(address.to_string()))
                .ok_or(IntentParseError::MissingArgument("register")),
            "refresh" => Ok(Intent::Refresh),
            "quit" | "exit" => Ok(Intent::Quit),
            other => Err(IntentParseError::Unknown(other.to_string())),
        }
    }
}

/// Commands accepted by [`Intent::from_str`], for help output.
pub const HELP: &str = "\
connect                 connect the wallet
disconnect              disconnect the wallet
vote <id>               vote for a candidate
open-register           open the voter registration dialog (admin)
register <address>      register a voter (admin)
close-register          close the voter registration dialog
refresh                 re-read the contract
quit                    leave";

/// Input state of the admin's voter registration dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterDialog {
    /// The dialog is shown.
    pub open: bool,
    /// Text typed into the address field.
    pub input: String,
    /// Validation error of the address field.
    pub field_error: Option<AddressError>,
}

impl RegisterDialog {
    /// Shows the dialog with an empty field.
    pub fn open(&mut self) {
        *self = Self {
            open: true,
            ..Self::default()
        };
    }

    /// Hides the dialog and forgets the input.
    pub fn close(&mut self) {
        *self = Self::default();
    }

    /// Takes `input` as the field content and validates it. On error the field shows the
    /// error and nothing may be submitted.
    pub fn validate(&mut self, input: &str) -> Option<Address> {
        self.input = input.trim().to_string();
        match parse_address(&self.input) {
            Ok(address) => {
                self.field_error = None;
                Some(address)
            }
            Err(e) => {
                self.field_error = Some(e);
                None
            }
        }
    }
}

/// The account panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountPanel {
    /// Checksummed address.
    pub address: String,
    /// Chain id of the connection.
    pub chain_id: u64,
    /// Name of the chain, if it is one the client knows.
    pub chain_name: Option<&'static str>,
}

/// The admin's voter registration panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterPanel {
    /// The dialog is shown.
    pub dialog_open: bool,
    /// Current field content.
    pub input: String,
    /// Validation error of the field.
    pub field_error: Option<String>,
    /// A registration is in flight and the register action is disabled.
    pub busy: bool,
    /// Stage of the last registration.
    pub stage: TxStage,
    /// Success notice of the last registration.
    pub notice: Option<&'static str>,
    /// Error of the last registration.
    pub error: Option<String>,
}

/// One row of the candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRow {
    /// Candidate id, passed to `vote`.
    pub id: u64,
    /// `"<name> - Votes: <count>"`.
    pub label: String,
    /// The vote action is offered for this row.
    pub vote_enabled: bool,
}

/// The ballot as shown to a connected account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallotScreen {
    /// Account panel.
    pub account: AccountPanel,
    /// A cycle is in flight; the candidate list is not shown.
    pub loading: bool,
    /// Persistent read failure warning.
    pub warning: Option<String>,
    /// Registration panel, only for the admin.
    pub register: Option<RegisterPanel>,
    /// Candidates in contract order.
    pub candidates: Vec<CandidateRow>,
    /// Stage of the last vote.
    pub vote_stage: TxStage,
    /// Error of the last vote.
    pub vote_error: Option<String>,
    /// Why voting is not possible, if it is not.
    pub vote_hint: Option<&'static str>,
}

/// Everything on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// No wallet connected.
    ConnectPrompt,
    /// A wallet is connected.
    Ballot(Box<BallotScreen>),
}

impl Screen {
    /// Derives the screen from the current view and transaction phases.
    pub fn render(
        view: &ViewState,
        vote: &TxPhase,
        registration: &TxPhase,
        dialog: &RegisterDialog,
    ) -> Self {
        let ViewState::Connected(connected) = view else {
            return Screen::ConnectPrompt;
        };
        let snapshot = &connected.snapshot;
        let connection = connected.connection;

        let account = AccountPanel {
            address: checksummed(&connection.address),
            chain_id: connection.chain_id,
            chain_name: supported_chain(connection.chain_id).map(|chain| chain.name),
        };

        let can_vote = !snapshot.is_loading && snapshot.voter.can_vote() && !vote.is_in_flight();
        let candidates = if snapshot.is_loading {
            Vec::new()
        } else {
            snapshot
                .candidates
                .iter()
                .map(|candidate| CandidateRow {
                    id: candidate.id,
                    label: candidate_label(candidate),
                    vote_enabled: can_vote,
                })
                .collect()
        };

        let vote_hint = if snapshot.is_loading {
            None
        } else if !snapshot.voter.is_registered {
            Some("You are not registered to vote")
        } else if snapshot.voter.has_voted {
            Some("You have already voted")
        } else {
            None
        };

        // Admin status does not change between cycles, so the panel stays while loading and
        // the dialog keeps its input.
        let register = snapshot.is_admin.then(|| RegisterPanel {
            dialog_open: dialog.open,
            input: dialog.input.clone(),
            field_error: dialog.field_error.as_ref().map(ToString::to_string),
            busy: registration.is_in_flight(),
            stage: registration.stage(),
            notice: matches!(registration, TxPhase::Confirmed { .. }).then_some(REGISTERED_NOTICE),
            error: registration.failure().map(ToString::to_string),
        });

        Screen::Ballot(Box::new(BallotScreen {
            account,
            loading: snapshot.is_loading,
            warning: connected.warning.clone(),
            register,
            candidates,
            vote_stage: vote.stage(),
            vote_error: vote.failure().map(ToString::to_string),
            vote_hint,
        }))
    }

    /// The candidate row with `id`, if it is shown.
    pub fn candidate(&self, id: u64) -> Option<&CandidateRow> {
        match self {
            Screen::ConnectPrompt => None,
            Screen::Ballot(ballot) => ballot.candidates.iter().find(|row| row.id == id),
        }
    }
}

fn candidate_label(candidate: &Candidate) -> String {
    match to_display_u64(candidate.vote_count) {
        Ok(votes) => format!("{} - Votes: {}", candidate.name, votes),
        Err(e) => format!("{} - Votes: <{}>", candidate.name, e),
    }
}

fn stage_label(stage: TxStage) -> Option<&'static str> {
    match stage {
        TxStage::Submitting => Some("waiting for signature..."),
        TxStage::Pending => Some("waiting for confirmation..."),
        TxStage::Idle | TxStage::Confirmed | TxStage::Failed => None,
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ballot = match self {
            Screen::ConnectPrompt => return writeln!(f, "{CONNECT_PROMPT}"),
            Screen::Ballot(ballot) => ballot,
        };

        let account = &ballot.account;
        writeln!(f, "Account")?;
        writeln!(f, "  address: {}", account.address)?;
        match account.chain_name {
            Some(name) => writeln!(f, "  chain:   {} ({})", name, account.chain_id)?,
            None => writeln!(f, "  chain:   unsupported ({})", account.chain_id)?,
        }
        writeln!(f)?;

        writeln!(f, "Decentralized Voting System")?;
        if let Some(warning) = &ballot.warning {
            writeln!(f, "! {warning}")?;
        }

        if let Some(panel) = &ballot.register {
            writeln!(f, "[admin] Register Voter")?;
            if panel.dialog_open {
                writeln!(f, "  voter address: {}", panel.input)?;
                if let Some(error) = &panel.field_error {
                    writeln!(f, "  invalid address: {error}")?;
                }
            }
            if let Some(status) = stage_label(panel.stage) {
                writeln!(f, "  {status}")?;
            }
            if let Some(notice) = panel.notice {
                writeln!(f, "  {notice}")?;
            }
            if let Some(error) = &panel.error {
                writeln!(f, "  error: {error}")?;
            }
        }

        writeln!(f, "Candidates")?;
        if ballot.loading {
            writeln!(f, "  Loading...")?;
        } else if ballot.candidates.is_empty() {
            writeln!(f, "  No candidates")?;
        }
        for row in &ballot.candidates {
            let action = if row.vote_enabled { "  [vote]" } else { "" };
            writeln!(f, "  {:>3}  {}{}", row.id, row.label, action)?;
        }
        if let Some(hint) = ballot.vote_hint {
            writeln!(f, "  {hint}")?;
        }
        if let Some(status) = stage_label(ballot.vote_stage) {
            writeln!(f, "  vote {status}")?;
        }
        if let Some(error) = &ballot.vote_error {
            writeln!(f, "  error: {error}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ballot_interface::services::wallet::TxReceipt;
    use ballot_interface::{BallotCall, Snapshot, TxHash, VoterRecord, U256};

    use super::*;
    use crate::session::Connection;
    use crate::state::ConnectedView;
    use crate::submitter::TxFailure;

    fn view(snapshot: Snapshot) -> ViewState {
        ViewState::Connected(ConnectedView {
            connection: Connection {
                address: Address::repeat_byte(0xab),
                chain_id: 11_155_111,
            },
            snapshot,
            warning: None,
        })
    }

    fn snapshot(voter: VoterRecord, is_admin: bool) -> Snapshot {
        Snapshot {
            is_admin,
            voter,
            candidates: Arc::from(vec![
                Candidate {
                    id: 0,
                    name: "Alice".to_string(),
                    vote_count: U256::from(3),
                },
                Candidate {
                    id: 1,
                    name: "Bob".to_string(),
                    vote_count: U256::MAX,
                },
            ]),
            is_loading: false,
        }
    }

    const REGISTERED: VoterRecord = VoterRecord {
        is_registered: true,
        has_voted: false,
    };

    fn ballot(screen: Screen) -> BallotScreen {
        match screen {
            Screen::Ballot(ballot) => *ballot,
            Screen::ConnectPrompt => panic!("expected a ballot"),
        }
    }

    fn render(view: &ViewState, vote: &TxPhase) -> BallotScreen {
        ballot(Screen::render(
            view,
            vote,
            &TxPhase::Idle,
            &RegisterDialog::default(),
        ))
    }

    #[test]
    fn test_parse_intents() {
        assert_eq!(Ok(Intent::Vote(2)), "vote 2".parse());
        assert_eq!(Ok(Intent::Connect), " CONNECT ".parse());
        assert_eq!(
            Ok(Intent::RegisterVoter("0xabc".to_string())),
            "register 0xabc".parse()
        );
        assert_eq!(
            Err(IntentParseError::InvalidCandidate("x".to_string())),
            "vote x".parse::<Intent>()
        );
        assert_eq!(
            Err(IntentParseError::MissingArgument("vote")),
            "vote".parse::<Intent>()
        );
        assert_eq!(Err(IntentParseError::Empty), "  ".parse::<Intent>());
        assert!(matches!(
            "dance".parse::<Intent>(),
            Err(IntentParseError::Unknown(_))
        ));
    }

    #[test]
    fn test_disconnected_shows_prompt() {
        let screen = Screen::render(
            &ViewState::Disconnected,
            &TxPhase::Idle,
            &TxPhase::Idle,
            &RegisterDialog::default(),
        );
        assert_eq!(Screen::ConnectPrompt, screen);
        assert_eq!("Please connect wallet to vote.\n", screen.to_string());
    }

    #[test]
    fn test_rows_and_account() {
        let screen = render(&view(snapshot(REGISTERED, false)), &TxPhase::Idle);

        assert_eq!(Some("Sepolia"), screen.account.chain_name);
        assert_eq!(11_155_111, screen.account.chain_id);
        assert_eq!(
            format!("{:#x}", Address::repeat_byte(0xab)),
            screen.account.address.to_lowercase()
        );
        assert_eq!("Alice - Votes: 3", screen.candidates[0].label);
        assert!(screen.candidates[1].label.starts_with("Bob - Votes: <"));
        assert!(screen.candidates.iter().all(|row| row.vote_enabled));
        assert_eq!(None, screen.register);
        assert_eq!(None, screen.vote_hint);
    }

    #[test]
    fn test_has_voted_disables_vote() {
        let voted = VoterRecord {
            is_registered: true,
            has_voted: true,
        };
        let screen = render(&view(snapshot(voted, false)), &TxPhase::Idle);
        assert!(screen.candidates.iter().all(|row| !row.vote_enabled));
        assert_eq!(Some("You have already voted"), screen.vote_hint);

        let screen = render(&view(snapshot(VoterRecord::default(), false)), &TxPhase::Idle);
        assert!(screen.candidates.iter().all(|row| !row.vote_enabled));
        assert_eq!(Some("You are not registered to vote"), screen.vote_hint);
    }

    #[test]
    fn test_vote_in_flight_disables_vote() {
        let pending = TxPhase::Pending {
            call: BallotCall::Vote(0),
            tx_hash: TxHash::zero(),
        };
        let screen = render(&view(snapshot(REGISTERED, false)), &pending);
        assert!(screen.candidates.iter().all(|row| !row.vote_enabled));
        assert_eq!(TxStage::Pending, screen.vote_stage);
    }

    #[test]
    fn test_loading_hides_candidates() {
        let loading = snapshot(REGISTERED, false).with_loading(true);
        let screen = Screen::render(
            &view(loading),
            &TxPhase::Idle,
            &TxPhase::Idle,
            &RegisterDialog::default(),
        );
        assert_eq!(None, screen.candidate(0));
        assert!(screen.to_string().contains("Loading..."));
    }

    #[test]
    fn test_vote_error_is_shown() {
        let failed = TxPhase::Failed {
            call: BallotCall::Vote(0),
            failure: TxFailure::Reverted {
                reason: "You have already voted".to_string(),
            },
        };
        let screen = render(&view(snapshot(REGISTERED, false)), &failed);
        assert_eq!(Some("You have already voted".to_string()), screen.vote_error);
        assert!(screen.candidates.iter().all(|row| row.vote_enabled));
    }

    #[test]
    fn test_admin_panel() {
        let mut dialog = RegisterDialog::default();
        dialog.open();
        assert_eq!(None, dialog.validate("not an address"));
        assert_eq!(Some(AddressError::MissingPrefix), dialog.field_error);

        let screen = ballot(Screen::render(
            &view(snapshot(VoterRecord::default(), true)),
            &TxPhase::Idle,
            &TxPhase::Idle,
            &dialog,
        ));
        let panel = screen.register.unwrap();
        assert!(panel.dialog_open);
        assert_eq!(Some("address must start with 0x".to_string()), panel.field_error);
        assert_eq!(None, panel.notice);

        let address = format!("{:#x}", Address::repeat_byte(7));
        assert_eq!(Some(Address::repeat_byte(7)), dialog.validate(&address));
        assert_eq!(None, dialog.field_error);

        let confirmed = TxPhase::Confirmed {
            call: BallotCall::RegisterVoter(Address::repeat_byte(7)),
            receipt: TxReceipt {
                tx_hash: TxHash::zero(),
                block_number: Some(1),
                success: true,
            },
        };
        let screen = ballot(Screen::render(
            &view(snapshot(VoterRecord::default(), true)),
            &TxPhase::Idle,
            &confirmed,
            &dialog,
        ));
        assert_eq!(Some("Registered!"), screen.register.unwrap().notice);
    }

    #[test]
    fn test_text_rendering() {
        let text = Screen::render(
            &view(snapshot(REGISTERED, false)),
            &TxPhase::Idle,
            &TxPhase::Idle,
            &RegisterDialog::default(),
        )
        .to_string();
        assert!(text.contains("chain:   Sepolia (11155111)"));
        assert!(text.contains("Alice - Votes: 3  [vote]"));
        assert!(!text.contains("[admin]"));
    }
}
