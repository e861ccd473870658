use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::U256;

/// A candidate record as returned by a single `getCandidate(i)` read.
/// The contract does not return the index, so the id is attached by the reader of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Display name of the candidate.
    pub name: String,
    /// Number of votes cast for the candidate. Unbounded, as stored by the contract.
    pub vote_count: U256,
}

/// A candidate as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Position of the candidate in the contract's enumeration order, starting at 0.
    pub id: u64,
    /// Display name of the candidate.
    pub name: String,
    /// Number of votes cast for the candidate.
    pub vote_count: U256,
}

impl Candidate {
    /// Attaches the enumeration index to a raw candidate record.
    pub fn from_record(id: u64, record: CandidateRecord) -> Self {
        Self {
            id,
            name: record.name,
            vote_count: record.vote_count,
        }
    }
}

/// Registration state of a single address.
///
/// The contract returns the all-zero record for an address it has never seen, which is
/// indistinguishable from an address that is not registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    /// The admin registered this address.
    pub is_registered: bool,
    /// This address already cast its vote.
    pub has_voted: bool,
}

impl VoterRecord {
    /// Whether a vote from this address can be submitted at all.
    pub fn can_vote(&self) -> bool {
        self.is_registered && !self.has_voted
    }
}

/// The atomic bundle of state derived for the connected address.
///
/// A snapshot is never modified once built: every synchronization cycle produces a new
/// one that replaces the previous value as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The connected address is the contract admin.
    pub is_admin: bool,
    /// Registration state of the connected address.
    pub voter: VoterRecord,
    /// Candidates in contract enumeration order.
    pub candidates: Arc<[Candidate]>,
    /// A synchronization cycle is in flight and the data above may be outdated.
    pub is_loading: bool,
}

impl Snapshot {
    /// The snapshot shown before the first cycle for an address has completed.
    pub fn loading() -> Self {
        Self {
            is_admin: false,
            voter: VoterRecord::default(),
            candidates: Arc::from(Vec::new()),
            is_loading: true,
        }
    }

    /// Returns a copy of this snapshot with the loading flag replaced.
    pub fn with_loading(&self, is_loading: bool) -> Self {
        Self {
            is_loading,
            ..self.clone()
        }
    }

    /// Looks up a candidate by id.
    pub fn candidate(&self, id: u64) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::loading()
    }
}

/// A state-changing contract call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallotCall {
    /// `registerVoter(address)`, admin only.
    RegisterVoter(crate::Address),
    /// `vote(uint256)` for the candidate with the given id.
    Vote(u64),
}

impl std::fmt::Display for BallotCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BallotCall::RegisterVoter(address) => write!(f, "registerVoter({:?})", address),
            BallotCall::Vote(candidate_id) => write!(f, "vote({})", candidate_id),
        }
    }
}
