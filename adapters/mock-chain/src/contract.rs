use std::collections::HashMap;

use ballot_interface::{Address, BallotCall, CandidateRecord, VoterRecord, U256};

/// State and rules of the voting contract.
#[derive(Debug, Clone)]
pub struct MockContract {
    admin: Address,
    candidates: Vec<CandidateRecord>,
    voters: HashMap<Address, VoterRecord>,
}

impl MockContract {
    /// Creates a contract administered by `admin`, with no candidates and no voters.
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            candidates: Vec::new(),
            voters: HashMap::new(),
        }
    }

    /// The admin address.
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// All candidates in enumeration order.
    pub fn candidates(&self) -> &[CandidateRecord] {
        &self.candidates
    }

    /// Appends a candidate with zero votes.
    pub fn add_candidate(&mut self, name: impl Into<String>) {
        self.candidates.push(CandidateRecord {
            name: name.into(),
            vote_count: U256::zero(),
        });
    }

    /// Overwrites the vote count of a candidate. Unknown ids are ignored.
    pub fn set_vote_count(&mut self, id: u64, vote_count: U256) {
        if let Some(candidate) = self.candidates.get_mut(id as usize) {
            candidate.vote_count = vote_count;
        }
    }

    /// Registration state of `address`, the default record if it was never seen.
    pub fn voter(&self, address: &Address) -> VoterRecord {
        self.voters.get(address).copied().unwrap_or_default()
    }

    /// Executes `call` on behalf of `sender`. Returns the revert reason on failure, in which
    /// case the state is left untouched.
    pub fn execute(&mut self, sender: Address, call: BallotCall) -> Result<(), String> {
        match call {
            BallotCall::RegisterVoter(voter) => {
                if sender != self.admin {
                    return Err("Only admin can register".to_string());
                }
                let record = self.voters.entry(voter).or_default();
                if record.is_registered {
                    return Err("Voter is already registered".to_string());
                }
                record.is_registered = true;
            }
            BallotCall::Vote(candidate_id) => {
                let record = self.voter(&sender);
                if !record.is_registered {
                    return Err("You are not registered to vote".to_string());
                }
                if record.has_voted {
                    return Err("You have already voted".to_string());
                }
                let candidate = self
                    .candidates
                    .get_mut(candidate_id as usize)
                    .ok_or_else(|| "Invalid candidate".to_string())?;
                candidate.vote_count += U256::one();
                self.voters.insert(
                    sender,
                    VoterRecord {
                        is_registered: true,
                        has_voted: true,
                    },
                );
            }
        }
        Ok(())
    }
}
