use ballot_interface::{Address, BallotCall, CandidateRecord, VoterRecord, U256};
use ethers_contract::BaseContract;
use ethers_core::abi::{Abi, AbiError};
use ethers_core::types::Bytes;

const VOTING_ABI: &str = include_str!("../abi/Voting.json");

/// Voting contract wrapper: encodes call data and decodes return data.
#[derive(Debug, Clone)]
pub struct VotingContract {
    base_contract: BaseContract,
}

impl VotingContract {
    /// Builds the wrapper from the bundled contract ABI.
    pub fn new() -> Result<Self, serde_json::Error> {
        let abi: Abi = serde_json::from_str(VOTING_ABI)?;
        Ok(Self {
            base_contract: BaseContract::from(abi),
        })
    }

    /// Call data of `admin()`.
    pub fn admin_call_data(&self) -> Result<Bytes, AbiError> {
        self.base_contract.encode("admin", ())
    }

    /// Call data of `getTotalCandidates()`.
    pub fn total_candidates_call_data(&self) -> Result<Bytes, AbiError> {
        self.base_contract.encode("getTotalCandidates", ())
    }

    /// Call data of `getCandidate(index)`.
    pub fn candidate_call_data(&self, index: u64) -> Result<Bytes, AbiError> {
        self.base_contract.encode("getCandidate", U256::from(index))
    }

    /// Call data of `voters(address)`.
    pub fn voter_call_data(&self, address: Address) -> Result<Bytes, AbiError> {
        self.base_contract.encode("voters", address)
    }

    /// Call data of a state-changing call.
    pub fn call_data(&self, call: BallotCall) -> Result<Bytes, AbiError> {
        match call {
            BallotCall::RegisterVoter(voter) => self.base_contract.encode("registerVoter", voter),
            BallotCall::Vote(candidate_id) => self
                .base_contract
                .encode("vote", U256::from(candidate_id)),
        }
    }

    /// Decodes the output of `admin()`.
    pub fn decode_admin(&self, output: &[u8]) -> Result<Address, AbiError> {
        self.base_contract.decode_output("admin", output)
    }

    /// Decodes the output of `getTotalCandidates()`.
    pub fn decode_total_candidates(&self, output: &[u8]) -> Result<U256, AbiError> {
        self.base_contract.decode_output("getTotalCandidates", output)
    }

    /// Decodes the output of `getCandidate(index)`.
    pub fn decode_candidate(&self, output: &[u8]) -> Result<CandidateRecord, AbiError> {
        let (name, vote_count): (String, U256) =
            self.base_contract.decode_output("getCandidate", output)?;
        Ok(CandidateRecord { name, vote_count })
    }

    /// Decodes the output of `voters(address)`.
    pub fn decode_voter(&self, output: &[u8]) -> Result<VoterRecord, AbiError> {
        let (is_registered, has_voted): (bool, bool) =
            self.base_contract.decode_output("voters", output)?;
        Ok(VoterRecord {
            is_registered,
            has_voted,
        })
    }
}
