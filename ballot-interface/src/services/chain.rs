//! Read access to the voting contract.
use std::fmt::{self, Display};
use std::ops::Range;

use async_trait::async_trait;

use crate::{Address, CandidateRecord, VoterRecord, U256};

/// A `ChainReader` is the local side of an RPC connection to a node serving the voting
/// contract. Every call is a fresh read against the latest state: implementations must not
/// cache results, consistency is the job of the synchronizer.
#[async_trait]
pub trait ChainReader: Send + Sync + 'static {
    /// The error type for fallible methods.
    type Error: fmt::Debug + Send + Sync + Display;

    /// Height of the most recent block known to the node.
    async fn block_number(&self) -> Result<u64, Self::Error>;

    /// `admin()`: the address allowed to register voters.
    async fn admin(&self) -> Result<Address, Self::Error>;

    /// `getTotalCandidates()`.
    async fn total_candidates(&self) -> Result<U256, Self::Error>;

    /// `getCandidate(i)` for every `i` in `indices`, issued as one logical request.
    ///
    /// The returned records are in the same order as the requested indices. If any single
    /// read fails the whole call fails: callers never observe a partial list.
    async fn candidates(&self, indices: Range<u64>) -> Result<Vec<CandidateRecord>, Self::Error>;

    /// `voters(address)`. Unknown addresses yield [`VoterRecord::default`].
    async fn voter(&self, address: Address) -> Result<VoterRecord, Self::Error>;
}
