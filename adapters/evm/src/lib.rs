//! Implements the ballot client services against a voting contract deployed on an EVM chain.
//!
//! Reads are plain `eth_call`s sent through a JSON-RPC client, with the candidate list fetched
//! as a single batch request. Writes are signed locally and broadcast through an ethers
//! signer middleware.
#![deny(missing_docs)]

mod config;
mod contract;
mod error;
mod reader;
mod wallet;

pub use config::EvmConfig;
pub use contract::VotingContract;
pub use error::{classify_rpc_failure, EvmError};
pub use ethers_signers::LocalWallet;
pub use reader::EvmChainReader;
pub use wallet::EvmWallet;
