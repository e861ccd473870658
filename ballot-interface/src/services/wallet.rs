//! Signing and broadcasting of contract calls.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Address, BallotCall, TxHash};

/// Why a submission did not make it into a successful block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// The user declined to sign.
    #[error("the request was rejected by the user")]
    Rejected,
    /// The contract rejected the call. `message` is the raw provider message.
    #[error("transaction reverted: {message}")]
    Reverted {
        /// Provider message, usually containing the revert reason.
        message: String,
    },
    /// The node could not be reached or answered with something unexpected.
    #[error("transport error: {message}")]
    Transport {
        /// Provider message.
        message: String,
    },
}

/// Outcome of a transaction that was included in a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Hash of the transaction.
    pub tx_hash: TxHash,
    /// Block the transaction was included in, if the node reported it.
    pub block_number: Option<u64>,
    /// The call executed without reverting.
    pub success: bool,
}

/// The signing side of a wallet connection.
#[async_trait]
pub trait Wallet: Send + Sync + 'static {
    /// Address the wallet signs for.
    fn address(&self) -> Address;

    /// Chain id the wallet is connected to.
    fn chain_id(&self) -> u64;

    /// Requests a signature for `call` and broadcasts it. Returns once the node accepted the
    /// transaction, before it is included in a block.
    async fn send(&self, call: BallotCall) -> Result<TxHash, WalletError>;

    /// Waits until the transaction is included in a block.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, WalletError>;
}
