use ballot_interface::Address;
use serde::Deserialize;

const fn default_receipt_poll_interval_ms() -> u64 {
    1_000
}

/// Connection parameters of the voting contract.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EvmConfig {
    /// JSON-RPC endpoint of the node, e.g. `http://localhost:8545`.
    pub rpc_url: String,
    /// Chain id the contract is deployed on. Connecting to a node on another chain fails.
    pub chain_id: u64,
    /// Address of the deployed voting contract.
    pub contract_address: Address,
    /// How often the node is asked for the receipt of a pending transaction.
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
    /// Send legacy transactions, for chains without EIP-1559 fee markets.
    #[serde(default)]
    pub legacy_transactions: bool,
}
