use ballot_interface::services::wallet::WalletError;
use ethers_core::abi::{self, AbiError, ParamType, Token};
use ethers_providers::{JsonRpcError, ProviderError};
use thiserror::Error;

/// EIP-1193 "User Rejected Request".
const USER_REJECTED_CODE: i64 = 4001;
/// Code used by geth-compatible nodes for a reverted `eth_call` / `eth_estimateGas`.
const EXECUTION_REVERTED_CODE: i64 = 3;
/// Selector of `Error(string)`.
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Errors raised while talking to the node.
#[derive(Debug, Error)]
pub enum EvmError {
    /// The JSON-RPC client failed.
    #[error("rpc error: {0}")]
    Rpc(#[from] jsonrpsee::core::Error),
    /// The ethers provider failed.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    /// Call data could not be encoded or return data could not be decoded.
    #[error("abi error: {0}")]
    Abi(#[from] AbiError),
    /// Request parameters could not be serialized, or the bundled ABI is invalid.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// One element of a batch request failed.
    #[error("batch element {index} failed: {message}")]
    BatchElement {
        /// Candidate index of the failed element.
        index: u64,
        /// Error returned by the node.
        message: String,
    },
    /// The node answered a batch with an unexpected number of responses.
    #[error("expected {expected} batch responses, got {actual}")]
    BatchLength {
        /// Number of requests sent.
        expected: usize,
        /// Number of responses received.
        actual: usize,
    },
    /// The node is on a different chain than configured.
    #[error("node is on chain {actual}, expected chain {expected}")]
    ChainMismatch {
        /// Configured chain id.
        expected: u64,
        /// Chain id reported by the node.
        actual: u64,
    },
    /// The chain is not one the client supports.
    #[error("chain {0} is not supported")]
    UnsupportedChain(u64),
    /// Invalid settings.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Sorts a failed write into user rejection, contract revert or transport failure.
pub fn classify_rpc_failure(code: Option<i64>, message: &str) -> WalletError {
    let lowercase = message.to_lowercase();
    if code == Some(USER_REJECTED_CODE)
        || lowercase.contains("user rejected")
        || lowercase.contains("user denied")
    {
        return WalletError::Rejected;
    }
    if code == Some(EXECUTION_REVERTED_CODE) || lowercase.contains("revert") {
        return WalletError::Reverted {
            message: message.to_string(),
        };
    }
    WalletError::Transport {
        message: message.to_string(),
    }
}

/// Classifies a JSON-RPC error response. Revert data encoded as `Error(string)` is decoded
/// and appended to the message as `reason: <text>`.
pub(crate) fn classify_error_response(response: &JsonRpcError) -> WalletError {
    let message = match revert_reason(response) {
        Some(reason) if !response.message.contains(&reason) => {
            format!("{}, reason: {}", response.message, reason)
        }
        _ => response.message.clone(),
    };
    classify_rpc_failure(Some(response.code), &message)
}

fn revert_reason(response: &JsonRpcError) -> Option<String> {
    let data = response.data.as_ref()?.as_str()?;
    let bytes = hex::decode(data.strip_prefix("0x").unwrap_or(data)).ok()?;
    let payload = bytes.strip_prefix(&ERROR_STRING_SELECTOR[..])?;
    match abi::decode(&[ParamType::String], payload).ok()?.pop()? {
        Token::String(reason) => Some(reason),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_response(code: i64, message: &str, data: Option<serde_json::Value>) -> JsonRpcError {
        JsonRpcError {
            code,
            message: message.to_string(),
            data,
        }
    }

    #[test]
    fn test_user_rejection() {
        assert_eq!(
            WalletError::Rejected,
            classify_rpc_failure(Some(4001), "User rejected the request.")
        );
        assert_eq!(
            WalletError::Rejected,
            classify_rpc_failure(None, "MetaMask Tx Signature: User denied transaction signature.")
        );
    }

    #[test]
    fn test_revert() {
        assert_eq!(
            WalletError::Reverted {
                message: "execution reverted: Only admin can register".to_string()
            },
            classify_rpc_failure(Some(3), "execution reverted: Only admin can register")
        );
        assert!(matches!(
            classify_rpc_failure(Some(-32000), "execution reverted"),
            WalletError::Reverted { .. }
        ));
    }

    #[test]
    fn test_transport() {
        assert_eq!(
            WalletError::Transport {
                message: "error sending request".to_string()
            },
            classify_rpc_failure(None, "error sending request")
        );
    }

    #[test]
    fn test_revert_data_is_decoded() {
        let mut data = ERROR_STRING_SELECTOR.to_vec();
        data.extend(abi::encode(&[Token::String("You have already voted".to_string())]));
        let response = error_response(
            3,
            "execution reverted",
            Some(serde_json::Value::String(format!("0x{}", hex::encode(data)))),
        );

        assert_eq!(
            WalletError::Reverted {
                message: "execution reverted, reason: You have already voted".to_string()
            },
            classify_error_response(&response)
        );
    }

    #[test]
    fn test_reason_already_in_message_is_not_repeated() {
        let mut data = ERROR_STRING_SELECTOR.to_vec();
        data.extend(abi::encode(&[Token::String("Invalid candidate".to_string())]));
        let response = error_response(
            3,
            "execution reverted: Invalid candidate",
            Some(serde_json::Value::String(format!("0x{}", hex::encode(data)))),
        );

        assert_eq!(
            WalletError::Reverted {
                message: "execution reverted: Invalid candidate".to_string()
            },
            classify_error_response(&response)
        );
    }
}
