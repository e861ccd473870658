use std::time::Duration;

use async_trait::async_trait;
use ballot_interface::chains::supported_chain;
use ballot_interface::services::wallet::{TxReceipt, Wallet, WalletError};
use ballot_interface::{Address, BallotCall, TxHash};
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Eip1559TransactionRequest, TransactionRequest};
use ethers_middleware::SignerMiddleware;
use ethers_providers::{Http, Middleware, MiddlewareError, PendingTransaction, Provider};
use ethers_signers::{LocalWallet, Signer};
use tracing::{debug, info};

use crate::config::EvmConfig;
use crate::contract::VotingContract;
use crate::error::{classify_error_response, EvmError};

/// Signs voting contract calls with a local key and broadcasts them.
pub struct EvmWallet {
    chain_id: u64,
    contract_address: Address,
    contract: VotingContract,
    client: SignerMiddleware<Provider<Http>, LocalWallet>,
    legacy_transactions: bool,
    receipt_poll_interval: Duration,
}

impl EvmWallet {
    /// Connects `signer` to the node in `config`. Fails if the node is on a different chain
    /// than configured, or on a chain the client does not support.
    pub async fn connect(config: &EvmConfig, signer: LocalWallet) -> Result<Self, EvmError> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| EvmError::Config(format!("invalid rpc url {}: {}", config.rpc_url, e)))?;

        let client = SignerMiddleware::new_with_provider_chain(provider, signer)
            .await
            .map_err(|e| EvmError::Config(format!("unable to connect the signer: {e}")))?;

        let chain_id = client.signer().chain_id();
        if chain_id != config.chain_id {
            return Err(EvmError::ChainMismatch {
                expected: config.chain_id,
                actual: chain_id,
            });
        }
        let chain = supported_chain(chain_id).ok_or(EvmError::UnsupportedChain(chain_id))?;
        info!(
            address = ?client.address(),
            chain = chain.name,
            "Wallet connected"
        );

        Ok(Self {
            chain_id,
            contract_address: config.contract_address,
            contract: VotingContract::new()?,
            client,
            legacy_transactions: config.legacy_transactions,
            receipt_poll_interval: Duration::from_millis(config.receipt_poll_interval_ms),
        })
    }

    fn transaction(&self, call: BallotCall) -> Result<TypedTransaction, WalletError> {
        let data = self
            .contract
            .call_data(call)
            .map_err(|e| WalletError::Transport {
                message: e.to_string(),
            })?;

        let tx = if self.legacy_transactions {
            TransactionRequest::new()
                .from(self.client.address())
                .to(self.contract_address)
                .data(data)
                .into()
        } else {
            Eip1559TransactionRequest::new()
                .from(self.client.address())
                .to(self.contract_address)
                .data(data)
                .into()
        };
        Ok(tx)
    }
}

fn classify<E: MiddlewareError>(error: &E) -> WalletError {
    match error.as_error_response() {
        Some(response) => classify_error_response(response),
        None => crate::classify_rpc_failure(None, &error.to_string()),
    }
}

#[async_trait]
impl Wallet for EvmWallet {
    fn address(&self) -> Address {
        self.client.address()
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn send(&self, call: BallotCall) -> Result<TxHash, WalletError> {
        let tx = self.transaction(call)?;
        // Filling the transaction estimates gas, which is where a revert is reported.
        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| classify(&e))?;
        let tx_hash = *pending;
        debug!(%call, ?tx_hash, "Transaction broadcast");
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, WalletError> {
        let receipt = PendingTransaction::new(tx_hash, self.client.provider())
            .interval(self.receipt_poll_interval)
            .await
            .map_err(|e| classify(&e))?
            .ok_or_else(|| WalletError::Transport {
                message: format!("transaction {tx_hash:?} was dropped from the mempool"),
            })?;

        Ok(TxReceipt {
            tx_hash,
            block_number: receipt.block_number.map(|n| n.as_u64()),
            // Receipts without a status predate Byzantium and cannot signal a revert.
            success: receipt.status.map_or(true, |status| status.as_u64() == 1),
        })
    }
}

#[cfg(test)]
mod tests {
    use ethers_core::abi::{encode, Token};
    use ethers_core::types::{Transaction, TransactionReceipt, U64};
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;

    /// First hardhat development key.
    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

    /// Answer to a node method: `Ok` result, `Err` error object, `None` for an HTTP 500.
    type Answer = fn(&str) -> Option<Result<Value, Value>>;

    fn tx_hash() -> TxHash {
        TxHash::repeat_byte(0xab)
    }

    /// Starts a node on chain 31337 that answers what filling a legacy transaction needs and
    /// hands every other method to `answer`.
    async fn start_node(answer: Answer) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(move |req: &Request| {
                let request: Value = serde_json::from_slice(&req.body).unwrap();
                let outcome = match request["method"].as_str().unwrap() {
                    "eth_chainId" => Some(Ok(json!("0x7a69"))),
                    "eth_getTransactionCount" => Some(Ok(json!("0x0"))),
                    "eth_gasPrice" => Some(Ok(json!("0x3b9aca00"))),
                    other => answer(other),
                };
                let body = match outcome {
                    Some(Ok(result)) => {
                        json!({ "jsonrpc": "2.0", "id": request["id"], "result": result })
                    }
                    Some(Err(error)) => {
                        json!({ "jsonrpc": "2.0", "id": request["id"], "error": error })
                    }
                    None => return ResponseTemplate::new(500).set_body_string("Internal Error"),
                };
                ResponseTemplate::new(200)
                    .append_header("Content-Type", "application/json")
                    .set_body_json(body)
            })
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn config(mock_server: &MockServer, chain_id: u64) -> EvmConfig {
        EvmConfig {
            rpc_url: mock_server.uri(),
            chain_id,
            contract_address: Address::repeat_byte(7),
            receipt_poll_interval_ms: 10,
            legacy_transactions: true,
        }
    }

    async fn connect(answer: Answer) -> (MockServer, EvmWallet) {
        let mock_server = start_node(answer).await;
        let signer: LocalWallet = DEV_KEY.parse().unwrap();
        let wallet = EvmWallet::connect(&config(&mock_server, 31_337), signer)
            .await
            .unwrap();
        (mock_server, wallet)
    }

    fn broadcast(name: &str) -> Option<Result<Value, Value>> {
        match name {
            "eth_estimateGas" => Some(Ok(json!("0x5208"))),
            "eth_sendRawTransaction" => Some(Ok(json!(tx_hash()))),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_connect_checks_chain() {
        let mock_server = start_node(|_| None).await;
        let signer: LocalWallet = DEV_KEY.parse().unwrap();

        let result = EvmWallet::connect(&config(&mock_server, 1), signer).await;
        assert!(
            matches!(
                result,
                Err(EvmError::ChainMismatch {
                    expected: 1,
                    actual: 31_337
                })
            ),
            "unexpected result"
        );
    }

    #[tokio::test]
    async fn test_send_returns_hash() {
        let (_mock_server, wallet) = connect(broadcast).await;

        assert_eq!(31_337, wallet.chain_id());
        assert_eq!(
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
                .parse::<Address>()
                .unwrap(),
            wallet.address()
        );
        assert_eq!(tx_hash(), wallet.send(BallotCall::Vote(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_revert_during_estimation_carries_reason() {
        let (_mock_server, wallet) = connect(|name| match name {
            "eth_estimateGas" => {
                let mut data = ERROR_STRING_SELECTOR.to_vec();
                data.extend(encode(&[Token::String(
                    "Voter is already registered".to_string(),
                )]));
                Some(Err(json!({
                    "code": 3,
                    "message": "execution reverted",
                    "data": format!("0x{}", hex::encode(data)),
                })))
            }
            _ => None,
        })
        .await;

        assert_eq!(
            Err(WalletError::Reverted {
                message: "execution reverted, reason: Voter is already registered".to_string()
            }),
            wallet
                .send(BallotCall::RegisterVoter(Address::repeat_byte(5)))
                .await
        );
    }

    #[tokio::test]
    async fn test_http_failure_is_transport() {
        let (_mock_server, wallet) = connect(|_| None).await;

        let result = wallet.send(BallotCall::Vote(0)).await;
        assert!(
            matches!(result, Err(WalletError::Transport { .. })),
            "{result:?}"
        );
    }

    #[tokio::test]
    async fn test_receipt_status() {
        let (_mock_server, wallet) = connect(|name| match name {
            "eth_getTransactionByHash" => {
                let tx = Transaction {
                    hash: tx_hash(),
                    block_number: Some(U64::from(7)),
                    ..Default::default()
                };
                Some(Ok(serde_json::to_value(tx).unwrap()))
            }
            "eth_getTransactionReceipt" => {
                let receipt = TransactionReceipt {
                    transaction_hash: tx_hash(),
                    block_number: Some(U64::from(7)),
                    status: Some(U64::from(0)),
                    ..Default::default()
                };
                Some(Ok(serde_json::to_value(receipt).unwrap()))
            }
            _ => None,
        })
        .await;

        assert_eq!(
            TxReceipt {
                tx_hash: tx_hash(),
                block_number: Some(7),
                success: false,
            },
            wallet.wait_for_receipt(tx_hash()).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_unknown_transaction_is_dropped() {
        let (_mock_server, wallet) = connect(|name| match name {
            "eth_getTransactionByHash" => Some(Ok(Value::Null)),
            _ => None,
        })
        .await;

        let result = wallet.wait_for_receipt(tx_hash()).await;
        match result {
            Err(WalletError::Transport { message }) => assert!(message.contains("dropped")),
            other => panic!("expected a transport failure, got {other:?}"),
        }
    }
}
