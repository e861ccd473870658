use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ballot_interface::services::wallet::{TxReceipt, Wallet, WalletError};
use ballot_interface::{Address, BallotCall, TxHash};

use crate::service::MockChain;

/// A wallet that signs for a fixed address on a [`MockChain`].
///
/// Contract rejections surface the way a node reports a failed gas estimation: as an error
/// from [`Wallet::send`] carrying `execution reverted: reason: <reason>`.
#[derive(Clone)]
pub struct MockWallet {
    chain: MockChain,
    address: Address,
    next_failure: Arc<Mutex<Option<WalletError>>>,
    sent: Arc<AtomicU64>,
}

impl MockWallet {
    pub(crate) fn new(chain: MockChain, address: Address) -> Self {
        Self {
            chain,
            address,
            next_failure: Arc::new(Mutex::new(None)),
            sent: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Makes the next [`Wallet::send`] fail with `error` without touching the chain.
    pub fn fail_next_send(&self, error: WalletError) {
        *self.next_failure.lock().unwrap() = Some(error);
    }

    /// Number of transactions broadcast by this wallet.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Wallet for MockWallet {
    fn address(&self) -> Address {
        self.address
    }

    fn chain_id(&self) -> u64 {
        self.chain.chain_id()
    }

    async fn send(&self, call: BallotCall) -> Result<TxHash, WalletError> {
        if let Some(error) = self.next_failure.lock().unwrap().take() {
            return Err(error);
        }
        self.chain.send_gates.pass().await;

        self.chain
            .contract
            .lock()
            .unwrap()
            .execute(self.address, call)
            .map_err(|reason| WalletError::Reverted {
                message: format!("execution reverted: reason: {reason}"),
            })?;

        let nonce = self.sent.fetch_add(1, Ordering::SeqCst);
        let height = self.chain.mine();
        let tx_hash = TxHash::from_low_u64_be((height << 16) | nonce);
        tracing::debug!(%call, ?tx_hash, height, "Mock transaction executed");

        self.chain.receipts.lock().unwrap().insert(
            tx_hash,
            TxReceipt {
                tx_hash,
                block_number: Some(height),
                success: true,
            },
        );
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, WalletError> {
        self.chain.receipt_gates.pass().await;
        self.chain
            .receipts
            .lock()
            .unwrap()
            .get(&tx_hash)
            .copied()
            .ok_or_else(|| WalletError::Transport {
                message: format!("transaction {tx_hash:?} not found"),
            })
    }
}

#[cfg(test)]
mod tests {
    use ballot_interface::U256;

    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[tokio::test]
    async fn test_vote_is_mined() {
        let chain = MockChain::with_candidates(addr(1), &["Alice", "Bob"]);
        chain.register(addr(2));
        let wallet = chain.wallet(addr(2));

        let tx_hash = wallet.send(BallotCall::Vote(1)).await.unwrap();
        let receipt = wallet.wait_for_receipt(tx_hash).await.unwrap();

        assert!(receipt.success);
        assert_eq!(Some(1), receipt.block_number);
        assert_eq!(1, chain.height());
        assert_eq!(Some(U256::one()), chain.vote_count(1));
    }

    #[tokio::test]
    async fn test_revert_carries_reason() {
        let chain = MockChain::new(addr(1));
        let wallet = chain.wallet(addr(2));

        let err = wallet
            .send(BallotCall::RegisterVoter(addr(3)))
            .await
            .unwrap_err();
        assert_eq!(
            WalletError::Reverted {
                message: "execution reverted: reason: Only admin can register".to_string()
            },
            err
        );
        assert_eq!(0, chain.height());
        assert_eq!(0, wallet.sent());
    }

    #[tokio::test]
    async fn test_injected_failure_is_used_once() {
        let chain = MockChain::new(addr(1));
        let wallet = chain.wallet(addr(1));
        wallet.fail_next_send(WalletError::Rejected);

        assert_eq!(
            Err(WalletError::Rejected),
            wallet.send(BallotCall::RegisterVoter(addr(3))).await
        );
        assert!(wallet.send(BallotCall::RegisterVoter(addr(3))).await.is_ok());
    }
}
