use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ballot_interface::chains::LOCALHOST;
use ballot_interface::services::chain::ChainReader;
use ballot_interface::services::wallet::TxReceipt;
use ballot_interface::{Address, CandidateRecord, VoterRecord, U256};

use crate::contract::MockContract;
use crate::gate::{Gates, HeldCall};
use crate::wallet::MockWallet;

#[derive(Clone)]
/// Chain used in tests.
/// Every successful transaction is mined into its own block, so the block height equals the
/// number of executed transactions plus the explicitly mined empty blocks.
/// All state is kept in memory and shared between clones.
pub struct MockChain {
    pub(crate) contract: Arc<Mutex<MockContract>>,
    height: Arc<AtomicU64>,
    pub(crate) receipts: Arc<Mutex<HashMap<ballot_interface::TxHash, TxReceipt>>>,
    fail_reads: Arc<AtomicBool>,
    failing_candidate: Arc<Mutex<Option<u64>>>,
    total_candidates_gates: Gates,
    pub(crate) send_gates: Gates,
    pub(crate) receipt_gates: Gates,
    total_candidates_calls: Arc<AtomicU64>,
}

impl MockChain {
    /// Creates a chain at height 0 hosting an empty contract administered by `admin`.
    pub fn new(admin: Address) -> Self {
        Self {
            contract: Arc::new(Mutex::new(MockContract::new(admin))),
            height: Arc::new(AtomicU64::new(0)),
            receipts: Arc::new(Mutex::new(HashMap::new())),
            fail_reads: Arc::new(AtomicBool::new(false)),
            failing_candidate: Arc::new(Mutex::new(None)),
            total_candidates_gates: Gates::default(),
            send_gates: Gates::default(),
            receipt_gates: Gates::default(),
            total_candidates_calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates a chain whose contract lists the given candidates, all with zero votes.
    pub fn with_candidates(admin: Address, names: &[&str]) -> Self {
        let chain = Self::new(admin);
        {
            let mut contract = chain.contract.lock().unwrap();
            for name in names {
                contract.add_candidate(*name);
            }
        }
        chain
    }

    /// Chain id reported by wallets of this chain.
    pub fn chain_id(&self) -> u64 {
        LOCALHOST.id
    }

    /// Returns a wallet signing for `address`.
    pub fn wallet(&self, address: Address) -> MockWallet {
        MockWallet::new(self.clone(), address)
    }

    /// Runs `f` with mutable access to the contract state, as if an out-of-band transaction
    /// changed it. Does not mine a block.
    pub fn update_contract<T>(&self, f: impl FnOnce(&mut MockContract) -> T) -> T {
        let mut contract = self.contract.lock().unwrap();
        f(&mut contract)
    }

    /// Registers `voter` directly, bypassing the admin check.
    pub fn register(&self, voter: Address) {
        self.update_contract(|contract| {
            let admin = contract.admin();
            contract
                .execute(admin, ballot_interface::BallotCall::RegisterVoter(voter))
                .ok();
        });
    }

    /// Current vote count of a candidate.
    pub fn vote_count(&self, id: u64) -> Option<U256> {
        self.contract
            .lock()
            .unwrap()
            .candidates()
            .get(id as usize)
            .map(|c| c.vote_count)
    }

    /// Appends an empty block and returns the new height.
    pub fn mine(&self) -> u64 {
        let height = self.height.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(height, "Mined mock block");
        height
    }

    /// Current block height.
    pub fn height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }

    /// Makes every subsequent read fail until called with `false`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes the candidate batch fail at `index`, or not at all.
    pub fn set_failing_candidate(&self, index: Option<u64>) {
        *self.failing_candidate.lock().unwrap() = index;
    }

    /// Holds the next `getTotalCandidates()` read open until the returned handle is released.
    /// The read observes the contract state at the time it was issued, not at release time.
    pub fn hold_next_total_candidates(&self) -> HeldCall {
        self.total_candidates_gates.hold_next()
    }

    /// Holds the next broadcast open, before the call is executed, until the returned handle
    /// is released.
    pub fn hold_next_send(&self) -> HeldCall {
        self.send_gates.hold_next()
    }

    /// Holds the next receipt wait open until the returned handle is released.
    pub fn hold_next_receipt(&self) -> HeldCall {
        self.receipt_gates.hold_next()
    }

    /// Number of `getTotalCandidates()` reads issued so far.
    pub fn total_candidates_calls(&self) -> u64 {
        self.total_candidates_calls.load(Ordering::SeqCst)
    }

    fn check_reads(&self) -> anyhow::Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }
        Ok(())
    }
}

#[async_trait]
impl ChainReader for MockChain {
    type Error = anyhow::Error;

    async fn block_number(&self) -> Result<u64, Self::Error> {
        self.check_reads()?;
        Ok(self.height())
    }

    async fn admin(&self) -> Result<Address, Self::Error> {
        self.check_reads()?;
        Ok(self.contract.lock().unwrap().admin())
    }

    async fn total_candidates(&self) -> Result<U256, Self::Error> {
        self.total_candidates_calls.fetch_add(1, Ordering::SeqCst);
        let total = self.contract.lock().unwrap().candidates().len();
        self.total_candidates_gates.pass().await;
        self.check_reads()?;
        Ok(U256::from(total))
    }

    async fn candidates(&self, indices: Range<u64>) -> Result<Vec<CandidateRecord>, Self::Error> {
        self.check_reads()?;
        if let Some(index) = *self.failing_candidate.lock().unwrap() {
            if indices.contains(&index) {
                anyhow::bail!("batch element {} failed: execution reverted", index);
            }
        }

        let contract = self.contract.lock().unwrap();
        indices
            .map(|index| {
                contract
                    .candidates()
                    .get(index as usize)
                    .cloned()
                    .ok_or_else(|| {
                        anyhow::anyhow!("execution reverted: invalid candidate index {index}")
                    })
            })
            .collect()
    }

    async fn voter(&self, address: Address) -> Result<VoterRecord, Self::Error> {
        self.check_reads()?;
        Ok(self.contract.lock().unwrap().voter(&address))
    }
}
