use ballot_interface::display::to_display_u64;
use ballot_interface::services::chain::ChainReader;
use ballot_interface::{Address, Candidate, Snapshot, U256};
use thiserror::Error;

/// A synchronization cycle could not produce a snapshot.
#[derive(Debug, Error)]
pub enum CycleError<E> {
    /// One of the contract reads failed.
    #[error("contract read failed: {0}")]
    Read(E),
    /// `getTotalCandidates()` returned a count that cannot be enumerated.
    #[error("contract reported {0} candidates")]
    MalformedCount(U256),
    /// The candidate batch did not return one record per index.
    #[error("expected {expected} candidates, received {actual}")]
    IncompleteBatch {
        /// Number of requested candidates.
        expected: u64,
        /// Number of returned records.
        actual: usize,
    },
}

/// Reads everything the view needs for `address`.
///
/// The candidate count and the candidate batch depend on each other and run in order. The
/// admin and voter reads are independent and run concurrently with them. The snapshot is only
/// built once all reads succeeded; any failure fails the whole cycle.
pub async fn read_snapshot<R: ChainReader + ?Sized>(
    reader: &R,
    address: Address,
) -> Result<Snapshot, CycleError<R::Error>> {
    let (candidates, admin, voter) = tokio::join!(
        read_candidates(reader),
        reader.admin(),
        reader.voter(address),
    );

    Ok(Snapshot {
        is_admin: admin.map_err(CycleError::Read)? == address,
        voter: voter.map_err(CycleError::Read)?,
        candidates: candidates?.into(),
        is_loading: false,
    })
}

async fn read_candidates<R: ChainReader + ?Sized>(
    reader: &R,
) -> Result<Vec<Candidate>, CycleError<R::Error>> {
    let total = reader.total_candidates().await.map_err(CycleError::Read)?;
    let total = to_display_u64(total).map_err(|e| CycleError::MalformedCount(e.0))?;
    if total == 0 {
        return Ok(Vec::new());
    }

    let records = reader.candidates(0..total).await.map_err(CycleError::Read)?;
    if records.len() as u64 != total {
        return Err(CycleError::IncompleteBatch {
            expected: total,
            actual: records.len(),
        });
    }

    Ok(records
        .into_iter()
        .zip(0..)
        .map(|(record, id)| Candidate::from_record(id, record))
        .collect())
}

#[cfg(test)]
mod tests {
    use ballot_interface::VoterRecord;
    use ballot_mock_chain::MockChain;

    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[tokio::test]
    async fn test_candidate_keeps_its_index() {
        let chain = MockChain::with_candidates(addr(1), &["Xavier", "Yolanda", "Alice"]);
        chain.update_contract(|contract| contract.set_vote_count(2, U256::from(3)));

        let snapshot = read_snapshot(&chain, addr(2)).await.unwrap();
        assert_eq!(
            Some(&Candidate {
                id: 2,
                name: "Alice".to_string(),
                vote_count: U256::from(3),
            }),
            snapshot.candidate(2)
        );
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn test_zero_candidates() {
        let chain = MockChain::new(addr(1));
        chain.set_failing_candidate(Some(0));

        let snapshot = read_snapshot(&chain, addr(1)).await.unwrap();
        assert!(snapshot.candidates.is_empty());
        assert!(snapshot.is_admin);
    }

    #[tokio::test]
    async fn test_admin_and_voter() {
        let chain = MockChain::with_candidates(addr(1), &["Alice"]);
        chain.register(addr(2));

        let admin = read_snapshot(&chain, addr(1)).await.unwrap();
        assert!(admin.is_admin);
        assert_eq!(VoterRecord::default(), admin.voter);

        let voter = read_snapshot(&chain, addr(2)).await.unwrap();
        assert!(!voter.is_admin);
        assert!(voter.voter.can_vote());
    }

    #[tokio::test]
    async fn test_single_failed_candidate_fails_cycle() {
        let chain = MockChain::with_candidates(addr(1), &["Alice", "Bob", "Carol"]);
        chain.set_failing_candidate(Some(1));

        let err = read_snapshot(&chain, addr(1)).await.unwrap_err();
        assert!(matches!(err, CycleError::Read(_)));
    }

    #[tokio::test]
    async fn test_read_failure_fails_cycle() {
        let chain = MockChain::with_candidates(addr(1), &["Alice"]);
        chain.set_fail_reads(true);

        let err = read_snapshot(&chain, addr(1)).await.unwrap_err();
        assert_eq!("contract read failed: connection refused", err.to_string());
    }
}
