use std::ops::Range;

use async_trait::async_trait;
use ballot_interface::services::chain::ChainReader;
use ballot_interface::{Address, CandidateRecord, VoterRecord, U256};
use ethers_core::types::{Bytes, TransactionRequest};
use ethers_providers::{Http, Middleware, Provider};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::BatchRequestBuilder;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use tracing::debug;

use crate::config::EvmConfig;
use crate::contract::VotingContract;
use crate::error::EvmError;

/// Reads the voting contract through `eth_call`s against the latest block.
pub struct EvmChainReader {
    contract_address: Address,
    contract: VotingContract,
    provider: Provider<Http>,
    http_client: HttpClient,
}

impl EvmChainReader {
    /// Creates a reader for the contract described by `config`. No request is sent until the
    /// first read.
    pub fn new(config: &EvmConfig) -> Result<Self, EvmError> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| EvmError::Config(format!("invalid rpc url {}: {}", config.rpc_url, e)))?;
        let http_client = HttpClientBuilder::default().build(&config.rpc_url)?;

        Ok(Self {
            contract_address: config.contract_address,
            contract: VotingContract::new()?,
            provider,
            http_client,
        })
    }

    fn call_request(&self, data: Bytes) -> TransactionRequest {
        TransactionRequest::new()
            .to(self.contract_address)
            .data(data)
    }

    async fn eth_call(&self, data: Bytes) -> Result<Bytes, EvmError> {
        let request = self.call_request(data);
        let output: Bytes = self
            .http_client
            .request("eth_call", rpc_params![request, "latest"])
            .await?;
        Ok(output)
    }
}

#[async_trait]
impl ChainReader for EvmChainReader {
    type Error = EvmError;

    async fn block_number(&self) -> Result<u64, Self::Error> {
        Ok(self.provider.get_block_number().await?.as_u64())
    }

    async fn admin(&self) -> Result<Address, Self::Error> {
        let output = self.eth_call(self.contract.admin_call_data()?).await?;
        Ok(self.contract.decode_admin(&output)?)
    }

    async fn total_candidates(&self) -> Result<U256, Self::Error> {
        let output = self
            .eth_call(self.contract.total_candidates_call_data()?)
            .await?;
        Ok(self.contract.decode_total_candidates(&output)?)
    }

    async fn candidates(&self, indices: Range<u64>) -> Result<Vec<CandidateRecord>, Self::Error> {
        if indices.is_empty() {
            return Ok(Vec::new());
        }

        let mut batch = BatchRequestBuilder::new();
        for index in indices.clone() {
            let request = self.call_request(self.contract.candidate_call_data(index)?);
            batch.insert("eth_call", rpc_params![request, "latest"])?;
        }

        debug!(
            "Requesting candidates {}..{} in one batch",
            indices.start, indices.end
        );
        // The client matches responses to requests by id, so the order is the request order.
        let responses: Vec<_> = self
            .http_client
            .batch_request::<Bytes>(batch)
            .await?
            .into_iter()
            .collect();

        let expected = (indices.end - indices.start) as usize;
        if responses.len() != expected {
            return Err(EvmError::BatchLength {
                expected,
                actual: responses.len(),
            });
        }

        indices
            .zip(responses)
            .map(|(index, response)| {
                let output = response.map_err(|e| EvmError::BatchElement {
                    index,
                    message: e.message().to_string(),
                })?;
                Ok(self.contract.decode_candidate(&output)?)
            })
            .collect()
    }

    async fn voter(&self, address: Address) -> Result<VoterRecord, Self::Error> {
        let output = self
            .eth_call(self.contract.voter_call_data(address)?)
            .await?;
        Ok(self.contract.decode_voter(&output)?)
    }
}
