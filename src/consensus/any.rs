//! A single nameable type for whichever concrete engine the factory decided
//! to build, so node wiring (which needs one concrete associated type)
//! doesn't have to care which of the decision-rule branches fired.

use crate::consensus::{ConsensusEngine, EngineOpError, HybridConsensus, PosConsensus};
use alloy_consensus::Header;
use alloy_primitives::{Address, B256, U256};
use reth_consensus::{Consensus, ConsensusError, FullConsensus, HeaderValidator, ReceiptRootBloom};
use reth_execution_types::BlockExecutionResult;
use reth_primitives_traits::{Block, NodePrimitives, RecoveredBlock, SealedBlock, SealedHeader};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Whichever engine the factory built: a single beacon-wrapped engine (the
/// factory's cases 3 and 4), or a hybrid dispatcher (case 2).
#[derive(Debug, Clone)]
pub enum AnyConsensus {
    Single(Arc<PosConsensus>),
    Hybrid(Arc<HybridConsensus>),
}

impl HeaderValidator<Header> for AnyConsensus {
    fn validate_header(&self, header: &SealedHeader<Header>) -> Result<(), ConsensusError> {
        match self {
            Self::Single(c) => c.validate_header(header),
            Self::Hybrid(c) => c.validate_header(header),
        }
    }

    fn validate_header_against_parent(
        &self,
        header: &SealedHeader<Header>,
        parent: &SealedHeader<Header>,
    ) -> Result<(), ConsensusError> {
        match self {
            Self::Single(c) => c.validate_header_against_parent(header, parent),
            Self::Hybrid(c) => c.validate_header_against_parent(header, parent),
        }
    }
}

impl<B: Block> Consensus<B> for AnyConsensus
where
    PosConsensus: Consensus<B>,
    HybridConsensus: Consensus<B>,
{
    fn validate_body_against_header(
        &self,
        body: &B::Body,
        header: &SealedHeader<B::Header>,
    ) -> Result<(), ConsensusError> {
        match self {
            Self::Single(c) => c.validate_body_against_header(body, header),
            Self::Hybrid(c) => c.validate_body_against_header(body, header),
        }
    }

    fn validate_block_pre_execution(&self, block: &SealedBlock<B>) -> Result<(), ConsensusError> {
        match self {
            Self::Single(c) => c.validate_block_pre_execution(block),
            Self::Hybrid(c) => c.validate_block_pre_execution(block),
        }
    }
}

impl<N: NodePrimitives> FullConsensus<N> for AnyConsensus
where
    PosConsensus: FullConsensus<N>,
    HybridConsensus: FullConsensus<N>,
    AnyConsensus: Consensus<N::Block>,
{
    fn validate_block_post_execution(
        &self,
        block: &RecoveredBlock<N::Block>,
        result: &BlockExecutionResult<N::Receipt>,
        receipt_root_bloom: Option<ReceiptRootBloom>,
    ) -> Result<(), ConsensusError> {
        match self {
            Self::Single(c) => c.validate_block_post_execution(block, result, receipt_root_bloom),
            Self::Hybrid(c) => c.validate_block_post_execution(block, result, receipt_root_bloom),
        }
    }
}

impl ConsensusEngine for AnyConsensus {
    fn author(&self, header: &Header) -> Result<Option<Address>, EngineOpError> {
        match self {
            Self::Single(c) => c.author(header),
            Self::Hybrid(c) => c.author(header),
        }
    }

    fn verify_header(&self, header: &SealedHeader<Header>) -> Result<(), EngineOpError> {
        match self {
            Self::Single(c) => c.verify_header(header),
            Self::Hybrid(c) => c.verify_header(header),
        }
    }

    fn verify_headers(
        &self,
        headers: Vec<SealedHeader<Header>>,
        result_tx: mpsc::UnboundedSender<Result<(), EngineOpError>>,
    ) -> oneshot::Sender<()> {
        match self {
            Self::Single(c) => c.verify_headers(headers, result_tx),
            Self::Hybrid(c) => c.verify_headers(headers, result_tx),
        }
    }

    fn verify_uncles(&self, uncles: &[Header]) -> Result<(), EngineOpError> {
        match self {
            Self::Single(c) => c.verify_uncles(uncles),
            Self::Hybrid(c) => c.verify_uncles(uncles),
        }
    }

    fn prepare(&self, header: &mut Header) -> Result<(), EngineOpError> {
        match self {
            Self::Single(c) => c.prepare(header),
            Self::Hybrid(c) => c.prepare(header),
        }
    }

    fn finalize(&self, header: &Header) -> Result<(), EngineOpError> {
        match self {
            Self::Single(c) => c.finalize(header),
            Self::Hybrid(c) => c.finalize(header),
        }
    }

    fn seal(
        &self,
        header: Header,
        result_tx: mpsc::UnboundedSender<Result<Header, EngineOpError>>,
    ) -> oneshot::Sender<()> {
        match self {
            Self::Single(c) => c.seal(header, result_tx),
            Self::Hybrid(c) => c.seal(header, result_tx),
        }
    }

    fn seal_hash(&self, header: &Header) -> B256 {
        match self {
            Self::Single(c) => c.seal_hash(header),
            Self::Hybrid(c) => c.seal_hash(header),
        }
    }

    fn calc_difficulty(
        &self,
        number: u64,
        expected_signer: Option<Address>,
        actual_signer: Address,
    ) -> U256 {
        match self {
            Self::Single(c) => c.calc_difficulty(number, expected_signer, actual_signer),
            Self::Hybrid(c) => c.calc_difficulty(number, expected_signer, actual_signer),
        }
    }

    fn close(&self) -> Result<(), EngineOpError> {
        match self {
            Self::Single(c) => c.close(),
            Self::Hybrid(c) => c.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chainspec::PoaChainSpec;
    use crate::consensus::PoaConsensus;

    #[test]
    fn single_variant_delegates_to_inner_engine() {
        let chain_spec = Arc::new(PoaChainSpec::dev_chain());
        let any = AnyConsensus::Single(Arc::new(PosConsensus::new(chain_spec)));
        let header = Header::default();
        assert_eq!(any.author(&header).unwrap(), None);
    }

    #[test]
    fn hybrid_variant_delegates_to_inner_dispatcher() {
        let chain_spec = Arc::new(PoaChainSpec::dev_hybrid_chain(10));
        let pos = Arc::new(PosConsensus::new(chain_spec.clone()));
        let poa = Arc::new(PoaConsensus::new(chain_spec.clone()));
        let any = AnyConsensus::Hybrid(Arc::new(HybridConsensus::new(chain_spec, pos, poa)));
        let header = Header { number: 10, ..Default::default() };
        assert!(any.author(&header).unwrap().is_some());
    }
}
