use crate::chainspec::PoaChainSpec;
use crate::consensus::{self, AnyConsensus};
use crate::output;
use reth_ethereum::EthPrimitives;
use reth_ethereum::node::builder::{
    components::ConsensusBuilder,
    node::{FullNodeTypes, NodeTypes},
    BuilderContext,
};
use std::sync::Arc;

/// Custom consensus builder that provides the hybrid PoS/PoA engine instead
/// of `EthBeaconConsensus`.
///
/// This is the key integration point: when the node builder constructs
/// components, it calls this builder to produce the consensus engine. By
/// running the engine factory here, block validation flows through
/// whichever era's rules a given block number belongs to.
#[derive(Debug, Clone)]
pub struct HybridConsensusBuilder {
    /// The chain spec carrying the optional PoS→PoA transition height.
    chain_spec: Arc<PoaChainSpec>,
}

impl HybridConsensusBuilder {
    /// Creates a new consensus builder from the given chain spec.
    pub fn new(chain_spec: Arc<PoaChainSpec>) -> Self {
        Self { chain_spec }
    }
}

impl<N> ConsensusBuilder<N> for HybridConsensusBuilder
where
    N: FullNodeTypes<Types: NodeTypes<Primitives = EthPrimitives>>,
{
    type Consensus = Arc<AnyConsensus>;

    async fn build_consensus(self, _ctx: &BuilderContext<N>) -> eyre::Result<Self::Consensus> {
        let engine = consensus::build_consensus(self.chain_spec.clone())?;
        let mode = if self.chain_spec.pos_to_poa_transition_block().is_some() {
            "hybrid (PoS -> PoA)"
        } else {
            "single-era"
        };
        output::print_consensus_init(
            self.chain_spec.signers().len(),
            self.chain_spec.epoch(),
            self.chain_spec.block_period(),
            mode,
        );
        Ok(engine)
    }
}
