//! Chain specification carrying the optional PoS→PoA transition height.
//!
//! This extends the Ethereum chain spec with a single optional field,
//! `posToPoaTransitionBlock`, and the validation/predicate logic that makes
//! it load-bearing for the rest of the crate.

pub mod config;
pub mod hardforks;
pub mod transition;

pub use config::PoaConfig;
pub use transition::TransitionConfigError;

use alloy_consensus::Header;
use alloy_eips::eip7840::BlobParams;
use alloy_genesis::Genesis;
use alloy_primitives::{Address, B256, U256};
use reth_chainspec::{
    BaseFeeParams, BaseFeeParamsKind, Chain, ChainSpec, DepositContract, EthChainSpec,
    EthereumHardforks, ForkCondition, ForkFilter, ForkId, Hardfork, Hardforks, Head,
};
use reth_ethereum_forks::EthereumHardfork;
use reth_network_peers::NodeRecord;
use reth_primitives_traits::SealedHeader;
use std::sync::Arc;

/// Chain specification for a node that starts in the PoS era and optionally
/// transitions to PoA at a fixed height.
#[derive(Debug, Clone)]
pub struct PoaChainSpec {
    /// The underlying Ethereum chain spec.
    inner: Arc<ChainSpec>,
    /// PoA ("clique") sub-configuration; mandatory whenever a transition
    /// height is present (see [`transition::validate_transition`]).
    poa_config: PoaConfig,
    /// Block number at which dispatch switches from PoS to PoA. `None` means
    /// "no transition ever; behave as before".
    pos_to_poa_transition_block: Option<u64>,
}

impl PoaChainSpec {
    /// Creates a new chain spec from genesis and PoA config.
    ///
    /// This constructor is infallible: by the time Rust code has a concrete
    /// `PoaConfig` value in hand, the "is the clique sub-config present"
    /// question has already been resolved positively by the type system.
    /// The actual fallible validation —
    /// rejecting a raw genesis document whose `posToPoaTransitionBlock` is
    /// negative or missing its `clique` sibling — happens earlier, while
    /// still parsing untyped JSON; see
    /// [`transition::parse_transition_config`] and
    /// [`crate::genesis::load_genesis_with_transition`].
    pub fn new(
        genesis: Genesis,
        poa_config: PoaConfig,
        pos_to_poa_transition_block: Option<u64>,
    ) -> Self {
        let hardforks = hardforks::mainnet_compatible_hardforks();
        let genesis_header = reth_chainspec::make_genesis_header(&genesis, &hardforks);

        let inner = ChainSpec {
            chain: Chain::from_id(genesis.config.chain_id),
            genesis_header: SealedHeader::seal_slow(genesis_header),
            genesis,
            paris_block_and_final_difficulty: Some((0, U256::ZERO)),
            hardforks,
            deposit_contract: None,
            base_fee_params: BaseFeeParamsKind::Constant(BaseFeeParams::ethereum()),
            prune_delete_limit: 10000,
            blob_params: Default::default(),
        };

        Self {
            inner: Arc::new(inner),
            poa_config,
            pos_to_poa_transition_block,
        }
    }

    /// Development chain with prefunded accounts and no transition configured.
    pub fn dev_chain() -> Self {
        let genesis = crate::genesis::create_dev_genesis();
        let poa_config = PoaConfig {
            period: 1,
            epoch: 30000,
            signers: crate::genesis::dev_signers(),
        };
        Self::new(genesis, poa_config, None)
    }

    /// Development chain that transitions from PoS to PoA at `transition_block`.
    pub fn dev_hybrid_chain(transition_block: u64) -> Self {
        let genesis = crate::genesis::create_dev_genesis();
        let poa_config = PoaConfig {
            period: 1,
            epoch: 30000,
            signers: crate::genesis::dev_signers(),
        };
        Self::new(genesis, poa_config, Some(transition_block))
    }

    /// Returns the inner Ethereum chain spec.
    pub fn inner(&self) -> &Arc<ChainSpec> {
        &self.inner
    }

    /// Returns the PoA ("clique") configuration.
    pub fn poa_config(&self) -> &PoaConfig {
        &self.poa_config
    }

    /// Returns the configured signer set.
    pub fn signers(&self) -> &[Address] {
        &self.poa_config.signers
    }

    /// Returns the block period in seconds.
    pub fn block_period(&self) -> u64 {
        self.poa_config.period
    }

    /// Returns the epoch length in blocks.
    pub fn epoch(&self) -> u64 {
        self.poa_config.epoch
    }

    /// Returns the configured PoS→PoA transition height, if any.
    pub fn pos_to_poa_transition_block(&self) -> Option<u64> {
        self.pos_to_poa_transition_block
    }

    /// Whether `block_number` falls in the PoA era. The sole authority on
    /// which era a block belongs to.
    pub fn is_pos_to_poa_transition(&self, block_number: u64) -> bool {
        transition::is_pos_to_poa_transition(self.pos_to_poa_transition_block, block_number)
    }

    /// Whether the chain carries a terminal-total-difficulty marker, i.e. is
    /// a PoS-era chain. A precondition checked by the engine factory before
    /// the transition height is even consulted.
    pub fn has_terminal_total_difficulty(&self) -> bool {
        self.inner.final_paris_total_difficulty().is_some()
    }

    /// Checks whether an address is an authorized PoA signer.
    pub fn is_authorized_signer(&self, address: &Address) -> bool {
        self.poa_config.signers.contains(address)
    }

    /// Returns the expected in-turn signer for `block_number` (round-robin).
    pub fn expected_signer(&self, block_number: u64) -> Option<Address> {
        let signers = &self.poa_config.signers;
        if signers.is_empty() {
            return None;
        }
        let index = (block_number as usize) % signers.len();
        signers.get(index).copied()
    }
}

impl Hardforks for PoaChainSpec {
    fn fork<H: Hardfork>(&self, fork: H) -> ForkCondition {
        self.inner.fork(fork)
    }

    fn forks_iter(&self) -> impl Iterator<Item = (&dyn Hardfork, ForkCondition)> {
        self.inner.forks_iter()
    }

    fn fork_id(&self, head: &Head) -> ForkId {
        self.inner.fork_id(head)
    }

    fn latest_fork_id(&self) -> ForkId {
        self.inner.latest_fork_id()
    }

    fn fork_filter(&self, head: Head) -> ForkFilter {
        self.inner.fork_filter(head)
    }
}

impl EthChainSpec for PoaChainSpec {
    type Header = Header;

    fn chain(&self) -> Chain {
        self.inner.chain()
    }

    fn base_fee_params_at_timestamp(&self, timestamp: u64) -> BaseFeeParams {
        self.inner.base_fee_params_at_timestamp(timestamp)
    }

    fn blob_params_at_timestamp(&self, timestamp: u64) -> Option<BlobParams> {
        self.inner.blob_params_at_timestamp(timestamp)
    }

    fn deposit_contract(&self) -> Option<&DepositContract> {
        self.inner.deposit_contract()
    }

    fn genesis_hash(&self) -> B256 {
        self.inner.genesis_hash()
    }

    fn prune_delete_limit(&self) -> usize {
        self.inner.prune_delete_limit()
    }

    fn display_hardforks(&self) -> Box<dyn core::fmt::Display> {
        self.inner.display_hardforks()
    }

    fn genesis_header(&self) -> &Self::Header {
        self.inner.genesis_header()
    }

    fn genesis(&self) -> &Genesis {
        self.inner.genesis()
    }

    fn bootnodes(&self) -> Option<Vec<NodeRecord>> {
        self.inner.bootnodes()
    }

    fn final_paris_total_difficulty(&self) -> Option<U256> {
        self.inner.get_final_paris_total_difficulty()
    }
}

impl EthereumHardforks for PoaChainSpec {
    fn ethereum_fork_activation(&self, fork: EthereumHardfork) -> ForkCondition {
        self.inner.ethereum_fork_activation(fork)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_chain_creation() {
        let chain = PoaChainSpec::dev_chain();
        assert!(!chain.signers().is_empty());
        assert_eq!(chain.block_period(), 1);
        assert_eq!(chain.pos_to_poa_transition_block(), None);
    }

    #[test]
    fn dev_chain_id() {
        let chain = PoaChainSpec::dev_chain();
        assert_eq!(chain.inner().chain.id(), 9323310);
    }

    #[test]
    fn dev_hybrid_chain_carries_transition() {
        let chain = PoaChainSpec::dev_hybrid_chain(1000);
        assert_eq!(chain.pos_to_poa_transition_block(), Some(1000));
        assert!(chain.is_pos_to_poa_transition(1000));
        assert!(!chain.is_pos_to_poa_transition(999));
    }

    #[test]
    fn has_terminal_total_difficulty_is_always_true_for_this_chain() {
        // POA chains here are constructed post-merge from genesis (TTD=0).
        let chain = PoaChainSpec::dev_chain();
        assert!(chain.has_terminal_total_difficulty());
    }

    #[test]
    fn new_accepts_any_combination_since_validation_happens_at_json_parse_time() {
        let genesis = crate::genesis::create_dev_genesis();
        let chain = PoaChainSpec::new(genesis, PoaConfig::default(), Some(1000));
        assert_eq!(chain.pos_to_poa_transition_block(), Some(1000));
    }

    #[test]
    fn round_robin_signer() {
        let genesis = crate::genesis::create_dev_genesis();
        let poa_config = PoaConfig {
            period: 2,
            epoch: 30000,
            signers: vec![
                "0x0000000000000000000000000000000000000001".parse().unwrap(),
                "0x0000000000000000000000000000000000000002".parse().unwrap(),
                "0x0000000000000000000000000000000000000003".parse().unwrap(),
            ],
        };
        let chain = PoaChainSpec::new(genesis, poa_config, None);

        assert_eq!(
            chain.expected_signer(0),
            Some("0x0000000000000000000000000000000000000001".parse().unwrap())
        );
        assert_eq!(
            chain.expected_signer(3),
            Some("0x0000000000000000000000000000000000000001".parse().unwrap())
        );
    }

    #[test]
    fn empty_signers_expected_signer_is_none() {
        let genesis = crate::genesis::create_dev_genesis();
        let chain = PoaChainSpec::new(genesis, PoaConfig::default(), None);
        assert_eq!(chain.expected_signer(0), None);
    }

    #[test]
    fn hardforks_enabled() {
        let chain = PoaChainSpec::dev_chain();
        assert!(chain.fork(EthereumHardfork::Frontier).active_at_block(0));
        assert!(chain.fork(EthereumHardfork::Shanghai).active_at_timestamp(0));
        assert!(chain.fork(EthereumHardfork::Cancun).active_at_timestamp(0));
    }

    #[test]
    fn authorized_signer_check() {
        let chain = PoaChainSpec::dev_chain();
        let signers = chain.signers();
        assert!(chain.is_authorized_signer(&signers[0]));
        let fake: Address = "0x0000000000000000000000000000000000000099".parse().unwrap();
        assert!(!chain.is_authorized_signer(&fake));
    }
}
