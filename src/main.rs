//! # Hybrid PoS/PoA Node
//!
//! Builds a chain specification and consensus engine that switches a node
//! from Proof-of-Stake to Proof-of-Authority dispatch at a fixed block
//! height, and wires up local signing if a key is available.
//!
//! Node bootstrap (peer-to-peer sync, mempool, RPC surface, on-disk state
//! storage) is out of scope for this crate; see [`hybrid_pos_poa_consensus::node::builder`]
//! for the seam a full node would plug this consensus engine into.

use clap::Parser;
use hybrid_pos_poa_consensus::chainspec::{PoaChainSpec, PoaConfig};
use hybrid_pos_poa_consensus::cli::Cli;
use hybrid_pos_poa_consensus::consensus::{self, ConsensusEngine};
use hybrid_pos_poa_consensus::genesis::{self, GenesisConfig};
use hybrid_pos_poa_consensus::output;
use hybrid_pos_poa_consensus::signer::{self, SignerManager};
use std::sync::Arc;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    reth_tracing::init_test_tracing();

    let cli = Cli::parse();
    let is_dev_mode = !cli.no_dev && !cli.production;

    let mut genesis_config = if cli.production {
        GenesisConfig::default()
            .with_chain_id(cli.chain_id)
            .with_signers(genesis::dev_accounts().into_iter().take(5).collect())
    } else {
        GenesisConfig::dev().with_chain_id(cli.chain_id)
    }
    .with_block_period(cli.block_time);

    if let Some(gas_limit) = cli.gas_limit {
        genesis_config.gas_limit = gas_limit;
    }
    if let Some(transition_block) = cli.transition_block {
        genesis_config = genesis_config.with_transition_block(transition_block);
    }

    let signers = genesis_config.signers.clone();
    let genesis = genesis::create_genesis(genesis_config);
    let poa_config = PoaConfig { period: cli.block_time, epoch: 30000, signers };
    let chain_spec = Arc::new(PoaChainSpec::new(genesis, poa_config, cli.transition_block));

    output::print_banner(chain_spec.inner().chain.id(), chain_spec.block_period());
    output::print_mode(if is_dev_mode { "dev" } else { "production" });
    output::print_transition_config(chain_spec.pos_to_poa_transition_block());
    output::print_signers(chain_spec.signers());

    let signer_manager = Arc::new(SignerManager::new());
    if let Some(key) = &cli.signer_key {
        let addr = signer_manager.add_signer_from_hex(key).await?;
        output::print_signer_loaded(&addr);
    } else if is_dev_mode {
        for key in signer::dev::DEV_PRIVATE_KEYS.iter().take(3) {
            signer_manager
                .add_signer_from_hex(key)
                .await
                .expect("dev keys should be valid");
        }
        output::print_dev_signers_loaded(signer_manager.signer_addresses().await.len());
    } else {
        output::print_no_signer_warning();
    }

    let engine = consensus::build_consensus(chain_spec.clone())?;
    output::print_config(is_dev_mode, chain_spec.inner().genesis().gas_limit, &cli.datadir);
    output::print_chain_data(&cli.datadir, chain_spec.block_period());

    // Demonstrate the engine is live by authoring the genesis block.
    let genesis_header = chain_spec.inner().genesis_header().clone();
    let _ = engine.author(&genesis_header)?;

    Ok(())
}
