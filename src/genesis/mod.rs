//! Genesis configuration for a chain that may carry a PoS→PoA transition
//! height.
//!
//! This module provides utilities for building an Ethereum-compatible
//! genesis document: prefunded accounts, the `clique` PoA sub-config, and —
//! when configured — the `posToPoaTransitionBlock` field validated by
//! [`crate::chainspec::transition`].

pub mod accounts;

pub use accounts::{default_prefund_balance, dev_accounts, dev_signers};

use crate::chainspec::transition::{self, TransitionConfigError};
use alloy_genesis::{Genesis, GenesisAccount};
use alloy_primitives::{Address, U256};
use std::collections::BTreeMap;

/// Creates a development genesis configuration with no transition configured.
pub fn create_dev_genesis() -> Genesis {
    create_genesis(GenesisConfig::dev())
}

/// Configuration for creating a genesis document.
#[derive(Debug, Clone)]
pub struct GenesisConfig {
    pub chain_id: u64,
    pub gas_limit: u64,
    pub prefunded_accounts: BTreeMap<Address, U256>,
    /// PoA signers, encoded into the extra-data vanity/signers/seal layout.
    pub signers: Vec<Address>,
    pub block_period: u64,
    pub epoch: u64,
    pub vanity: [u8; 32],
    /// Block number at which the chain switches from PoS to PoA dispatch.
    pub pos_to_poa_transition_block: Option<u64>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            chain_id: 9323310,
            gas_limit: 30_000_000,
            prefunded_accounts: BTreeMap::new(),
            signers: vec![],
            block_period: 12,
            epoch: 30000,
            vanity: [0u8; 32],
            pos_to_poa_transition_block: None,
        }
    }
}

impl GenesisConfig {
    /// Development configuration with prefunded accounts and fast blocks.
    pub fn dev() -> Self {
        let accounts = dev_accounts();
        let signers = dev_signers();

        let balance = default_prefund_balance();
        let mut prefunded = BTreeMap::new();
        for account in accounts {
            prefunded.insert(account, balance);
        }

        Self {
            chain_id: 9323310,
            gas_limit: 30_000_000,
            prefunded_accounts: prefunded,
            signers,
            block_period: 2,
            epoch: 30000,
            vanity: [0u8; 32],
            pos_to_poa_transition_block: None,
        }
    }

    pub fn with_prefunded_account(mut self, address: Address, balance: U256) -> Self {
        self.prefunded_accounts.insert(address, balance);
        self
    }

    pub fn with_signers(mut self, signers: Vec<Address>) -> Self {
        self.signers = signers;
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_block_period(mut self, period: u64) -> Self {
        self.block_period = period;
        self
    }

    pub fn with_vanity(mut self, vanity: [u8; 32]) -> Self {
        self.vanity = vanity;
        self
    }

    pub fn with_transition_block(mut self, transition_block: u64) -> Self {
        self.pos_to_poa_transition_block = Some(transition_block);
        self
    }
}

/// Builds a genesis document from the config. The extra-data field is laid
/// out as `vanity(32) || signers(20*N) || seal(65, zeros)` — the same shape
/// the transition preparer uses when seeding the checkpoint block.
pub fn create_genesis(config: GenesisConfig) -> Genesis {
    let mut extra_data = Vec::with_capacity(32 + config.signers.len() * 20 + 65);
    extra_data.extend_from_slice(&config.vanity);
    for signer in &config.signers {
        extra_data.extend_from_slice(signer.as_slice());
    }
    extra_data.extend_from_slice(&[0u8; 65]);

    let mut alloc = BTreeMap::new();
    for (address, balance) in config.prefunded_accounts {
        alloc.insert(
            address,
            GenesisAccount {
                balance,
                nonce: None,
                code: None,
                storage: None,
                private_key: None,
            },
        );
    }

    let mut chain_config = serde_json::json!({
        "chainId": config.chain_id,
        "homesteadBlock": 0,
        "eip150Block": 0,
        "eip155Block": 0,
        "eip158Block": 0,
        "byzantiumBlock": 0,
        "constantinopleBlock": 0,
        "petersburgBlock": 0,
        "istanbulBlock": 0,
        "berlinBlock": 0,
        "londonBlock": 0,
        "terminalTotalDifficulty": 0,
        "terminalTotalDifficultyPassed": true,
        "shanghaiTime": 0,
        "cancunTime": 0,
        "pragueTime": 0,
        "clique": {
            "period": config.block_period,
            "epoch": config.epoch
        }
    });
    transition::write_transition_block_field(&mut chain_config, config.pos_to_poa_transition_block);

    Genesis {
        config: serde_json::from_value(chain_config).expect("valid chain config"),
        nonce: 0,
        timestamp: 0,
        extra_data: extra_data.into(),
        gas_limit: config.gas_limit,
        difficulty: U256::from(1),
        mix_hash: Default::default(),
        coinbase: Address::ZERO,
        alloc,
        number: None,
        parent_hash: None,
        base_fee_per_gas: Some(875_000_000),
        excess_blob_gas: Some(0),
        blob_gas_used: Some(0),
    }
}

/// Serializes a genesis document to pretty JSON.
pub fn genesis_to_json(genesis: &Genesis) -> String {
    serde_json::to_string_pretty(genesis).expect("genesis serialization should not fail")
}

/// Writes a genesis document to disk.
pub fn write_genesis_file(genesis: &Genesis, path: &std::path::Path) -> std::io::Result<()> {
    let json = genesis_to_json(genesis);
    std::fs::write(path, json)
}

/// Parses a raw genesis JSON document into a typed `Genesis`, running the
/// PoS→PoA transition validation against its raw fields first. This is the
/// entry point a node uses when loading genesis from disk, where the
/// `posToPoaTransitionBlock`/`clique` relationship must be checked before
/// any typed chain-spec construction happens.
pub fn load_genesis_with_transition(
    raw_json: &str,
) -> Result<(Genesis, Option<u64>), GenesisLoadError> {
    let value: serde_json::Value =
        serde_json::from_str(raw_json).map_err(GenesisLoadError::Json)?;
    let transition_block = transition::parse_transition_config(&value)?;
    let genesis: Genesis = serde_json::from_value(value).map_err(GenesisLoadError::Json)?;
    Ok((genesis, transition_block))
}

/// Errors raised while loading a genesis document from raw JSON.
#[derive(Debug, thiserror::Error)]
pub enum GenesisLoadError {
    #[error("invalid genesis JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Transition(#[from] TransitionConfigError),
}
