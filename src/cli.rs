use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the hybrid PoS/PoA node.
#[derive(Parser, Debug)]
#[command(name = "hybrid-pos-poa-consensus", about = "Hybrid PoS to PoA consensus node")]
pub struct Cli {
    /// Chain ID for the network
    #[arg(long, default_value = "9323310")]
    pub chain_id: u64,

    /// Block production interval in seconds, used once PoA is active
    #[arg(long, default_value = "2")]
    pub block_time: u64,

    /// Data directory for chain storage
    #[arg(long, default_value = "data")]
    pub datadir: PathBuf,

    /// Signer private key (hex, without 0x prefix).
    /// Can also be set via SIGNER_KEY environment variable.
    #[arg(long, env = "SIGNER_KEY")]
    pub signer_key: Option<String>,

    /// Use production genesis configuration (chain ID 9323310)
    #[arg(long)]
    pub production: bool,

    /// Disable dev mode (no relaxed validation, strict POA signature checks)
    #[arg(long)]
    pub no_dev: bool,

    /// Override block gas limit (e.g., 100000000 for 100M, 1000000000 for 1B)
    #[arg(long)]
    pub gas_limit: Option<u64>,

    /// Block number at which the chain switches from PoS to PoA dispatch.
    /// Omit for a chain that never transitions.
    #[arg(long)]
    pub transition_block: Option<u64>,
}
