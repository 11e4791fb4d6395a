use alloy_primitives::{address, Address};

/// Vanity prefix length in a PoA "extra" field (zero-filled).
pub const EXTRA_VANITY_LENGTH: usize = 32;
/// Signature length in extra data (65 bytes: r=32, s=32, v=1).
pub const EXTRA_SEAL_LENGTH: usize = 65;
/// Ethereum address length (20 bytes).
pub const ADDRESS_LENGTH: usize = 20;
/// Default chain ID.
pub const DEFAULT_CHAIN_ID: u64 = 9323310;
/// Default epoch length (blocks between signer list snapshots).
pub const DEFAULT_EPOCH: u64 = 30000;

/// The initial PoA authority set installed into the checkpoint block at the
/// PoS→PoA transition height. This is compile-time, source-literal data —
/// the chain-level counterpart of a hardcoded checkpoint hash. Changing the
/// signer set after genesis is a hard fork, not a config edit.
pub const INITIAL_AUTHORITY_SET: &[Address] = &[
    address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
    address!("70997970C51812dc3A010C7d01b50e0d17dc79C8"),
    address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"),
];
