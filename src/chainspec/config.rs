use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// PoA ("clique") sub-configuration: block period and epoch length, plus the
/// signer set used when no transition-time authority set override applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoaConfig {
    /// Minimum block production interval, in seconds.
    pub period: u64,
    /// Number of blocks between signer-list snapshot checkpoints.
    pub epoch: u64,
    /// Authorized signer addresses.
    pub signers: Vec<Address>,
}

impl Default for PoaConfig {
    fn default() -> Self {
        Self {
            period: 12,
            epoch: 30000,
            signers: Vec::new(),
        }
    }
}
