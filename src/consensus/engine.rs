//! The operation surface shared by every consensus era (PoS, PoA, and the
//! hybrid dispatcher that picks between them per block).
//!
//! This sits alongside — not in place of — the `HeaderValidator`/`Consensus`/
//! `FullConsensus` traits from `reth_consensus`, which are what the node
//! actually wires up for header/body validation. `ConsensusEngine` models the
//! broader geth-style engine surface (authoring, sealing, difficulty) that
//! the hybrid dispatcher needs a single vocabulary for across both eras.

use alloy_consensus::Header;
use alloy_primitives::{Address, B256, U256};
use reth_primitives_traits::SealedHeader;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, thiserror::Error)]
pub enum EngineOpError {
    #[error(transparent)]
    Verification(#[from] reth_consensus::ConsensusError),
    #[error("sealing failed: {0}")]
    Sealing(String),
    #[error("sealing was cancelled")]
    Cancelled,
    #[error("unexpected uncle: proof-of-authority chains have no ommers")]
    UnexpectedUncle,
}

/// Operations a block-production/validation engine supports, independent of
/// which era is currently active. `HybridConsensus` implements this by
/// dispatching every call to whichever engine owns the block's number.
pub trait ConsensusEngine: Send + Sync {
    /// The address that would author a block at this header's height, or
    /// `None` if the engine has no notion of a single author (beacon-style
    /// PoS defers this entirely to the consensus layer).
    fn author(&self, header: &Header) -> Result<Option<Address>, EngineOpError>;

    /// Verifies a single header in isolation, independent of chain context.
    fn verify_header(&self, header: &SealedHeader<Header>) -> Result<(), EngineOpError>;

    /// Verifies a batch of headers. Results are streamed back in order over
    /// `result_tx` as each header finishes; dropping or signalling the
    /// returned cancellation handle stops verification of any headers not
    /// yet processed, which are then reported as `Cancelled`.
    fn verify_headers(
        &self,
        headers: Vec<SealedHeader<Header>>,
        result_tx: mpsc::UnboundedSender<Result<(), EngineOpError>>,
    ) -> oneshot::Sender<()>;

    /// Verifies uncle/ommer headers. Proof-of-authority chains have none;
    /// this exists for interface symmetry with engines that do.
    fn verify_uncles(&self, uncles: &[Header]) -> Result<(), EngineOpError>;

    /// Fills in the consensus-specific fields of a header ahead of
    /// execution (difficulty, extra-data). The hybrid dispatcher special-
    /// cases this at the exact transition height, seeding the checkpoint
    /// extra-data layout before delegating the remainder to the
    /// post-transition engine.
    fn prepare(&self, header: &mut Header) -> Result<(), EngineOpError>;

    /// Finalizes a block after execution (block rewards, state-trie
    /// touch-ups). A no-op for both eras modeled here.
    fn finalize(&self, header: &Header) -> Result<(), EngineOpError>;

    /// Finalizes and assembles the final header in one step.
    fn finalize_and_assemble(&self, header: &Header) -> Result<Header, EngineOpError> {
        self.finalize(header)?;
        Ok(header.clone())
    }

    /// Seals `header` asynchronously, producing a signed header. The result
    /// is delivered on `result_tx`; signalling the returned handle stops an
    /// in-progress seal.
    fn seal(
        &self,
        header: Header,
        result_tx: mpsc::UnboundedSender<Result<Header, EngineOpError>>,
    ) -> oneshot::Sender<()>;

    /// The hash used as the pre-seal signing input.
    fn seal_hash(&self, header: &Header) -> B256;

    /// The difficulty this engine would assign, given the expected in-turn
    /// signer (if any) and the signer that actually produced the block.
    fn calc_difficulty(
        &self,
        number: u64,
        expected_signer: Option<Address>,
        actual_signer: Address,
    ) -> U256;

    /// Releases resources held by the engine (signer connections, running
    /// tasks). Idempotent.
    fn close(&self) -> Result<(), EngineOpError>;
}
