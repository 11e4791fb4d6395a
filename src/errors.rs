use thiserror::Error;

/// Errors raised while assembling a consensus engine instance from a validated
/// chain config (the engine factory) or while constructing the hybrid engine
/// directly.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Raised by the hybrid engine's constructor when either wrapped engine
    /// is absent. A hybrid engine with a missing half cannot dispatch.
    #[error("missing engine: hybrid consensus engine requires both a PoS and a PoA engine")]
    MissingEngine,

    /// The config does not carry a terminal-total-difficulty marker, so it
    /// cannot be treated as a PoS-era node. This is a precondition of the
    /// factory and is checked before the transition height is even consulted.
    #[error("chain config has no terminal total difficulty; not a PoS-era chain")]
    NotPostMerge,

    /// The transition config itself was invalid; see
    /// [`crate::chainspec::transition::TransitionConfigError`] for the
    /// specific reason.
    #[error(transparent)]
    InvalidTransition(#[from] crate::chainspec::transition::TransitionConfigError),
}
