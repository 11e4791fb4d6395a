//! Node-integration surface: the point where this crate's consensus engine
//! plugs into a Reth node builder.
//!
//! Bootstrapping a full node (networking, RPC, payload building) is out of
//! scope here; only the consensus-builder seam is provided, grounded in how
//! a Reth node wires in a custom consensus implementation.

pub mod builder;

pub use builder::HybridConsensusBuilder;
