//! mailchat application layer
//!
//! This crate contains the Secure Join use cases and the per-account
//! orchestrator that ties them to the ports defined in `mc-core`.

pub mod deps;
pub mod usecases;

pub use deps::SecureJoinDeps;
pub use usecases::securejoin::{
    SecureJoinConfig, SecureJoinEvent, SecureJoinEventPort, SecureJoinOrchestrator,
};
