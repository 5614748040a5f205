//! # mailchat
//!
//! Process-level assembly of the Secure Join core: configuration loading,
//! tracing setup and wiring of [`mc_app::SecureJoinOrchestrator`] onto
//! SQLite-backed stores and the host's chat layer.

pub mod bootstrap;

pub use bootstrap::{build_orchestrator, init_tracing_subscriber, load_config, ExternalPorts};
