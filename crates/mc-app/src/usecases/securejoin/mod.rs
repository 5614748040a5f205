//! Secure Join use cases
//!
//! - [`GenerateQrInvite`]: issue (and revoke) invite codes
//! - [`CheckQr`]: classify a scanned code
//! - [`HandshakeHandler`]: inbound dispatcher, runs on inviter and joiner alike
//! - [`JoinDriver`]: joiner-side procedure started from a scan
//! - [`VerifiedGroupGuard`]: checks applied to verified-group messages
//!
//! [`SecureJoinOrchestrator`] owns the per-account state and wires them up.

mod check_qr;
mod config;
mod events;
mod generate_qr;
mod handshake;
mod join;
mod ongoing;
mod orchestrator;
mod verification;
mod verified_group;

pub use check_qr::CheckQr;
pub use config::SecureJoinConfig;
pub use events::{EventHub, SecureJoinEvent, SecureJoinEventPort};
pub use generate_qr::GenerateQrInvite;
pub use handshake::HandshakeHandler;
pub use join::JoinDriver;
pub use ongoing::{OngoingGuard, OngoingProcess};
pub use orchestrator::SecureJoinOrchestrator;
pub use verification::{encrypted_and_signed, TrustVerifier};
pub use verified_group::VerifiedGroupGuard;
