//! Cryptographic value types
//!
//! The PGP primitives themselves (key generation, encrypt, sign, verify) live
//! outside this crate; here we only model what the handshake compares.
//!
//! - **Fingerprint**: normalized OpenPGP key fingerprint

pub mod fingerprint;

pub use fingerprint::{Fingerprint, FingerprintError};
