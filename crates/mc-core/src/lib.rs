//! # mc-core
//!
//! Core domain models and Secure Join protocol types for mailchat.
//!
//! This crate contains pure business logic without any infrastructure dependencies.
//! Storage, transport, key handling and chat bookkeeping are reached through the
//! traits in [`ports`].

// Public module exports
pub mod chat;
pub mod config;
pub mod contact;
pub mod crypto;
pub mod ids;
pub mod peerstate;
pub mod ports;
pub mod qr;
pub mod securejoin;
pub mod token;

// Re-export commonly used types at the crate root
pub use chat::{Chat, ChatKind};
pub use config::AppConfig;
pub use contact::{Contact, Origin};
pub use crypto::Fingerprint;
pub use ids::{ChatId, ContactId};
pub use peerstate::{EncryptPreference, PeerKey, Peerstate, VerificationLevel};
pub use qr::{QrScanResult, QrState};
pub use securejoin::{
    BobExpects, BobStatus, HandshakeFlags, HandshakeMessage, HandshakeSession, HandshakeStep,
    MessageSecurity, OutgoingHandshake, ReceivedMessage,
};
pub use token::{Token, TokenNamespace};
