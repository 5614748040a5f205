//! # Secure Join protocol types
//!
//! Secure Join verifies two accounts (or a joiner and a verified group) over
//! ordinary, unordered e-mail, bootstrapped by an out-of-band QR code:
//!
//! ```text
//! Bob (joiner)                               Alice (inviter)
//!   | -- v?-request (invitenumber) --------->   |  plaintext
//!   | <-------------- v?-auth-required ------   |  encrypted + signed
//!   | -- v?-request-with-auth (auth, fpr) -->   |
//!   | <--- vc-contact-confirm / vg-member-added |
//!   | -- vg-member-added-received ---------->   |  groups only
//! ```
//!
//! When Bob already holds Alice's key matching the scanned fingerprint, he
//! skips the first round trip and opens with `v?-request-with-auth`.

mod flags;
mod message;
mod session;
mod step;

use thiserror::Error;

pub use flags::HandshakeFlags;
pub use message::{
    HandshakeMessage, HeaderMap, MessageSecurity, OutgoingHandshake, ReceivedMessage,
    HEADER_AUTH, HEADER_FINGERPRINT, HEADER_GROUP, HEADER_INVITENUMBER, HEADER_MEMBER_ADDED,
    HEADER_MEMBER_REMOVED, HEADER_SECURE_JOIN,
};
pub use session::{BobExpects, BobSnapshot, BobStatus, HandshakeSession};
pub use step::{Encryption, HandshakeStep, UnknownStep};

/// Joiner progress reported once the auth reply is on its way.
pub const JOINER_PROGRESS_AUTH_SENT: u16 = 400;
pub const INVITER_PROGRESS_REQUEST_RECEIVED: u16 = 300;
pub const INVITER_PROGRESS_CONTACT_VERIFIED: u16 = 600;
pub const INVITER_PROGRESS_MEMBER_ADDED_RECEIVED: u16 = 800;
pub const PROGRESS_DONE: u16 = 1000;

/// Why a message failed the verified-group checks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    #[error("sender is not verified")]
    SenderNotVerified,

    #[error("message is not encrypted")]
    NotEncrypted,

    #[error("message is not signed")]
    NotSigned,

    #[error("message is not signed by the sender's verified key")]
    WrongSigningKey,

    #[error("recipient {0} is not gossiped/verified")]
    RecipientNotVerified(String),

    #[error("storage error: {0}")]
    Storage(String),
}
