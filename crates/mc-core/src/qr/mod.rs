//! Invite QR codes
//!
//! - [`uri`]: render and parse the `OPENPGP4FPR:` URI
//! - [`QrScanResult`]: what a scan turned out to be, after looking at the
//!   address book and the known keys

pub mod uri;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{Fingerprint, FingerprintError};
use crate::ids::ContactId;

pub use uri::{InviteCode, InviteTarget, ParsedQr, OPENPGP4FPR_SCHEME};

/// 二维码错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QrError {
    #[error("unknown QR code")]
    UnknownQrCode,

    #[error("bad fingerprint in QR code: {0}")]
    BadFingerprint(#[from] FingerprintError),

    #[error("bad e-mail address in QR code: {0}")]
    BadAddress(String),

    #[error("malformed QR parameter `{0}`")]
    MalformedParameter(String),
}

/// Classification of a scanned code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QrState {
    /// 1:1 invite; ask the user whether to verify the contact.
    AskVerifyContact,
    /// Group invite; ask the user whether to join the group.
    AskVerifyGroup,
    /// Plain fingerprint that matches the key we have for the address.
    FprOk,
    /// Plain fingerprint that does not match the key we have.
    FprMismatch,
    /// Fingerprint without address and no key on file.
    FprWithoutAddr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrScanResult {
    pub state: QrState,
    pub contact_id: Option<ContactId>,
    pub fingerprint: Fingerprint,
    pub invitenumber: Option<String>,
    pub auth: Option<String>,
    pub group_id: Option<String>,
    pub group_name: Option<String>,
}

impl QrScanResult {
    /// The scan can drive a Secure Join handshake.
    pub fn is_invite(&self) -> bool {
        matches!(self.state, QrState::AskVerifyContact | QrState::AskVerifyGroup)
    }

    pub fn is_group_invite(&self) -> bool {
        self.state == QrState::AskVerifyGroup
    }
}
