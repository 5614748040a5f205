//! Secure Join secrets
//!
//! Two namespaces of random ids are embedded in every invite QR code:
//!
//! - **InviteNumber** (`i=`): lets an unknown sender start a handshake
//! - **Auth** (`s=`): proves the joiner actually scanned the code
//!
//! Tokens are keyed by `(namespace, foreign_id)` where the foreign id is `0`
//! for a 1:1 invite and the group chat id for a group invite. The first token
//! stored for a key is reused, so regenerating a QR code yields the same text.
//! Tokens are never consumed by a successful handshake.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 令牌命名空间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenNamespace {
    InviteNumber,
    Auth,
}

impl TokenNamespace {
    /// Stable integer code used by persistent stores.
    pub fn code(self) -> i32 {
        match self {
            TokenNamespace::InviteNumber => 100,
            TokenNamespace::Auth => 110,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            100 => Some(TokenNamespace::InviteNumber),
            110 => Some(TokenNamespace::Auth),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenNamespace::InviteNumber => write!(f, "invitenumber"),
            TokenNamespace::Auth => write!(f, "auth"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub namespace: TokenNamespace,
    pub foreign_id: u32,
    pub value: String,
    pub created_at: DateTime<Utc>,
}

impl Token {
    /// Creates a token with a fresh random value.
    pub fn generate(namespace: TokenNamespace, foreign_id: u32, now: DateTime<Utc>) -> Self {
        Self {
            namespace,
            foreign_id,
            value: generate_id(),
            created_at: now,
        }
    }
}

/// Random bytes behind one id; 8 bytes encode to 11 URL-safe characters.
const ID_BYTES: usize = 8;

/// Generates a random 11-character id over the URL-safe base64 alphabet.
///
/// The alphabet needs no escaping inside the QR fragment.
pub fn generate_id() -> String {
    let mut bytes = [0u8; ID_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
