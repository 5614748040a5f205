//! Address book entries as seen by the handshake.

use serde::{Deserialize, Serialize};

use crate::ids::ContactId;

/// Where we learned about a contact. Ordered: a contact's origin can only be
/// scaled up, never down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Origin {
    Unknown,
    IncomingUnknownFrom,
    /// Added from a scanned QR code that was not acted upon yet.
    UnhandledQrScan,
    IncomingReplyTo,
    OutgoingTo,
    /// Joined us through a Secure Join invite (inviter side).
    SecurejoinInvited,
    /// We joined them through their invite (joiner side).
    SecurejoinJoined,
    ManuallyCreated,
    AddressBook,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub addr: String,
    pub display_name: String,
    pub origin: Origin,
}

impl Contact {
    /// Display name if set, otherwise the address.
    pub fn name_n_addr(&self) -> &str {
        if self.display_name.is_empty() {
            &self.addr
        } else {
            &self.display_name
        }
    }
}

/// Case-insensitive e-mail address comparison.
pub fn addr_cmp(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Cheap plausibility check used when decoding QR codes.
pub fn may_be_valid_addr(addr: &str) -> bool {
    match addr.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && domain.contains('.')
        }
        None => false,
    }
}
