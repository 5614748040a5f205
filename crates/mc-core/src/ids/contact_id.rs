use serde::{Deserialize, Serialize};

use super::id_macro::impl_row_id;

/// Row id of a contact in the account's address book.
///
/// Ids up to [`ContactId::LAST_SPECIAL`] are reserved for pseudo contacts
/// (the account owner, the device, ...) and never take part in a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContactId(u32);

impl_row_id!(ContactId);

impl ContactId {
    pub const UNDEFINED: ContactId = ContactId(0);
    pub const SELF: ContactId = ContactId(1);
    pub const DEVICE: ContactId = ContactId(5);
    pub const LAST_SPECIAL: ContactId = ContactId(9);

    pub fn is_special(self) -> bool {
        self <= Self::LAST_SPECIAL
    }
}
