use async_trait::async_trait;

use crate::contact::{Contact, Origin};
use crate::ids::ContactId;

use super::errors::ContactError;

/// Address book operations used by the handshake.
#[async_trait]
pub trait ContactPort: Send + Sync {
    async fn get(&self, id: ContactId) -> Result<Option<Contact>, ContactError>;

    async fn lookup_by_addr(&self, addr: &str) -> Result<Option<ContactId>, ContactError>;

    /// Returns the existing contact for `addr` (scaling its origin up to
    /// `origin`) or creates a new one.
    async fn add_or_lookup(
        &self,
        display_name: &str,
        addr: &str,
        origin: Origin,
    ) -> Result<ContactId, ContactError>;

    /// Raises the origin of `id` to `origin`; lower origins are ignored.
    async fn scale_up_origin(&self, id: ContactId, origin: Origin) -> Result<(), ContactError>;
}
