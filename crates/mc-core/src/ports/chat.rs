use async_trait::async_trait;

use crate::chat::{Chat, ChatKind};
use crate::ids::{ChatId, ContactId};

use super::errors::ChatError;

#[async_trait]
pub trait ChatPort: Send + Sync {
    async fn get(&self, id: ChatId) -> Result<Option<Chat>, ChatError>;

    async fn get_by_grpid(&self, grpid: &str) -> Result<Option<Chat>, ChatError>;

    /// 1:1 chat with `contact`, created on demand.
    async fn create_or_lookup_single(&self, contact: ContactId) -> Result<ChatId, ChatError>;

    /// Group chat for `grpid`, created with `name` and `kind` if missing.
    async fn create_or_lookup_group(
        &self,
        grpid: &str,
        name: &str,
        kind: ChatKind,
    ) -> Result<ChatId, ChatError>;

    async fn contacts(&self, chat: ChatId) -> Result<Vec<ContactId>, ChatError>;

    /// Adds `contact` to a group. `from_handshake` marks additions caused by a
    /// Secure Join so the member-added message carries the handshake headers.
    async fn add_contact_to_chat(
        &self,
        chat: ChatId,
        contact: ContactId,
        from_handshake: bool,
    ) -> Result<(), ChatError>;

    /// Adds a local info/device message to `chat`.
    async fn add_info_message(&self, chat: ChatId, text: &str) -> Result<(), ChatError>;
}
