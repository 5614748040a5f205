//! Chats as seen by the handshake.

use serde::{Deserialize, Serialize};

use crate::ids::ChatId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatKind {
    /// 1:1 chat with exactly one contact.
    Single,
    Group,
    /// Group whose membership changes require verified senders.
    VerifiedGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub kind: ChatKind,
    pub name: String,
    /// Group id shared by all members; `None` for 1:1 chats.
    pub grpid: Option<String>,
}

impl Chat {
    pub fn is_verified_group(&self) -> bool {
        self.kind == ChatKind::VerifiedGroup
    }
}
