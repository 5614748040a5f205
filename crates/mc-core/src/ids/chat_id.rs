use serde::{Deserialize, Serialize};

use super::id_macro::impl_row_id;

/// Row id of a chat.
///
/// `ChatId` doubles as the token store's foreign id for group invites; the
/// 1:1 invite uses foreign id `0` (see [`ChatId::foreign_id`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(u32);

impl_row_id!(ChatId);

impl ChatId {
    pub const UNSET: ChatId = ChatId(0);

    pub fn is_unset(self) -> bool {
        self.0 == 0
    }

    /// Token-store foreign id for an optional group chat.
    pub fn foreign_id(group: Option<ChatId>) -> u32 {
        group.map(ChatId::to_u32).unwrap_or(0)
    }
}
