use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use mc_core::ports::{ChatError, ChatPort};
use mc_core::{Chat, ChatId, ChatKind, ContactId};

use super::lock;

#[derive(Debug)]
struct Inner {
    next_id: u32,
    chats: BTreeMap<ChatId, Chat>,
    members: BTreeMap<ChatId, Vec<ContactId>>,
    singles: BTreeMap<ContactId, ChatId>,
    info_messages: BTreeMap<ChatId, Vec<String>>,
    handshake_additions: Vec<(ChatId, ContactId)>,
}

/// Chats and their members. Info messages and members added by a handshake
/// are recorded so the embedder (or a test) can render or route them.
#[derive(Debug)]
pub struct InMemoryChats {
    inner: Mutex<Inner>,
}

impl Default for InMemoryChats {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 10,
                chats: BTreeMap::new(),
                members: BTreeMap::new(),
                singles: BTreeMap::new(),
                info_messages: BTreeMap::new(),
                handshake_additions: Vec::new(),
            }),
        }
    }
}

impl InMemoryChats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info_messages(&self, chat: ChatId) -> Vec<String> {
        lock(&self.inner)
            .info_messages
            .get(&chat)
            .cloned()
            .unwrap_or_default()
    }

    pub fn members(&self, chat: ChatId) -> Vec<ContactId> {
        lock(&self.inner)
            .members
            .get(&chat)
            .cloned()
            .unwrap_or_default()
    }

    /// Drains the `(group, contact)` pairs added with `from_handshake`.
    pub fn take_handshake_additions(&self) -> Vec<(ChatId, ContactId)> {
        std::mem::take(&mut lock(&self.inner).handshake_additions)
    }
}

impl Inner {
    fn alloc_id(&mut self) -> ChatId {
        let id = ChatId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

#[async_trait]
impl ChatPort for InMemoryChats {
    async fn get(&self, id: ChatId) -> Result<Option<Chat>, ChatError> {
        Ok(lock(&self.inner).chats.get(&id).cloned())
    }

    async fn get_by_grpid(&self, grpid: &str) -> Result<Option<Chat>, ChatError> {
        Ok(lock(&self.inner)
            .chats
            .values()
            .find(|c| c.grpid.as_deref() == Some(grpid))
            .cloned())
    }

    async fn create_or_lookup_single(&self, contact: ContactId) -> Result<ChatId, ChatError> {
        let mut inner = lock(&self.inner);
        if let Some(id) = inner.singles.get(&contact) {
            return Ok(*id);
        }
        let id = inner.alloc_id();
        inner.chats.insert(
            id,
            Chat {
                id,
                kind: ChatKind::Single,
                name: String::new(),
                grpid: None,
            },
        );
        inner.members.insert(id, vec![contact]);
        inner.singles.insert(contact, id);
        Ok(id)
    }

    async fn create_or_lookup_group(
        &self,
        grpid: &str,
        name: &str,
        kind: ChatKind,
    ) -> Result<ChatId, ChatError> {
        let mut inner = lock(&self.inner);
        if let Some(chat) = inner
            .chats
            .values()
            .find(|c| c.grpid.as_deref() == Some(grpid))
        {
            return Ok(chat.id);
        }
        let id = inner.alloc_id();
        inner.chats.insert(
            id,
            Chat {
                id,
                kind,
                name: name.to_string(),
                grpid: Some(grpid.to_string()),
            },
        );
        inner.members.insert(id, vec![ContactId::SELF]);
        Ok(id)
    }

    async fn contacts(&self, chat: ChatId) -> Result<Vec<ContactId>, ChatError> {
        lock(&self.inner)
            .members
            .get(&chat)
            .cloned()
            .ok_or(ChatError::NotFound(chat))
    }

    async fn add_contact_to_chat(
        &self,
        chat: ChatId,
        contact: ContactId,
        from_handshake: bool,
    ) -> Result<(), ChatError> {
        let mut inner = lock(&self.inner);
        let members = inner
            .members
            .get_mut(&chat)
            .ok_or(ChatError::NotFound(chat))?;
        if !members.contains(&contact) {
            members.push(contact);
        }
        if from_handshake {
            inner.handshake_additions.push((chat, contact));
        }
        Ok(())
    }

    async fn add_info_message(&self, chat: ChatId, text: &str) -> Result<(), ChatError> {
        let mut inner = lock(&self.inner);
        if !inner.chats.contains_key(&chat) {
            return Err(ChatError::NotFound(chat));
        }
        inner
            .info_messages
            .entry(chat)
            .or_default()
            .push(text.to_string());
        Ok(())
    }
}
