use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use mc_core::contact::{addr_cmp, may_be_valid_addr};
use mc_core::ports::{ContactError, ContactPort};
use mc_core::{Contact, ContactId, Origin};

use super::lock;

#[derive(Debug)]
struct Inner {
    next_id: u32,
    contacts: BTreeMap<ContactId, Contact>,
}

#[derive(Debug)]
pub struct InMemoryContacts {
    inner: Mutex<Inner>,
}

impl Default for InMemoryContacts {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: ContactId::LAST_SPECIAL.to_u32() + 1,
                contacts: BTreeMap::new(),
            }),
        }
    }
}

impl InMemoryContacts {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContactPort for InMemoryContacts {
    async fn get(&self, id: ContactId) -> Result<Option<Contact>, ContactError> {
        Ok(lock(&self.inner).contacts.get(&id).cloned())
    }

    async fn lookup_by_addr(&self, addr: &str) -> Result<Option<ContactId>, ContactError> {
        Ok(lock(&self.inner)
            .contacts
            .values()
            .find(|c| addr_cmp(&c.addr, addr))
            .map(|c| c.id))
    }

    async fn add_or_lookup(
        &self,
        display_name: &str,
        addr: &str,
        origin: Origin,
    ) -> Result<ContactId, ContactError> {
        if !may_be_valid_addr(addr) {
            return Err(ContactError::InvalidAddress(addr.to_string()));
        }

        let mut inner = lock(&self.inner);
        if let Some(existing) = inner.contacts.values_mut().find(|c| addr_cmp(&c.addr, addr)) {
            existing.origin = existing.origin.max(origin);
            if existing.display_name.is_empty() {
                existing.display_name = display_name.to_string();
            }
            return Ok(existing.id);
        }

        let id = ContactId::new(inner.next_id);
        inner.next_id += 1;
        inner.contacts.insert(
            id,
            Contact {
                id,
                addr: addr.trim().to_string(),
                display_name: display_name.to_string(),
                origin,
            },
        );
        Ok(id)
    }

    async fn scale_up_origin(&self, id: ContactId, origin: Origin) -> Result<(), ContactError> {
        let mut inner = lock(&self.inner);
        let contact = inner
            .contacts
            .get_mut(&id)
            .ok_or(ContactError::NotFound(id))?;
        contact.origin = contact.origin.max(origin);
        Ok(())
    }
}
