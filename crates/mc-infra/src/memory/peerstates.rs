use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use mc_core::ports::{PeerstateRepositoryError, PeerstateRepositoryPort};
use mc_core::{Fingerprint, Peerstate};

use super::lock;

/// Peerstates keyed by lower-cased address.
#[derive(Debug, Default)]
pub struct InMemoryPeerstates {
    by_addr: Mutex<BTreeMap<String, Peerstate>>,
}

impl InMemoryPeerstates {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(addr: &str) -> String {
    addr.trim().to_ascii_lowercase()
}

#[async_trait]
impl PeerstateRepositoryPort for InMemoryPeerstates {
    async fn get_by_addr(&self, addr: &str) -> Result<Option<Peerstate>, PeerstateRepositoryError> {
        Ok(lock(&self.by_addr).get(&key(addr)).cloned())
    }

    async fn get_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Peerstate>, PeerstateRepositoryError> {
        let by_addr = lock(&self.by_addr);
        let own_key = by_addr
            .values()
            .find(|ps| ps.public_key_fingerprint() == Some(fingerprint));
        Ok(own_key
            .or_else(|| by_addr.values().find(|ps| ps.has_fingerprint(fingerprint)))
            .cloned())
    }

    async fn save(&self, peerstate: &Peerstate) -> Result<(), PeerstateRepositoryError> {
        lock(&self.by_addr).insert(key(peerstate.addr()), peerstate.clone());
        Ok(())
    }
}
