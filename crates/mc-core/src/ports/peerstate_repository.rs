use async_trait::async_trait;

use crate::crypto::Fingerprint;
use crate::peerstate::Peerstate;

use super::errors::PeerstateRepositoryError;

#[async_trait]
pub trait PeerstateRepositoryPort: Send + Sync {
    /// Address comparison is case-insensitive.
    async fn get_by_addr(&self, addr: &str)
        -> Result<Option<Peerstate>, PeerstateRepositoryError>;

    /// Finds the peerstate holding `fingerprint` in its public, gossip or
    /// verified key slot.
    async fn get_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Peerstate>, PeerstateRepositoryError>;

    /// Inserts or replaces the peerstate of `peerstate.addr()`.
    async fn save(&self, peerstate: &Peerstate) -> Result<(), PeerstateRepositoryError>;
}
