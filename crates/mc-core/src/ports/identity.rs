use async_trait::async_trait;

use crate::crypto::Fingerprint;

use super::errors::IdentityError;

/// Own account identity.
#[async_trait]
pub trait SelfIdentityPort: Send + Sync {
    async fn self_addr(&self) -> Result<String, IdentityError>;

    async fn display_name(&self) -> Result<String, IdentityError>;

    /// Fingerprint of the own key pair, generating the pair on first use.
    async fn ensure_self_fingerprint(&self) -> Result<Fingerprint, IdentityError>;
}
