use async_trait::async_trait;

use mc_core::ports::{IdentityError, SelfIdentityPort};
use mc_core::Fingerprint;

/// Fixed account identity whose key pair already exists.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    addr: String,
    display_name: String,
    fingerprint: Fingerprint,
}

impl StaticIdentity {
    pub fn new(addr: impl Into<String>, display_name: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self {
            addr: addr.into(),
            display_name: display_name.into(),
            fingerprint,
        }
    }
}

#[async_trait]
impl SelfIdentityPort for StaticIdentity {
    async fn self_addr(&self) -> Result<String, IdentityError> {
        if self.addr.is_empty() {
            return Err(IdentityError::NotConfigured);
        }
        Ok(self.addr.clone())
    }

    async fn display_name(&self) -> Result<String, IdentityError> {
        Ok(self.display_name.clone())
    }

    async fn ensure_self_fingerprint(&self) -> Result<Fingerprint, IdentityError> {
        Ok(self.fingerprint.clone())
    }
}
