use async_trait::async_trait;

use crate::token::{Token, TokenNamespace};

use super::errors::TokenStoreError;

/// Persistent store of Secure Join secrets.
#[async_trait]
pub trait TokenStorePort: Send + Sync {
    /// Inserts `token`. Duplicate keys are tolerated; lookups return the
    /// earliest stored value.
    async fn save(&self, token: &Token) -> Result<(), TokenStoreError>;

    async fn lookup(
        &self,
        namespace: TokenNamespace,
        foreign_id: u32,
    ) -> Result<Option<String>, TokenStoreError>;

    /// Membership test across all foreign ids. Does not consume the token.
    async fn exists(&self, namespace: TokenNamespace, value: &str)
        -> Result<bool, TokenStoreError>;

    /// Removes every token stored for `(namespace, foreign_id)`; returns the
    /// number of removed tokens.
    async fn delete(
        &self,
        namespace: TokenNamespace,
        foreign_id: u32,
    ) -> Result<usize, TokenStoreError>;
}
