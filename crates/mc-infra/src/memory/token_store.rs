use std::sync::Mutex;

use async_trait::async_trait;

use mc_core::ports::{TokenStoreError, TokenStorePort};
use mc_core::{Token, TokenNamespace};

use super::lock;

#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    tokens: Mutex<Vec<Token>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStorePort for InMemoryTokenStore {
    async fn save(&self, token: &Token) -> Result<(), TokenStoreError> {
        lock(&self.tokens).push(token.clone());
        Ok(())
    }

    async fn lookup(
        &self,
        namespace: TokenNamespace,
        foreign_id: u32,
    ) -> Result<Option<String>, TokenStoreError> {
        Ok(lock(&self.tokens)
            .iter()
            .find(|t| t.namespace == namespace && t.foreign_id == foreign_id)
            .map(|t| t.value.clone()))
    }

    async fn exists(&self, namespace: TokenNamespace, value: &str) -> Result<bool, TokenStoreError> {
        Ok(lock(&self.tokens)
            .iter()
            .any(|t| t.namespace == namespace && t.value == value))
    }

    async fn delete(
        &self,
        namespace: TokenNamespace,
        foreign_id: u32,
    ) -> Result<usize, TokenStoreError> {
        let mut tokens = lock(&self.tokens);
        let before = tokens.len();
        tokens.retain(|t| !(t.namespace == namespace && t.foreign_id == foreign_id));
        Ok(before - tokens.len())
    }
}
