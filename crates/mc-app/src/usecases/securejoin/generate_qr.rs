use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use tracing::{info_span, Instrument};

use mc_core::ports::{ChatPort, SelfIdentityPort, TokenStorePort};
use mc_core::qr::{InviteCode, InviteTarget};
use mc_core::{ChatId, Token, TokenNamespace};

/// Issues invite QR codes for 1:1 contact verification or for joining a
/// verified group.
#[derive(Clone)]
pub struct GenerateQrInvite {
    token_store: Arc<dyn TokenStorePort>,
    chats: Arc<dyn ChatPort>,
    identity: Arc<dyn SelfIdentityPort>,
}

impl GenerateQrInvite {
    pub fn new(
        token_store: Arc<dyn TokenStorePort>,
        chats: Arc<dyn ChatPort>,
        identity: Arc<dyn SelfIdentityPort>,
    ) -> Self {
        Self {
            token_store,
            chats,
            identity,
        }
    }

    /// Returns the invite URI; calling it again for the same target yields the
    /// same text until the invite is revoked.
    pub async fn execute(&self, group: Option<ChatId>) -> Result<String> {
        let span = info_span!("securejoin.generate_qr", group = ?group);
        async {
            let fingerprint = self
                .identity
                .ensure_self_fingerprint()
                .await
                .context("failed to get own key fingerprint")?;
            let addr = self
                .identity
                .self_addr()
                .await
                .context("failed to get own address")?;

            let target = match group {
                Some(chat_id) => {
                    let chat = self
                        .chats
                        .get(chat_id)
                        .await
                        .context("failed to load group chat")?
                        .ok_or_else(|| anyhow!("chat {chat_id} not found"))?;
                    if !chat.is_verified_group() {
                        return Err(anyhow!("chat {chat_id} is not a verified group"));
                    }
                    let grpid = chat
                        .grpid
                        .ok_or_else(|| anyhow!("chat {chat_id} has no group id"))?;
                    InviteTarget::Group {
                        name: chat.name,
                        grpid,
                    }
                }
                None => InviteTarget::Contact {
                    display_name: self
                        .identity
                        .display_name()
                        .await
                        .context("failed to get own display name")?,
                },
            };

            let foreign_id = ChatId::foreign_id(group);
            let invitenumber = self
                .lookup_or_new(TokenNamespace::InviteNumber, foreign_id)
                .await?;
            let auth = self.lookup_or_new(TokenNamespace::Auth, foreign_id).await?;

            let uri = InviteCode {
                fingerprint,
                addr,
                target,
                invitenumber,
                auth,
            }
            .to_uri();

            tracing::info!("Generated secure-join QR code");
            Ok(uri)
        }
        .instrument(span)
        .await
    }

    /// Forgets both secrets of the target; the next [`execute`] issues new ones
    /// and old codes stop working.
    ///
    /// [`execute`]: GenerateQrInvite::execute
    pub async fn revoke(&self, group: Option<ChatId>) -> Result<()> {
        let foreign_id = ChatId::foreign_id(group);
        let mut removed = 0;
        for namespace in [TokenNamespace::InviteNumber, TokenNamespace::Auth] {
            removed += self
                .token_store
                .delete(namespace, foreign_id)
                .await
                .with_context(|| format!("failed to delete {namespace} tokens"))?;
        }
        tracing::info!(foreign_id, removed, "Revoked secure-join invite");
        Ok(())
    }

    async fn lookup_or_new(&self, namespace: TokenNamespace, foreign_id: u32) -> Result<String> {
        match self.token_store.lookup(namespace, foreign_id).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%namespace, error = %e, "Token lookup failed, issuing a new one");
            }
        }

        let token = Token::generate(namespace, foreign_id, Utc::now());
        self.token_store
            .save(&token)
            .await
            .with_context(|| format!("failed to save {namespace} token"))?;
        Ok(token.value)
    }
}
