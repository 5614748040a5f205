//! Per-account Secure Join orchestrator
//!
//! 每个账户一个编排器。它持有共享的握手会话、单一的"进行中流程"槽位和事件订阅者,
//! 并把各个用例连接到同一组端口上。
//!
//! # Architecture / 架构
//!
//! ```text
//! UI: generate_qr / join_securejoin / stop_ongoing_process
//!   ↓
//! SecureJoinOrchestrator ── HandshakeSession (shared joiner state)
//!   ↑
//! Inbound pipeline: handle_securejoin_handshake / check_verified_properties
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use mc_core::securejoin::{HandshakeSession, VerificationFailure};
use mc_core::{ChatId, ContactId, HandshakeFlags, MessageSecurity, QrScanResult, ReceivedMessage};

use super::check_qr::CheckQr;
use super::config::SecureJoinConfig;
use super::events::{EventHub, SecureJoinEvent, SecureJoinEventPort};
use super::generate_qr::GenerateQrInvite;
use super::handshake::HandshakeHandler;
use super::join::JoinDriver;
use super::ongoing::OngoingProcess;
use super::verified_group::VerifiedGroupGuard;
use crate::deps::SecureJoinDeps;

/// 安全加入编排器
#[derive(Clone)]
pub struct SecureJoinOrchestrator {
    /// 加入方共享状态
    session: Arc<HandshakeSession>,
    /// 进行中流程槽位
    ongoing: Arc<OngoingProcess>,
    /// 事件订阅者
    events: EventHub,
    generate_qr: GenerateQrInvite,
    check_qr: CheckQr,
    handler: HandshakeHandler,
    joiner: JoinDriver,
    guard: VerifiedGroupGuard,
}

impl SecureJoinOrchestrator {
    pub fn new(deps: SecureJoinDeps, config: SecureJoinConfig) -> Self {
        let session = Arc::new(HandshakeSession::new());
        let ongoing = Arc::new(OngoingProcess::new());
        let events = EventHub::new();

        Self {
            generate_qr: GenerateQrInvite::new(
                deps.token_store.clone(),
                deps.chats.clone(),
                deps.identity.clone(),
            ),
            check_qr: CheckQr::new(deps.contacts.clone(), deps.peerstates.clone()),
            handler: HandshakeHandler::new(&deps, session.clone(), events.clone()),
            joiner: JoinDriver::new(
                &deps,
                session.clone(),
                ongoing.clone(),
                events.clone(),
                config,
            ),
            guard: VerifiedGroupGuard::new(deps.contacts.clone(), deps.peerstates.clone()),
            session,
            ongoing,
            events,
        }
    }

    /// Invite code for a 1:1 verification (`None`) or a verified group.
    pub async fn generate_qr(&self, group: Option<ChatId>) -> Result<String> {
        self.generate_qr.execute(group).await
    }

    pub async fn revoke_qr_invite(&self, group: Option<ChatId>) -> Result<()> {
        self.generate_qr.revoke(group).await
    }

    pub async fn check_qr(&self, text: &str) -> Result<QrScanResult> {
        self.check_qr.execute(text).await
    }

    /// Blocks until the handshake finished, failed, was cancelled with
    /// [`stop_ongoing_process`](Self::stop_ongoing_process) or timed out.
    pub async fn join_securejoin(&self, qr: &str) -> Option<ChatId> {
        self.joiner.join(qr).await
    }

    /// Returns `false` if no process was running.
    pub fn stop_ongoing_process(&self) -> bool {
        let stopped = self.ongoing.stop();
        if stopped {
            tracing::info!("Signaling the ongoing process to stop.");
        }
        stopped
    }

    pub async fn handle_securejoin_handshake(
        &self,
        msg: &ReceivedMessage,
        contact_id: ContactId,
    ) -> HandshakeFlags {
        self.handler.handle(msg, contact_id).await
    }

    pub async fn check_verified_properties(
        &self,
        from_id: ContactId,
        security: &MessageSecurity,
        recipients: &[ContactId],
    ) -> Result<(), VerificationFailure> {
        self.guard
            .check_verified_properties(from_id, security, recipients)
            .await
    }

    pub fn session(&self) -> &Arc<HandshakeSession> {
        &self.session
    }
}

#[async_trait]
impl SecureJoinEventPort for SecureJoinOrchestrator {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<SecureJoinEvent>> {
        Ok(self.events.subscribe().await)
    }
}
