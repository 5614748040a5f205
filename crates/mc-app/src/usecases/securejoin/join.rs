//! Joiner-side driver ("Bob").
//!
//! Sends the opening handshake message for a scanned invite and waits until
//! the dispatcher, running on the same account, reports a terminal status.

use std::sync::Arc;

use tracing::{info_span, Instrument};

use mc_core::ports::{ChatPort, ConnectivityPort, HandshakeTransportPort, SelfIdentityPort};
use mc_core::securejoin::{
    BobExpects, BobStatus, HandshakeSession, HandshakeStep, OutgoingHandshake,
    JOINER_PROGRESS_AUTH_SENT,
};
use mc_core::{ChatId, QrScanResult};

use super::check_qr::CheckQr;
use super::config::SecureJoinConfig;
use super::events::{EventHub, SecureJoinEvent};
use super::handshake::request_with_auth;
use super::ongoing::{OngoingGuard, OngoingProcess};
use super::verification::TrustVerifier;
use crate::deps::SecureJoinDeps;

#[derive(Clone)]
pub struct JoinDriver {
    chats: Arc<dyn ChatPort>,
    transport: Arc<dyn HandshakeTransportPort>,
    identity: Arc<dyn SelfIdentityPort>,
    connectivity: Arc<dyn ConnectivityPort>,
    session: Arc<HandshakeSession>,
    ongoing: Arc<OngoingProcess>,
    check_qr: CheckQr,
    verifier: TrustVerifier,
    events: EventHub,
    config: SecureJoinConfig,
}

impl JoinDriver {
    pub fn new(
        deps: &SecureJoinDeps,
        session: Arc<HandshakeSession>,
        ongoing: Arc<OngoingProcess>,
        events: EventHub,
        config: SecureJoinConfig,
    ) -> Self {
        Self {
            chats: deps.chats.clone(),
            transport: deps.transport.clone(),
            identity: deps.identity.clone(),
            connectivity: deps.connectivity.clone(),
            session,
            ongoing,
            check_qr: CheckQr::new(deps.contacts.clone(), deps.peerstates.clone()),
            verifier: TrustVerifier::new(
                deps.peerstates.clone(),
                deps.contacts.clone(),
                deps.chats.clone(),
            ),
            events,
            config,
        }
    }

    /// Joins via `qr`. Returns the verified 1:1 chat or the joined group, or
    /// `None` if the join failed, was cancelled or timed out.
    pub async fn join(&self, qr: &str) -> Option<ChatId> {
        let span = info_span!("securejoin.join");
        async {
            if !self.connectivity.is_online().await {
                tracing::warn!("Not connected, cannot join.");
                return None;
            }
            let Some(mut guard) = self.ongoing.alloc() else {
                tracing::warn!("Another ongoing process is running, cannot join.");
                return None;
            };

            let result = self.run(qr, &mut guard).await;
            self.session.clear().await;
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, qr: &str, guard: &mut OngoingGuard) -> Option<ChatId> {
        let scan = match self.check_qr.execute(qr).await {
            Ok(scan) if scan.is_invite() => scan,
            Ok(scan) => {
                tracing::error!(state = ?scan.state, "Unknown QR code.");
                return None;
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot parse QR code.");
                return None;
            }
        };
        let contact_id = scan.contact_id?;
        let chat_id = match self.chats.create_or_lookup_single(contact_id).await {
            Ok(chat_id) => chat_id,
            Err(e) => {
                tracing::error!(error = %e, "Unknown contact.");
                return None;
            }
        };
        if guard.is_stopped() {
            return None;
        }

        self.session.begin(scan.clone()).await;
        let mut status = self.session.subscribe();

        if !self.send_opening(&scan, chat_id).await {
            self.session.finish(BobStatus::Error);
            return None;
        }

        let outcome = tokio::select! {
            changed = status.wait_for(|s| s.is_terminal()) => {
                changed.map(|s| *s).unwrap_or(BobStatus::Error)
            }
            _ = guard.stopped() => {
                tracing::info!("Join cancelled.");
                BobStatus::Undefined
            }
            _ = timeout(self.config.join_timeout) => {
                tracing::warn!("Join timed out.");
                BobStatus::Undefined
            }
        };

        if outcome != BobStatus::Success {
            return None;
        }

        if scan.is_group_invite() {
            let grpid = scan.group_id.as_deref().unwrap_or_default();
            match self.chats.get_by_grpid(grpid).await {
                Ok(chat) => chat.map(|chat| chat.id),
                Err(e) => {
                    tracing::error!(grpid, error = %e, "Joined group not found");
                    None
                }
            }
        } else {
            Some(chat_id)
        }
    }

    /// Queues the first message. Returns `false` if nothing could be sent.
    async fn send_opening(&self, scan: &QrScanResult, chat_id: ChatId) -> bool {
        let Some(contact_id) = scan.contact_id else {
            return false;
        };

        let message = if self
            .verifier
            .fingerprint_equals_sender(&scan.fingerprint, chat_id)
            .await
        {
            tracing::info!("Taking protocol shortcut.");
            let own_fingerprint = match self.identity.ensure_self_fingerprint().await {
                Ok(fpr) => fpr,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to get own fingerprint");
                    return false;
                }
            };
            let Some(message) = request_with_auth(chat_id, scan, own_fingerprint) else {
                return false;
            };
            self.session.set_expects(BobExpects::ContactConfirm).await;
            self.events
                .emit(SecureJoinEvent::JoinerProgress {
                    contact_id,
                    progress: JOINER_PROGRESS_AUTH_SENT,
                })
                .await;
            message
        } else {
            let Some(invitenumber) = scan.invitenumber.as_deref() else {
                return false;
            };
            self.session.set_expects(BobExpects::AuthRequired).await;
            OutgoingHandshake::new(chat_id, HandshakeStep::request(scan.is_group_invite()))
                .with_invitenumber(invitenumber)
        };

        match self.transport.send(message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Failed to send secure-join message");
                false
            }
        }
    }
}

async fn timeout(limit: Option<std::time::Duration>) {
    match limit {
        Some(limit) => tokio::time::sleep(limit).await,
        None => std::future::pending().await,
    }
}
