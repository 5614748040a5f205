//! Inbound Secure Join dispatcher
//!
//! 这个模块处理收到的握手消息。同一个处理器同时服务邀请方 (Alice) 和加入方 (Bob):
//! 每个步骤只属于其中一个角色。
//!
//! # Outcomes / 结果
//!
//! - success of a hidden step: `STOP | ADD_DELETE_JOB`
//! - `vg-member-added`: `CONTINUE` (it is a real membership change)
//! - protocol desync (no scan, wrong expectation, other handshake): logged at
//!   info level, no deletion
//! - security violation: `STOP | ADD_DELETE_JOB`, device message, and on the
//!   joiner side the join ends with [`BobStatus::Error`]

use std::sync::Arc;

use tracing::{info_span, Instrument};

use mc_core::contact::addr_cmp;
use mc_core::ports::{
    ChatPort, ContactPort, HandshakeTransportPort, PeerstateRepositoryPort, SelfIdentityPort,
    TokenStorePort,
};
use mc_core::securejoin::{
    BobExpects, BobStatus, HandshakeMessage, HandshakeSession, HandshakeStep, OutgoingHandshake,
    ReceivedMessage, INVITER_PROGRESS_CONTACT_VERIFIED, INVITER_PROGRESS_MEMBER_ADDED_RECEIVED,
    INVITER_PROGRESS_REQUEST_RECEIVED, JOINER_PROGRESS_AUTH_SENT, PROGRESS_DONE,
};
use mc_core::{
    ChatId, ChatKind, ContactId, Fingerprint, HandshakeFlags, Origin, QrScanResult,
    TokenNamespace,
};

use super::events::{EventHub, SecureJoinEvent};
use super::verification::{encrypted_and_signed, TrustVerifier};
use super::verified_group::VerifiedGroupGuard;
use crate::deps::SecureJoinDeps;

const HIDDEN_DONE: HandshakeFlags =
    HandshakeFlags::STOP_NORMAL_PROCESSING.union(HandshakeFlags::ADD_DELETE_JOB);

/// `v?-request-with-auth` for the scan in `scan`, sent by the joiner.
pub(super) fn request_with_auth(
    chat_id: ChatId,
    scan: &QrScanResult,
    own_fingerprint: Fingerprint,
) -> Option<OutgoingHandshake> {
    let auth = scan.auth.as_deref()?;
    Some(
        OutgoingHandshake::new(chat_id, HandshakeStep::request_with_auth(scan.is_group_invite()))
            .with_auth(auth)
            .with_fingerprint(own_fingerprint)
            .with_group_id(scan.group_id.clone()),
    )
}

/// Whether a joiner-side step belongs to the invite Bob scanned: same
/// variant (contact or group), and for group steps carrying a group id, the
/// same group.
fn matches_scan(handshake: &HandshakeMessage, scan: &QrScanResult) -> bool {
    if handshake.step.is_group() != scan.is_group_invite() {
        return false;
    }
    match (&handshake.group_id, handshake.step) {
        (Some(grpid), _) => scan.group_id.as_deref() == Some(grpid.as_str()),
        (None, HandshakeStep::VgMemberAdded) => false,
        (None, _) => true,
    }
}

#[derive(Clone)]
pub struct HandshakeHandler {
    token_store: Arc<dyn TokenStorePort>,
    peerstates: Arc<dyn PeerstateRepositoryPort>,
    contacts: Arc<dyn ContactPort>,
    chats: Arc<dyn ChatPort>,
    transport: Arc<dyn HandshakeTransportPort>,
    identity: Arc<dyn SelfIdentityPort>,
    session: Arc<HandshakeSession>,
    verifier: TrustVerifier,
    guard: VerifiedGroupGuard,
    events: EventHub,
}

impl HandshakeHandler {
    pub fn new(deps: &SecureJoinDeps, session: Arc<HandshakeSession>, events: EventHub) -> Self {
        Self {
            token_store: deps.token_store.clone(),
            peerstates: deps.peerstates.clone(),
            contacts: deps.contacts.clone(),
            chats: deps.chats.clone(),
            transport: deps.transport.clone(),
            identity: deps.identity.clone(),
            session,
            verifier: TrustVerifier::new(
                deps.peerstates.clone(),
                deps.contacts.clone(),
                deps.chats.clone(),
            ),
            guard: VerifiedGroupGuard::new(deps.contacts.clone(), deps.peerstates.clone()),
            events,
        }
    }

    /// Handles one message carrying a `Secure-Join` header, before chat
    /// assignment. `contact_id` is the sender.
    pub async fn handle(&self, msg: &ReceivedMessage, contact_id: ContactId) -> HandshakeFlags {
        let handshake = match msg.handshake() {
            Ok(Some(handshake)) => handshake,
            Ok(None) => return HandshakeFlags::CONTINUE_NORMAL_PROCESSING,
            Err(e) => {
                tracing::warn!(contact_id = %contact_id, error = %e, "Ignoring secure-join message");
                return HandshakeFlags::STOP_NORMAL_PROCESSING;
            }
        };

        let span = info_span!(
            "securejoin.handle",
            step = %handshake.step,
            contact_id = %contact_id
        );
        async {
            if contact_id.is_special() {
                tracing::error!("Secure-join message from a special contact");
                return HandshakeFlags::FAILURE;
            }
            tracing::info!("Received secure-join message");

            let chat_id = match self.chats.create_or_lookup_single(contact_id).await {
                Ok(chat_id) => chat_id,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to look up 1:1 chat");
                    return HandshakeFlags::FAILURE;
                }
            };

            match handshake.step {
                HandshakeStep::VcRequest | HandshakeStep::VgRequest => {
                    self.inviter_request(&handshake, contact_id, chat_id).await
                }
                HandshakeStep::VcAuthRequired | HandshakeStep::VgAuthRequired => {
                    self.joiner_auth_required(msg, &handshake, contact_id, chat_id)
                        .await
                }
                HandshakeStep::VcRequestWithAuth | HandshakeStep::VgRequestWithAuth => {
                    self.inviter_request_with_auth(msg, &handshake, contact_id, chat_id)
                        .await
                }
                HandshakeStep::VcContactConfirm | HandshakeStep::VgMemberAdded => {
                    self.joiner_confirm(msg, &handshake, contact_id, chat_id).await
                }
                HandshakeStep::VgMemberAddedReceived => {
                    self.inviter_member_added_received(contact_id).await
                }
            }
        }
        .instrument(span)
        .await
    }

    // ---- Alice ----------------------------------------------------------

    async fn inviter_request(
        &self,
        handshake: &HandshakeMessage,
        contact_id: ContactId,
        chat_id: ChatId,
    ) -> HandshakeFlags {
        let Some(invitenumber) = handshake.invitenumber.as_deref() else {
            return self
                .fail_inviter(contact_id, "Secure-join denied (invitenumber missing).")
                .await;
        };
        if !self.token_exists(TokenNamespace::InviteNumber, invitenumber).await {
            return self
                .fail_inviter(contact_id, "Secure-join denied (bad invitenumber).")
                .await;
        }
        tracing::info!("Secure-join requested.");

        self.emit_inviter(contact_id, INVITER_PROGRESS_REQUEST_RECEIVED)
            .await;

        let reply =
            OutgoingHandshake::new(chat_id, HandshakeStep::auth_required(handshake.step.is_group()));
        if let Err(e) = self.transport.send(reply).await {
            tracing::error!(error = %e, "Failed to send auth-required");
            return HandshakeFlags::STOP_NORMAL_PROCESSING;
        }
        HIDDEN_DONE
    }

    async fn inviter_request_with_auth(
        &self,
        msg: &ReceivedMessage,
        handshake: &HandshakeMessage,
        contact_id: ContactId,
        chat_id: ChatId,
    ) -> HandshakeFlags {
        let fingerprint = handshake
            .fingerprint
            .as_deref()
            .map(Fingerprint::normalized)
            .filter(|fpr| !fpr.hex().is_empty());
        let Some(fingerprint) = fingerprint else {
            return self
                .fail_inviter(contact_id, "Fingerprint not provided.")
                .await;
        };
        if !encrypted_and_signed(&msg.security, &fingerprint) {
            return self.fail_inviter(contact_id, "Auth not encrypted.").await;
        }
        if !self
            .verifier
            .fingerprint_equals_sender(&fingerprint, chat_id)
            .await
        {
            return self
                .fail_inviter(contact_id, "Fingerprint mismatch on inviter-side.")
                .await;
        }
        tracing::info!("Fingerprint verified.");

        let Some(auth) = handshake.auth.as_deref() else {
            return self.fail_inviter(contact_id, "Auth not provided.").await;
        };
        if !self.token_exists(TokenNamespace::Auth, auth).await {
            return self.fail_inviter(contact_id, "Auth invalid.").await;
        }
        if !self.verifier.mark_peer_as_verified(&fingerprint).await {
            return self
                .fail_inviter(contact_id, "Fingerprint mismatch on inviter-side.")
                .await;
        }
        self.scale_up_origin(contact_id, Origin::SecurejoinInvited)
            .await;
        tracing::info!("Auth verified.");

        self.verifier.secure_connection_established(contact_id).await;
        self.emit_inviter(contact_id, INVITER_PROGRESS_CONTACT_VERIFIED)
            .await;

        if handshake.step.is_group() {
            let grpid = handshake.group_id.as_deref().unwrap_or_default();
            let chat = match self.chats.get_by_grpid(grpid).await {
                Ok(Some(chat)) if chat.is_verified_group() => chat,
                Ok(_) => {
                    tracing::error!(grpid, "Verified group for secure-join not found");
                    return HandshakeFlags::FAILURE;
                }
                Err(e) => {
                    tracing::error!(grpid, error = %e, "Failed to look up group");
                    return HandshakeFlags::FAILURE;
                }
            };
            // the member-added message doubles as the confirmation
            if let Err(e) = self
                .chats
                .add_contact_to_chat(chat.id, contact_id, true)
                .await
            {
                tracing::error!(chat_id = %chat.id, error = %e, "Failed to add member");
                return HandshakeFlags::FAILURE;
            }
        } else {
            let reply = OutgoingHandshake::new(chat_id, HandshakeStep::VcContactConfirm)
                .with_fingerprint(fingerprint);
            if let Err(e) = self.transport.send(reply).await {
                tracing::error!(error = %e, "Failed to send contact-confirm");
                return HandshakeFlags::STOP_NORMAL_PROCESSING;
            }
            self.emit_inviter(contact_id, PROGRESS_DONE).await;
        }
        HIDDEN_DONE
    }

    async fn inviter_member_added_received(&self, contact_id: ContactId) -> HandshakeFlags {
        let verified = match self.contacts.get(contact_id).await {
            Ok(Some(contact)) => self.is_verified_addr(&contact.addr).await,
            Ok(None) => false,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load contact");
                false
            }
        };
        if !verified {
            tracing::warn!("vg-member-added-received invalid: sender is not verified");
            return HandshakeFlags::FAILURE;
        }

        self.emit_inviter(contact_id, INVITER_PROGRESS_MEMBER_ADDED_RECEIVED)
            .await;
        self.emit_inviter(contact_id, PROGRESS_DONE).await;
        HIDDEN_DONE
    }

    // ---- Bob ------------------------------------------------------------

    async fn joiner_auth_required(
        &self,
        msg: &ReceivedMessage,
        handshake: &HandshakeMessage,
        contact_id: ContactId,
        chat_id: ChatId,
    ) -> HandshakeFlags {
        let snapshot = self.session.snapshot().await;
        let scan = match snapshot.qr_scan {
            Some(scan) if snapshot.expects == BobExpects::AuthRequired => scan,
            _ => {
                tracing::info!("Not waiting for auth-required, ignoring.");
                return HandshakeFlags::STOP_NORMAL_PROCESSING;
            }
        };
        if !matches_scan(handshake, &scan) {
            tracing::info!("auth-required does not match the scanned invite, ignoring.");
            return HandshakeFlags::STOP_NORMAL_PROCESSING;
        }

        if !encrypted_and_signed(&msg.security, &scan.fingerprint) {
            let details = if msg.security.encrypted {
                "No valid signature."
            } else {
                "Not encrypted."
            };
            return self.fail_joiner(contact_id, details).await;
        }
        if !self
            .verifier
            .fingerprint_equals_sender(&scan.fingerprint, chat_id)
            .await
        {
            return self
                .fail_joiner(contact_id, "Fingerprint mismatch on joiner-side.")
                .await;
        }
        tracing::info!("Fingerprint verified.");

        let own_fingerprint = match self.identity.ensure_self_fingerprint().await {
            Ok(fpr) => fpr,
            Err(e) => {
                tracing::error!(error = %e, "Failed to get own fingerprint");
                return self.fail_joiner(contact_id, "No own key.").await;
            }
        };
        let Some(reply) = request_with_auth(chat_id, &scan, own_fingerprint) else {
            tracing::info!("Scanned code carries no auth, ignoring.");
            return HandshakeFlags::STOP_NORMAL_PROCESSING;
        };
        if !self
            .session
            .advance(BobExpects::AuthRequired, BobExpects::ContactConfirm)
            .await
        {
            tracing::info!("Expectation changed meanwhile, ignoring.");
            return HandshakeFlags::STOP_NORMAL_PROCESSING;
        }

        self.emit_joiner(contact_id, JOINER_PROGRESS_AUTH_SENT).await;
        if let Err(e) = self.transport.send(reply).await {
            tracing::error!(error = %e, "Failed to send request-with-auth");
            self.session.finish(BobStatus::Error);
            return HandshakeFlags::STOP_NORMAL_PROCESSING;
        }
        HIDDEN_DONE
    }

    async fn joiner_confirm(
        &self,
        msg: &ReceivedMessage,
        handshake: &HandshakeMessage,
        contact_id: ContactId,
        chat_id: ChatId,
    ) -> HandshakeFlags {
        let join_vg = handshake.step == HandshakeStep::VgMemberAdded;
        let desync = if join_vg {
            HandshakeFlags::CONTINUE_NORMAL_PROCESSING
        } else {
            HandshakeFlags::STOP_NORMAL_PROCESSING
        };
        let success = if join_vg {
            HandshakeFlags::CONTINUE_NORMAL_PROCESSING
        } else {
            HIDDEN_DONE
        };

        let snapshot = self.session.snapshot().await;
        let scan = match snapshot.qr_scan {
            Some(scan) if snapshot.expects == BobExpects::ContactConfirm => scan,
            _ => {
                tracing::info!("Unexpected confirmation, probably another device's handshake.");
                return desync;
            }
        };
        if !matches_scan(handshake, &scan) {
            tracing::info!("Confirmation does not match the scanned invite, ignoring.");
            return desync;
        }

        if !encrypted_and_signed(&msg.security, &scan.fingerprint) {
            return self
                .fail_joiner(contact_id, "Contact confirm message not encrypted.")
                .await;
        }
        if !self.verifier.mark_peer_as_verified(&scan.fingerprint).await {
            return self
                .fail_joiner(contact_id, "Fingerprint mismatch on joiner-side.")
                .await;
        }
        self.scale_up_origin(contact_id, Origin::SecurejoinJoined)
            .await;

        if join_vg {
            if let Err(failure) = self
                .guard
                .check_verified_properties(contact_id, &msg.security, &msg.recipients)
                .await
            {
                tracing::warn!(%failure, "Verified-group check failed for member-added");
            }

            let self_addr = match self.identity.self_addr().await {
                Ok(addr) => addr,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to get own address");
                    return desync;
                }
            };
            let added = handshake.member_added.as_deref().unwrap_or_default();
            if !addr_cmp(added, &self_addr) {
                tracing::info!("Message belongs to a different handshake.");
                return desync;
            }

            let grpid = scan.group_id.as_deref().unwrap_or_default();
            let name = scan.group_name.as_deref().unwrap_or_default();
            if let Err(e) = self
                .chats
                .create_or_lookup_group(grpid, name, ChatKind::VerifiedGroup)
                .await
            {
                // the peer is verified already, but there is no chat to return
                tracing::error!(grpid, error = %e, "Failed to create joined group");
                self.session.set_expects(BobExpects::Nothing).await;
                self.session.finish(BobStatus::Error);
                return desync;
            }
        }

        self.verifier.secure_connection_established(contact_id).await;
        self.session.set_expects(BobExpects::Nothing).await;

        if join_vg {
            let reply = OutgoingHandshake::new(chat_id, HandshakeStep::VgMemberAddedReceived);
            if let Err(e) = self.transport.send(reply).await {
                tracing::error!(error = %e, "Failed to send member-added-received");
            }
        }

        self.session.finish(BobStatus::Success);
        success
    }

    // ---- helpers --------------------------------------------------------

    async fn fail_inviter(&self, contact_id: ContactId, details: &str) -> HandshakeFlags {
        self.verifier
            .could_not_establish_secure_connection(contact_id, details)
            .await;
        HandshakeFlags::FAILURE
    }

    async fn fail_joiner(&self, contact_id: ContactId, details: &str) -> HandshakeFlags {
        self.verifier
            .could_not_establish_secure_connection(contact_id, details)
            .await;
        self.session.finish(BobStatus::Error);
        HandshakeFlags::FAILURE
    }

    async fn token_exists(&self, namespace: TokenNamespace, value: &str) -> bool {
        match self.token_store.exists(namespace, value).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::error!(%namespace, error = %e, "Token lookup failed");
                false
            }
        }
    }

    async fn is_verified_addr(&self, addr: &str) -> bool {
        match self.peerstates.get_by_addr(addr).await {
            Ok(peerstate) => peerstate.is_some_and(|ps| ps.is_verified()),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load peerstate");
                false
            }
        }
    }

    async fn scale_up_origin(&self, contact_id: ContactId, origin: Origin) {
        if let Err(e) = self.contacts.scale_up_origin(contact_id, origin).await {
            tracing::error!(error = %e, ?origin, "Failed to scale up contact origin");
        }
    }

    async fn emit_inviter(&self, contact_id: ContactId, progress: u16) {
        self.events
            .emit(SecureJoinEvent::InviterProgress {
                contact_id,
                progress,
            })
            .await;
    }

    async fn emit_joiner(&self, contact_id: ContactId, progress: u16) {
        self.events
            .emit(SecureJoinEvent::JoinerProgress {
                contact_id,
                progress,
            })
            .await;
    }
}
