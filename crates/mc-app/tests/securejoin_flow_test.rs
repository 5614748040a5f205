//! End-to-end Secure Join runs between two (or three) in-memory accounts.
//!
//! The "wire" is simulated: every delivered message carries the sender's
//! Autocrypt key, and messages that must be end-to-end encrypted arrive
//! encrypted and signed by the sender's key.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use mc_app::{
    SecureJoinConfig, SecureJoinDeps, SecureJoinEvent, SecureJoinEventPort,
    SecureJoinOrchestrator,
};
use mc_core::ports::{ChatError, ChatPort, ContactPort, PeerstateRepositoryPort};
use mc_core::securejoin::{
    Encryption, HeaderMap, HEADER_FINGERPRINT, HEADER_GROUP, HEADER_MEMBER_ADDED,
    HEADER_SECURE_JOIN,
};
use mc_core::{
    BobStatus, Chat, ChatId, ChatKind, ContactId, Fingerprint, HandshakeFlags, HandshakeStep, MessageSecurity,
    Origin, OutgoingHandshake, Peerstate, ReceivedMessage,
};
use mc_infra::memory::{
    ChannelOutbox, InMemoryChats, InMemoryContacts, InMemoryPeerstates, InMemoryTokenStore,
    StaticConnectivity, StaticIdentity,
};

const ALICE_FPR: &str = "A1B2C3D4E5F60718293A4B5C6D7E8F9001122334";
const BOB_FPR: &str = "B0B1B2B3B4B5B6B7B8B9BABBBCBDBEBF00112233";
const CAROL_FPR: &str = "C0C1C2C3C4C5C6C7C8C9CACBCCCDCECF00112233";
const MALLORY_FPR: &str = "0BADF00D0BADF00D0BADF00D0BADF00D0BADF00D";

const HIDDEN_DONE: HandshakeFlags =
    HandshakeFlags::STOP_NORMAL_PROCESSING.union(HandshakeFlags::ADD_DELETE_JOB);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Account {
    addr: &'static str,
    fingerprint: Fingerprint,
    orchestrator: SecureJoinOrchestrator,
    contacts: Arc<InMemoryContacts>,
    chats: Arc<InMemoryChats>,
    peerstates: Arc<InMemoryPeerstates>,
    connectivity: Arc<StaticConnectivity>,
    outbox: Mutex<mpsc::UnboundedReceiver<OutgoingHandshake>>,
}

impl Account {
    fn new(addr: &'static str, name: &str, fpr: &str) -> Self {
        Self::with_config(addr, name, fpr, SecureJoinConfig::default())
    }

    fn with_config(addr: &'static str, name: &str, fpr: &str, config: SecureJoinConfig) -> Self {
        Self::build(addr, name, fpr, config, |chats| chats)
    }

    /// `chat_layer` wraps the in-memory chats handed to the orchestrator.
    fn build(
        addr: &'static str,
        name: &str,
        fpr: &str,
        config: SecureJoinConfig,
        chat_layer: impl FnOnce(Arc<InMemoryChats>) -> Arc<dyn ChatPort>,
    ) -> Self {
        let fingerprint = Fingerprint::normalized(fpr);
        let contacts = Arc::new(InMemoryContacts::new());
        let chats = Arc::new(InMemoryChats::new());
        let peerstates = Arc::new(InMemoryPeerstates::new());
        let connectivity = Arc::new(StaticConnectivity::new(true));
        let (transport, outbox) = ChannelOutbox::new();

        let deps = SecureJoinDeps {
            token_store: Arc::new(InMemoryTokenStore::new()),
            peerstates: peerstates.clone(),
            contacts: contacts.clone(),
            chats: chat_layer(chats.clone()),
            transport: Arc::new(transport),
            identity: Arc::new(StaticIdentity::new(addr, name, fingerprint.clone())),
            connectivity: connectivity.clone(),
        };

        Self {
            addr,
            fingerprint,
            orchestrator: SecureJoinOrchestrator::new(deps, config),
            contacts,
            chats,
            peerstates,
            connectivity,
            outbox: Mutex::new(outbox),
        }
    }

    async fn contact_id(&self, addr: &str) -> ContactId {
        self.contacts
            .add_or_lookup("", addr, Origin::IncomingUnknownFrom)
            .await
            .unwrap()
    }

    async fn single_chat(&self, addr: &str) -> ChatId {
        let contact = self.contact_id(addr).await;
        self.chats.create_or_lookup_single(contact).await.unwrap()
    }

    async fn peerstate(&self, addr: &str) -> Option<Peerstate> {
        self.peerstates.get_by_addr(addr).await.unwrap()
    }

    /// Autocrypt header of a received message.
    async fn learn_key(&self, addr: &str, fingerprint: &Fingerprint) {
        let mut ps = self
            .peerstate(addr)
            .await
            .unwrap_or_else(|| Peerstate::new(addr));
        ps.apply_public_key(fingerprint.clone(), Utc::now());
        self.peerstates.save(&ps).await.unwrap();
    }

    /// Autocrypt-Gossip header of a received message.
    async fn learn_gossip(&self, addr: &str, fingerprint: &Fingerprint) {
        let mut ps = self
            .peerstate(addr)
            .await
            .unwrap_or_else(|| Peerstate::new(addr));
        ps.apply_gossip_key(fingerprint.clone(), Utc::now());
        self.peerstates.save(&ps).await.unwrap();
    }

    async fn try_outgoing(&self) -> Option<OutgoingHandshake> {
        self.outbox.lock().await.try_recv().ok()
    }

    async fn wait_outgoing(&self) -> OutgoingHandshake {
        timeout(Duration::from_secs(2), async {
            loop {
                if let Some(out) = self.try_outgoing().await {
                    return out;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("no outgoing handshake message")
    }
}

/// Delivers `out` from `from` to `to` as the wire would.
async fn deliver(from: &Account, to: &Account, out: &OutgoingHandshake) -> HandshakeFlags {
    let security = match out.encryption {
        Encryption::GuaranteeE2ee => MessageSecurity::encrypted_signed_by(from.fingerprint.clone()),
        Encryption::Plaintext => MessageSecurity::plaintext(),
    };
    deliver_raw(from, to, out.headers(), security, vec![ContactId::SELF]).await
}

async fn deliver_raw(
    from: &Account,
    to: &Account,
    headers: HeaderMap,
    security: MessageSecurity,
    recipients: Vec<ContactId>,
) -> HandshakeFlags {
    to.learn_key(from.addr, &from.fingerprint).await;
    let sender = to.contact_id(from.addr).await;
    let msg = ReceivedMessage {
        headers,
        security,
        recipients,
    };
    to.orchestrator
        .handle_securejoin_handshake(&msg, sender)
        .await
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Delivery {
    step: HandshakeStep,
    to: &'static str,
    flags: HandshakeFlags,
}

/// Other group members whose keys the inviter gossips in member-added.
type Gossip = Vec<(&'static str, Fingerprint)>;

/// Moves every queued message between inviter and joiner once.
async fn pump(alice: &Account, bob: &Account, gossip: &Gossip, log: &mut Vec<Delivery>) {
    while let Some(out) = bob.try_outgoing().await {
        let flags = deliver(bob, alice, &out).await;
        log.push(Delivery {
            step: out.step,
            to: alice.addr,
            flags,
        });
    }
    while let Some(out) = alice.try_outgoing().await {
        let flags = deliver(alice, bob, &out).await;
        log.push(Delivery {
            step: out.step,
            to: bob.addr,
            flags,
        });
    }
    for (group, _contact) in alice.chats.take_handshake_additions() {
        let flags = member_added(alice, bob, group, gossip).await;
        log.push(Delivery {
            step: HandshakeStep::VgMemberAdded,
            to: bob.addr,
            flags,
        });
    }
}

/// The member-added message Alice's chat layer sends after a group join.
async fn member_added(alice: &Account, bob: &Account, group: ChatId, gossip: &Gossip) -> HandshakeFlags {
    let chat = alice.chats.get(group).await.unwrap().unwrap();
    let mut headers = HeaderMap::new();
    headers.insert(HEADER_SECURE_JOIN, HandshakeStep::VgMemberAdded.as_str());
    headers.insert(HEADER_GROUP, chat.grpid.unwrap());
    headers.insert(HEADER_MEMBER_ADDED, bob.addr);

    let mut recipients = vec![ContactId::SELF];
    for (addr, fpr) in gossip {
        bob.learn_gossip(addr, fpr).await;
        recipients.push(bob.contact_id(addr).await);
    }
    let security = MessageSecurity::encrypted_signed_by(alice.fingerprint.clone())
        .with_gossip(gossip.iter().map(|(addr, _)| *addr));

    deliver_raw(alice, bob, headers, security, recipients).await
}

fn spawn_join(bob: &Account, qr: String) -> JoinHandle<Option<ChatId>> {
    let orchestrator = bob.orchestrator.clone();
    tokio::spawn(async move { orchestrator.join_securejoin(&qr).await })
}

/// Pumps messages until the join finishes, then once more for trailing
/// replies.
async fn run_join(
    alice: &Account,
    bob: &Account,
    qr: String,
    gossip: Gossip,
) -> (Option<ChatId>, Vec<Delivery>) {
    let handle = spawn_join(bob, qr);
    let mut log = Vec::new();
    timeout(Duration::from_secs(5), async {
        while !handle.is_finished() {
            pump(alice, bob, &gossip, &mut log).await;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("join did not finish");
    pump(alice, bob, &gossip, &mut log).await;
    (handle.await.unwrap(), log)
}

fn drain(rx: &mut mpsc::Receiver<SecureJoinEvent>) -> Vec<SecureJoinEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn progress(events: &[SecureJoinEvent]) -> Vec<u16> {
    events
        .iter()
        .map(|e| match e {
            SecureJoinEvent::InviterProgress { progress, .. }
            | SecureJoinEvent::JoinerProgress { progress, .. } => *progress,
        })
        .collect()
}

#[tokio::test]
async fn test_contact_verification_full_flow() {
    init_tracing();
    let alice = Account::new("alice@example.org", "Alice", ALICE_FPR);
    let bob = Account::new("bob@example.net", "Bob", BOB_FPR);
    let mut alice_events = alice.orchestrator.subscribe().await.unwrap();
    let mut bob_events = bob.orchestrator.subscribe().await.unwrap();

    let qr = alice.orchestrator.generate_qr(None).await.unwrap();
    let (chat, log) = run_join(&alice, &bob, qr, Vec::new()).await;

    assert_eq!(chat, Some(bob.single_chat(alice.addr).await));
    assert_eq!(
        log,
        vec![
            Delivery {
                step: HandshakeStep::VcRequest,
                to: alice.addr,
                flags: HIDDEN_DONE
            },
            Delivery {
                step: HandshakeStep::VcAuthRequired,
                to: bob.addr,
                flags: HIDDEN_DONE
            },
            Delivery {
                step: HandshakeStep::VcRequestWithAuth,
                to: alice.addr,
                flags: HIDDEN_DONE
            },
            Delivery {
                step: HandshakeStep::VcContactConfirm,
                to: bob.addr,
                flags: HIDDEN_DONE
            },
        ]
    );

    let bob_on_alice = alice.peerstate(bob.addr).await.unwrap();
    assert!(bob_on_alice.is_verified());
    assert_eq!(bob_on_alice.verified_key_fingerprint(), Some(&bob.fingerprint));

    let alice_on_bob = bob.peerstate(alice.addr).await.unwrap();
    assert!(alice_on_bob.is_verified());
    assert_eq!(alice_on_bob.verified_key_fingerprint(), Some(&alice.fingerprint));

    let bob_contact = alice.contact_id(bob.addr).await;
    assert_eq!(
        alice.contacts.get(bob_contact).await.unwrap().unwrap().origin,
        Origin::SecurejoinInvited
    );
    let alice_contact = bob.contact_id(alice.addr).await;
    assert_eq!(
        bob.contacts.get(alice_contact).await.unwrap().unwrap().origin,
        Origin::SecurejoinJoined
    );

    assert_eq!(progress(&drain(&mut alice_events)), vec![300, 600, 1000]);
    assert_eq!(progress(&drain(&mut bob_events)), vec![400]);

    assert_eq!(
        alice.chats.info_messages(alice.single_chat(bob.addr).await),
        vec!["Secure connection to bob@example.net established.".to_string()]
    );
    assert_eq!(
        bob.chats.info_messages(bob.single_chat(alice.addr).await),
        vec!["Secure connection to alice@example.org established.".to_string()]
    );

    // the slot is free and the session is clean again
    let snapshot = bob.orchestrator.session().snapshot().await;
    assert!(snapshot.qr_scan.is_none());
    assert!(!bob.orchestrator.stop_ongoing_process());
}

#[tokio::test]
async fn test_shortcut_records_same_fingerprint() {
    init_tracing();
    let alice = Account::new("alice@example.org", "Alice", ALICE_FPR);
    let bob = Account::new("bob@example.net", "Bob", BOB_FPR);

    // Bob already has Alice's key, e.g. from an earlier mail
    bob.learn_key(alice.addr, &alice.fingerprint).await;

    let qr = alice.orchestrator.generate_qr(None).await.unwrap();
    let (chat, log) = run_join(&alice, &bob, qr, Vec::new()).await;

    assert!(chat.is_some());
    let steps: Vec<HandshakeStep> = log.iter().map(|d| d.step).collect();
    assert_eq!(
        steps,
        vec![
            HandshakeStep::VcRequestWithAuth,
            HandshakeStep::VcContactConfirm
        ]
    );

    let alice_on_bob = bob.peerstate(alice.addr).await.unwrap();
    assert_eq!(alice_on_bob.verified_key_fingerprint(), Some(&alice.fingerprint));
    let bob_on_alice = alice.peerstate(bob.addr).await.unwrap();
    assert_eq!(bob_on_alice.verified_key_fingerprint(), Some(&bob.fingerprint));
}

#[tokio::test]
async fn test_tampered_fingerprint_fails_closed() {
    init_tracing();
    let alice = Account::new("alice@example.org", "Alice", ALICE_FPR);
    let bob = Account::new("bob@example.net", "Bob", BOB_FPR);

    let qr = alice.orchestrator.generate_qr(None).await.unwrap();
    let join = spawn_join(&bob, qr);

    let request = bob.wait_outgoing().await;
    assert_eq!(request.step, HandshakeStep::VcRequest);
    assert_eq!(deliver(&bob, &alice, &request).await, HIDDEN_DONE);

    let auth_required = alice.wait_outgoing().await;
    assert_eq!(deliver(&alice, &bob, &auth_required).await, HIDDEN_DONE);

    let with_auth = bob.wait_outgoing().await;
    assert_eq!(with_auth.step, HandshakeStep::VcRequestWithAuth);

    let mut headers = with_auth.headers();
    headers.insert(HEADER_FINGERPRINT, MALLORY_FPR);
    let flags = deliver_raw(
        &bob,
        &alice,
        headers,
        MessageSecurity::encrypted_signed_by(bob.fingerprint.clone()),
        vec![ContactId::SELF],
    )
    .await;

    assert_eq!(flags, HandshakeFlags::FAILURE);
    assert!(!flags.contains(HandshakeFlags::CONTINUE_NORMAL_PROCESSING));
    assert!(!alice.peerstate(bob.addr).await.unwrap().is_verified());
    assert!(alice.try_outgoing().await.is_none());
    assert_eq!(
        alice.chats.info_messages(alice.single_chat(bob.addr).await),
        vec!["Could not establish secure connection to bob@example.net.".to_string()]
    );

    // Bob never gets a confirmation; cancelling ends his side
    assert!(bob.orchestrator.stop_ongoing_process());
    let result = timeout(Duration::from_secs(2), join).await.unwrap().unwrap();
    assert_eq!(result, None);
}

#[tokio::test]
async fn test_unencrypted_auth_required_ends_join_with_error() {
    init_tracing();
    let alice = Account::new("alice@example.org", "Alice", ALICE_FPR);
    let bob = Account::new("bob@example.net", "Bob", BOB_FPR);

    let qr = alice.orchestrator.generate_qr(None).await.unwrap();
    let join = spawn_join(&bob, qr);

    let request = bob.wait_outgoing().await;
    deliver(&bob, &alice, &request).await;
    let auth_required = alice.wait_outgoing().await;

    let flags = deliver_raw(
        &alice,
        &bob,
        auth_required.headers(),
        MessageSecurity::plaintext(),
        vec![ContactId::SELF],
    )
    .await;
    assert_eq!(flags, HandshakeFlags::FAILURE);

    let result = timeout(Duration::from_secs(2), join).await.unwrap().unwrap();
    assert_eq!(result, None);
    assert!(!bob.peerstate(alice.addr).await.unwrap().is_verified());
    assert!(bob.try_outgoing().await.is_none());
    assert_eq!(
        bob.chats.info_messages(bob.single_chat(alice.addr).await),
        vec!["Could not establish secure connection to alice@example.org.".to_string()]
    );
}

#[tokio::test]
async fn test_group_join_verifies_gossiped_members() {
    init_tracing();
    let alice = Account::new("alice@example.org", "Alice", ALICE_FPR);
    let bob = Account::new("bob@example.net", "Bob", BOB_FPR);
    let carol_fpr = Fingerprint::normalized(CAROL_FPR);

    let group = alice
        .chats
        .create_or_lookup_group("grp-rustaceans", "Rustaceans", ChatKind::VerifiedGroup)
        .await
        .unwrap();
    let carol = alice.contact_id("carol@example.com").await;
    alice.chats.add_contact_to_chat(group, carol, false).await.unwrap();
    let mut alice_events = alice.orchestrator.subscribe().await.unwrap();

    let qr = alice.orchestrator.generate_qr(Some(group)).await.unwrap();
    let (chat, log) = run_join(
        &alice,
        &bob,
        qr,
        vec![("carol@example.com", carol_fpr.clone())],
    )
    .await;

    let chat = chat.expect("joined group");
    let joined = bob.chats.get(chat).await.unwrap().unwrap();
    assert_eq!(joined.kind, ChatKind::VerifiedGroup);
    assert_eq!(joined.name, "Rustaceans");
    assert_eq!(joined.grpid.as_deref(), Some("grp-rustaceans"));

    let steps: Vec<(HandshakeStep, HandshakeFlags)> = log.iter().map(|d| (d.step, d.flags)).collect();
    assert_eq!(
        steps,
        vec![
            (HandshakeStep::VgRequest, HIDDEN_DONE),
            (HandshakeStep::VgAuthRequired, HIDDEN_DONE),
            (HandshakeStep::VgRequestWithAuth, HIDDEN_DONE),
            (
                HandshakeStep::VgMemberAdded,
                HandshakeFlags::CONTINUE_NORMAL_PROCESSING
            ),
            (HandshakeStep::VgMemberAddedReceived, HIDDEN_DONE),
        ]
    );

    let bob_contact = alice.contact_id(bob.addr).await;
    assert!(alice.chats.members(group).contains(&bob_contact));

    let carol_on_bob = bob.peerstate("carol@example.com").await.unwrap();
    assert!(carol_on_bob.is_verified());
    assert_eq!(carol_on_bob.verified_key_fingerprint(), Some(&carol_fpr));

    assert_eq!(progress(&drain(&mut alice_events)), vec![300, 600, 800, 1000]);
}

#[tokio::test]
async fn test_tokens_stay_valid_until_revoked() {
    init_tracing();
    let alice = Account::new("alice@example.org", "Alice", ALICE_FPR);
    let bob = Account::new("bob@example.net", "Bob", BOB_FPR);

    let qr = alice.orchestrator.generate_qr(None).await.unwrap();
    let (chat, log) = run_join(&alice, &bob, qr.clone(), Vec::new()).await;
    assert!(chat.is_some());

    // replaying the opening request still works after success
    let scan = bob.orchestrator.check_qr(&qr).await.unwrap();
    let replay = OutgoingHandshake::new(ChatId::new(1), HandshakeStep::VcRequest)
        .with_invitenumber(scan.invitenumber.unwrap());
    assert_eq!(deliver(&bob, &alice, &replay).await, HIDDEN_DONE);
    assert_eq!(
        alice.try_outgoing().await.map(|o| o.step),
        Some(HandshakeStep::VcAuthRequired)
    );

    alice.orchestrator.revoke_qr_invite(None).await.unwrap();
    assert_eq!(deliver(&bob, &alice, &replay).await, HandshakeFlags::FAILURE);
    assert!(alice.try_outgoing().await.is_none());
    assert_ne!(alice.orchestrator.generate_qr(None).await.unwrap(), qr);
    assert_eq!(log.len(), 4);
}

#[tokio::test]
async fn test_join_requires_connectivity() {
    init_tracing();
    let alice = Account::new("alice@example.org", "Alice", ALICE_FPR);
    let bob = Account::new("bob@example.net", "Bob", BOB_FPR);
    bob.connectivity.set_online(false);

    let qr = alice.orchestrator.generate_qr(None).await.unwrap();
    assert_eq!(bob.orchestrator.join_securejoin(&qr).await, None);
    assert!(bob.try_outgoing().await.is_none());
}

#[tokio::test]
async fn test_join_rejects_non_invite_codes() {
    init_tracing();
    let bob = Account::new("bob@example.net", "Bob", BOB_FPR);

    assert_eq!(bob.orchestrator.join_securejoin("https://example.org").await, None);
    assert_eq!(
        bob.orchestrator
            .join_securejoin(&format!("OPENPGP4FPR:{ALICE_FPR}"))
            .await,
        None
    );
    assert!(bob.try_outgoing().await.is_none());
}

#[tokio::test]
async fn test_second_join_is_refused_while_one_runs() {
    init_tracing();
    let alice = Account::new("alice@example.org", "Alice", ALICE_FPR);
    let bob = Account::new("bob@example.net", "Bob", BOB_FPR);

    let qr = alice.orchestrator.generate_qr(None).await.unwrap();
    let first = spawn_join(&bob, qr.clone());
    bob.wait_outgoing().await;

    assert_eq!(bob.orchestrator.join_securejoin(&qr).await, None);

    assert!(bob.orchestrator.stop_ongoing_process());
    assert_eq!(timeout(Duration::from_secs(2), first).await.unwrap().unwrap(), None);
}

#[tokio::test]
async fn test_join_times_out() {
    init_tracing();
    let alice = Account::new("alice@example.org", "Alice", ALICE_FPR);
    let bob = Account::with_config(
        "bob@example.net",
        "Bob",
        BOB_FPR,
        SecureJoinConfig {
            join_timeout: Some(Duration::from_millis(50)),
        },
    );

    let qr = alice.orchestrator.generate_qr(None).await.unwrap();
    let result = timeout(Duration::from_secs(2), bob.orchestrator.join_securejoin(&qr))
        .await
        .unwrap();
    assert_eq!(result, None);
    assert!(bob.orchestrator.session().snapshot().await.qr_scan.is_none());
}

#[tokio::test]
async fn test_unexpected_steps_are_ignored_without_deletion() {
    init_tracing();
    let alice = Account::new("alice@example.org", "Alice", ALICE_FPR);
    let bob = Account::new("bob@example.net", "Bob", BOB_FPR);

    // Bob is not joining anything
    let stray = OutgoingHandshake::new(ChatId::new(1), HandshakeStep::VcAuthRequired);
    assert_eq!(
        deliver(&alice, &bob, &stray).await,
        HandshakeFlags::STOP_NORMAL_PROCESSING
    );
    let stray = OutgoingHandshake::new(ChatId::new(1), HandshakeStep::VgMemberAdded);
    assert_eq!(
        deliver(&alice, &bob, &stray).await,
        HandshakeFlags::CONTINUE_NORMAL_PROCESSING
    );
    assert!(bob
        .chats
        .info_messages(bob.single_chat(alice.addr).await)
        .is_empty());

    // member-added-received from someone never verified
    let stray = OutgoingHandshake::new(ChatId::new(1), HandshakeStep::VgMemberAddedReceived);
    assert_eq!(deliver(&bob, &alice, &stray).await, HandshakeFlags::FAILURE);
}

#[tokio::test]
async fn test_special_sender_is_rejected() {
    init_tracing();
    let alice = Account::new("alice@example.org", "Alice", ALICE_FPR);

    let mut headers = HeaderMap::new();
    headers.insert(HEADER_SECURE_JOIN, HandshakeStep::VcRequest.as_str());
    let msg = ReceivedMessage {
        headers,
        security: MessageSecurity::plaintext(),
        recipients: vec![],
    };
    assert_eq!(
        alice
            .orchestrator
            .handle_securejoin_handshake(&msg, ContactId::DEVICE)
            .await,
        HandshakeFlags::FAILURE
    );
}

/// Bob scans a contact invite; a group step signed by Alice must not be
/// answered.
#[tokio::test]
async fn test_group_step_under_contact_scan_is_ignored() {
    init_tracing();
    let alice = Account::new("alice@example.org", "Alice", ALICE_FPR);
    let bob = Account::new("bob@example.net", "Bob", BOB_FPR);

    let qr = alice.orchestrator.generate_qr(None).await.unwrap();
    let join = spawn_join(&bob, qr);

    let request = bob.wait_outgoing().await;
    assert_eq!(request.step, HandshakeStep::VcRequest);
    deliver(&bob, &alice, &request).await;
    let auth_required = alice.wait_outgoing().await;
    assert_eq!(auth_required.step, HandshakeStep::VcAuthRequired);

    let mut headers = auth_required.headers();
    headers.insert(HEADER_SECURE_JOIN, HandshakeStep::VgAuthRequired.as_str());
    let flags = deliver_raw(
        &alice,
        &bob,
        headers,
        MessageSecurity::encrypted_signed_by(alice.fingerprint.clone()),
        vec![ContactId::SELF],
    )
    .await;

    assert_eq!(flags, HandshakeFlags::STOP_NORMAL_PROCESSING);
    assert!(!flags.contains(HandshakeFlags::ADD_DELETE_JOB));
    assert!(bob.try_outgoing().await.is_none());
    assert_eq!(bob.orchestrator.session().status(), BobStatus::Undefined);

    // the genuine reply is still accepted
    assert_eq!(deliver(&alice, &bob, &auth_required).await, HIDDEN_DONE);
    assert_eq!(
        bob.wait_outgoing().await.step,
        HandshakeStep::VcRequestWithAuth
    );

    assert!(bob.orchestrator.stop_ongoing_process());
    assert_eq!(timeout(Duration::from_secs(2), join).await.unwrap().unwrap(), None);
}

/// Bob scans a group invite; a contact confirmation or a member-added for
/// another group must not complete the join.
#[tokio::test]
async fn test_mismatched_confirmations_under_group_scan_are_ignored() {
    init_tracing();
    let alice = Account::new("alice@example.org", "Alice", ALICE_FPR);
    let bob = Account::new("bob@example.net", "Bob", BOB_FPR);

    let group = alice
        .chats
        .create_or_lookup_group("grp-rustaceans", "Rustaceans", ChatKind::VerifiedGroup)
        .await
        .unwrap();
    let qr = alice.orchestrator.generate_qr(Some(group)).await.unwrap();
    let join = spawn_join(&bob, qr);

    let request = bob.wait_outgoing().await;
    deliver(&bob, &alice, &request).await;
    let auth_required = alice.wait_outgoing().await;
    deliver(&alice, &bob, &auth_required).await;
    let with_auth = bob.wait_outgoing().await;
    assert_eq!(with_auth.step, HandshakeStep::VgRequestWithAuth);
    assert_eq!(deliver(&bob, &alice, &with_auth).await, HIDDEN_DONE);
    let additions = alice.chats.take_handshake_additions();
    assert_eq!(additions.len(), 1);

    // contact confirmation while Bob joins a group
    let confirm = OutgoingHandshake::new(ChatId::new(1), HandshakeStep::VcContactConfirm)
        .with_fingerprint(bob.fingerprint.clone());
    let flags = deliver(&alice, &bob, &confirm).await;
    assert_eq!(flags, HandshakeFlags::STOP_NORMAL_PROCESSING);
    assert!(bob.try_outgoing().await.is_none());
    assert_ne!(bob.orchestrator.session().status(), BobStatus::Success);
    assert!(!bob.peerstate(alice.addr).await.unwrap().is_verified());

    // member-added naming Bob, but for a different group
    let mut headers = HeaderMap::new();
    headers.insert(HEADER_SECURE_JOIN, HandshakeStep::VgMemberAdded.as_str());
    headers.insert(HEADER_GROUP, "grp-other");
    headers.insert(HEADER_MEMBER_ADDED, bob.addr);
    let flags = deliver_raw(
        &alice,
        &bob,
        headers,
        MessageSecurity::encrypted_signed_by(alice.fingerprint.clone()),
        vec![ContactId::SELF],
    )
    .await;
    assert_eq!(flags, HandshakeFlags::CONTINUE_NORMAL_PROCESSING);
    assert!(bob.try_outgoing().await.is_none());
    assert_ne!(bob.orchestrator.session().status(), BobStatus::Success);
    assert!(bob.chats.get_by_grpid("grp-other").await.unwrap().is_none());
    assert!(bob.chats.get_by_grpid("grp-rustaceans").await.unwrap().is_none());

    // the real member-added still completes the join
    let (group, _) = additions[0];
    assert_eq!(
        member_added(&alice, &bob, group, &Vec::new()).await,
        HandshakeFlags::CONTINUE_NORMAL_PROCESSING
    );
    let joined = timeout(Duration::from_secs(2), join).await.unwrap().unwrap();
    let joined = joined.expect("joined group");
    assert_eq!(
        bob.chats.get(joined).await.unwrap().unwrap().grpid.as_deref(),
        Some("grp-rustaceans")
    );
}

/// Chat layer that cannot create group chats.
struct NoGroupChats(Arc<InMemoryChats>);

#[async_trait]
impl ChatPort for NoGroupChats {
    async fn get(&self, id: ChatId) -> Result<Option<Chat>, ChatError> {
        self.0.get(id).await
    }

    async fn get_by_grpid(&self, grpid: &str) -> Result<Option<Chat>, ChatError> {
        self.0.get_by_grpid(grpid).await
    }

    async fn create_or_lookup_single(&self, contact: ContactId) -> Result<ChatId, ChatError> {
        self.0.create_or_lookup_single(contact).await
    }

    async fn create_or_lookup_group(
        &self,
        _grpid: &str,
        _name: &str,
        _kind: ChatKind,
    ) -> Result<ChatId, ChatError> {
        Err(ChatError::Storage("disk full".to_string()))
    }

    async fn contacts(&self, chat: ChatId) -> Result<Vec<ContactId>, ChatError> {
        self.0.contacts(chat).await
    }

    async fn add_contact_to_chat(
        &self,
        chat: ChatId,
        contact: ContactId,
        from_handshake: bool,
    ) -> Result<(), ChatError> {
        self.0.add_contact_to_chat(chat, contact, from_handshake).await
    }

    async fn add_info_message(&self, chat: ChatId, text: &str) -> Result<(), ChatError> {
        self.0.add_info_message(chat, text).await
    }
}

#[tokio::test]
async fn test_group_creation_failure_ends_join_with_error() {
    init_tracing();
    let alice = Account::new("alice@example.org", "Alice", ALICE_FPR);
    let bob = Account::build(
        "bob@example.net",
        "Bob",
        BOB_FPR,
        SecureJoinConfig::default(),
        |chats| Arc::new(NoGroupChats(chats)),
    );

    let group = alice
        .chats
        .create_or_lookup_group("grp-rustaceans", "Rustaceans", ChatKind::VerifiedGroup)
        .await
        .unwrap();
    let qr = alice.orchestrator.generate_qr(Some(group)).await.unwrap();
    let (chat, log) = run_join(&alice, &bob, qr, Vec::new()).await;

    assert_eq!(chat, None);
    assert_eq!(bob.orchestrator.session().status(), BobStatus::Error);
    // trust was established before the chat layer failed
    assert!(bob.peerstate(alice.addr).await.unwrap().is_verified());
    assert_eq!(
        log.last().map(|d| (d.step, d.flags)),
        Some((
            HandshakeStep::VgMemberAdded,
            HandshakeFlags::CONTINUE_NORMAL_PROCESSING
        ))
    );
}
