//! Verification primitives shared by the handshake steps.

use std::sync::Arc;

use mc_core::ports::{ChatPort, ContactPort, PeerstateRepositoryPort};
use mc_core::{ChatId, ContactId, EncryptPreference, Fingerprint, MessageSecurity, PeerKey};

/// Encrypted, validly signed, and signed by `expected`.
pub fn encrypted_and_signed(security: &MessageSecurity, expected: &Fingerprint) -> bool {
    if !security.encrypted {
        tracing::warn!("Message not encrypted.");
        false
    } else if !security.is_signed() {
        tracing::warn!("Message not signed.");
        false
    } else if !security.is_signed_by(expected) {
        tracing::warn!(expected = %expected, "Message does not match expected fingerprint.");
        false
    } else {
        true
    }
}

/// Trust decisions that need the address book and the peerstates.
#[derive(Clone)]
pub struct TrustVerifier {
    peerstates: Arc<dyn PeerstateRepositoryPort>,
    contacts: Arc<dyn ContactPort>,
    chats: Arc<dyn ChatPort>,
}

impl TrustVerifier {
    pub fn new(
        peerstates: Arc<dyn PeerstateRepositoryPort>,
        contacts: Arc<dyn ContactPort>,
        chats: Arc<dyn ChatPort>,
    ) -> Self {
        Self {
            peerstates,
            contacts,
            chats,
        }
    }

    /// The 1:1 chat `chat_id` has exactly one member and that member's current
    /// public key has fingerprint `fingerprint`.
    pub async fn fingerprint_equals_sender(&self, fingerprint: &Fingerprint, chat_id: ChatId) -> bool {
        let members = match self.chats.contacts(chat_id).await {
            Ok(members) => members,
            Err(e) => {
                tracing::error!(chat_id = %chat_id, error = %e, "Failed to load chat members");
                return false;
            }
        };
        let [contact_id] = members.as_slice() else {
            return false;
        };

        let contact = match self.contacts.get(*contact_id).await {
            Ok(Some(contact)) => contact,
            Ok(None) => return false,
            Err(e) => {
                tracing::error!(contact_id = %contact_id, error = %e, "Failed to load contact");
                return false;
            }
        };

        match self.peerstates.get_by_addr(&contact.addr).await {
            Ok(Some(peerstate)) => peerstate.public_key_fingerprint() == Some(fingerprint),
            Ok(None) => false,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load peerstate");
                false
            }
        }
    }

    /// Promotes the public key with `fingerprint` to verified and prefers
    /// encryption from now on. `false` if no peerstate holds that key.
    pub async fn mark_peer_as_verified(&self, fingerprint: &Fingerprint) -> bool {
        let mut peerstate = match self.peerstates.get_by_fingerprint(fingerprint).await {
            Ok(Some(peerstate)) => peerstate,
            Ok(None) => return false,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load peerstate");
                return false;
            }
        };

        if !peerstate.promote_to_verified(PeerKey::Public, fingerprint) {
            return false;
        }
        peerstate.set_prefer_encrypt(EncryptPreference::Mutual);

        match self.peerstates.save(&peerstate).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(addr = %peerstate.addr(), error = %e, "Failed to save peerstate");
                false
            }
        }
    }

    /// Logs `details` and leaves a device message in the 1:1 chat.
    pub async fn could_not_establish_secure_connection(&self, contact_id: ContactId, details: &str) {
        let addr = self.contact_addr(contact_id).await;
        tracing::error!(contact_id = %contact_id, "{details} ({addr})");
        self.add_info(
            contact_id,
            &format!("Could not establish secure connection to {addr}."),
        )
        .await;
    }

    pub async fn secure_connection_established(&self, contact_id: ContactId) {
        let addr = self.contact_addr(contact_id).await;
        self.add_info(contact_id, &format!("Secure connection to {addr} established."))
            .await;
    }

    async fn contact_addr(&self, contact_id: ContactId) -> String {
        match self.contacts.get(contact_id).await {
            Ok(Some(contact)) => contact.addr,
            _ => "?".to_string(),
        }
    }

    async fn add_info(&self, contact_id: ContactId, text: &str) {
        let result = match self.chats.create_or_lookup_single(contact_id).await {
            Ok(chat_id) => self.chats.add_info_message(chat_id, text).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::error!(contact_id = %contact_id, error = %e, "Failed to add info message");
        }
    }
}
