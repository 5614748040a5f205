//! Verified-group consistency guard.
//!
//! A message to a verified group is accepted only if its sender is verified,
//! it is encrypted and signed with the sender's verified key, and every
//! recipient is verified. Recipients whose keys are gossiped in the message
//! by a verified sender become verified through that gossip.

use std::sync::Arc;

use mc_core::ports::{ContactPort, PeerstateRepositoryPort};
use mc_core::securejoin::VerificationFailure;
use mc_core::{ContactId, MessageSecurity, PeerKey};

#[derive(Clone)]
pub struct VerifiedGroupGuard {
    contacts: Arc<dyn ContactPort>,
    peerstates: Arc<dyn PeerstateRepositoryPort>,
}

impl VerifiedGroupGuard {
    pub fn new(contacts: Arc<dyn ContactPort>, peerstates: Arc<dyn PeerstateRepositoryPort>) -> Self {
        Self {
            contacts,
            peerstates,
        }
    }

    /// Sender membership in the group is the caller's concern.
    pub async fn check_verified_properties(
        &self,
        from_id: ContactId,
        security: &MessageSecurity,
        recipients: &[ContactId],
    ) -> Result<(), VerificationFailure> {
        let sender = self
            .contacts
            .get(from_id)
            .await
            .map_err(|e| VerificationFailure::Storage(e.to_string()))?
            .ok_or(VerificationFailure::SenderNotVerified)?;

        let sender_state = self
            .peerstates
            .get_by_addr(&sender.addr)
            .await
            .map_err(|e| VerificationFailure::Storage(e.to_string()))?
            .filter(|ps| ps.is_verified())
            .ok_or(VerificationFailure::SenderNotVerified)?;

        if !security.encrypted {
            return Err(VerificationFailure::NotEncrypted);
        }
        if !security.is_signed() {
            return Err(VerificationFailure::NotSigned);
        }
        let signed_by_verified_key = sender_state
            .verified_key_fingerprint()
            .is_some_and(|fpr| security.is_signed_by(fpr));
        if !signed_by_verified_key {
            return Err(VerificationFailure::WrongSigningKey);
        }

        for recipient in recipients.iter().filter(|id| !id.is_special()) {
            self.check_recipient(*recipient, security).await?;
        }

        Ok(())
    }

    async fn check_recipient(
        &self,
        recipient: ContactId,
        security: &MessageSecurity,
    ) -> Result<(), VerificationFailure> {
        let contact = self
            .contacts
            .get(recipient)
            .await
            .map_err(|e| VerificationFailure::Storage(e.to_string()))?
            .ok_or_else(|| VerificationFailure::RecipientNotVerified(recipient.to_string()))?;

        let peerstate = self
            .peerstates
            .get_by_addr(&contact.addr)
            .await
            .map_err(|e| VerificationFailure::Storage(e.to_string()))?;

        let mut is_verified = peerstate.as_ref().is_some_and(|ps| ps.is_verified());

        if let Some(mut peerstate) = peerstate.filter(|_| security.is_gossiped(&contact.addr)) {
            let verified_key_is_current = peerstate.verified_key_fingerprint().is_some_and(|v| {
                Some(v) == peerstate.public_key_fingerprint()
                    || Some(v) == peerstate.gossip_key_fingerprint()
            });

            if !is_verified || !verified_key_is_current {
                if let Some(gossip) = peerstate.gossip_key_fingerprint().cloned() {
                    tracing::info!(addr = %contact.addr, "Marking gossiped key as verified");
                    if peerstate.promote_to_verified(PeerKey::Gossip, &gossip) {
                        self.peerstates
                            .save(&peerstate)
                            .await
                            .map_err(|e| VerificationFailure::Storage(e.to_string()))?;
                        is_verified = true;
                    }
                }
            }
        }

        if !is_verified {
            return Err(VerificationFailure::RecipientNotVerified(contact.addr));
        }
        Ok(())
    }
}
