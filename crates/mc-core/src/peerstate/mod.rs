//! Per-contact key and trust state
//!
//! A [`Peerstate`] tracks which keys we have seen for an address (from
//! Autocrypt headers and from gossip inside other people's encrypted mails)
//! and which of them, if any, we have verified.
//!
//! # Invariants / 不变量
//!
//! - Trust is changed only through [`Peerstate::promote_to_verified`].
//! - The verification level never goes down.
//! - A key is verified only if its fingerprint is the one currently on file for
//!   that key slot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::Fingerprint;

/// 验证级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VerificationLevel {
    Unverified,
    /// Both sides scanned/verified each other (Secure Join completed).
    BidirectVerified,
}

impl VerificationLevel {
    pub fn code(self) -> i32 {
        match self {
            VerificationLevel::Unverified => 0,
            VerificationLevel::BidirectVerified => 2,
        }
    }

    pub fn from_code(code: i32) -> Self {
        if code >= 2 {
            VerificationLevel::BidirectVerified
        } else {
            VerificationLevel::Unverified
        }
    }
}

/// Autocrypt `prefer-encrypt` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptPreference {
    NoPreference,
    Mutual,
    Reset,
}

impl EncryptPreference {
    pub fn code(self) -> i32 {
        match self {
            EncryptPreference::NoPreference => 0,
            EncryptPreference::Mutual => 1,
            EncryptPreference::Reset => 20,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => EncryptPreference::Mutual,
            20 => EncryptPreference::Reset,
            _ => EncryptPreference::NoPreference,
        }
    }
}

/// Which key slot of a peerstate a verification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerKey {
    /// Key from the peer's own Autocrypt header.
    Public,
    /// Key gossiped by a third party.
    Gossip,
}

/// Plain persistence shape of a peerstate.
///
/// Repositories convert rows into this record and back; the domain object is
/// rebuilt with [`Peerstate::from_record`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerstateRecord {
    pub addr: String,
    pub last_seen: Option<DateTime<Utc>>,
    pub prefer_encrypt: EncryptPreference,
    pub public_key_fingerprint: Option<Fingerprint>,
    pub gossip_key_fingerprint: Option<Fingerprint>,
    pub verified_key_fingerprint: Option<Fingerprint>,
    pub verification: VerificationLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peerstate {
    addr: String,
    last_seen: Option<DateTime<Utc>>,
    prefer_encrypt: EncryptPreference,
    public_key_fingerprint: Option<Fingerprint>,
    gossip_key_fingerprint: Option<Fingerprint>,
    verified_key_fingerprint: Option<Fingerprint>,
    verification: VerificationLevel,
}

impl Peerstate {
    /// Fresh, unverified peerstate for `addr`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            last_seen: None,
            prefer_encrypt: EncryptPreference::NoPreference,
            public_key_fingerprint: None,
            gossip_key_fingerprint: None,
            verified_key_fingerprint: None,
            verification: VerificationLevel::Unverified,
        }
    }

    pub fn from_record(record: PeerstateRecord) -> Self {
        Self {
            addr: record.addr,
            last_seen: record.last_seen,
            prefer_encrypt: record.prefer_encrypt,
            public_key_fingerprint: record.public_key_fingerprint,
            gossip_key_fingerprint: record.gossip_key_fingerprint,
            verified_key_fingerprint: record.verified_key_fingerprint,
            verification: record.verification,
        }
    }

    pub fn to_record(&self) -> PeerstateRecord {
        PeerstateRecord {
            addr: self.addr.clone(),
            last_seen: self.last_seen,
            prefer_encrypt: self.prefer_encrypt,
            public_key_fingerprint: self.public_key_fingerprint.clone(),
            gossip_key_fingerprint: self.gossip_key_fingerprint.clone(),
            verified_key_fingerprint: self.verified_key_fingerprint.clone(),
            verification: self.verification,
        }
    }

    /// Records the key seen in the peer's own Autocrypt header.
    pub fn apply_public_key(&mut self, fingerprint: Fingerprint, seen_at: DateTime<Utc>) {
        self.public_key_fingerprint = Some(fingerprint);
        self.last_seen = Some(seen_at);
    }

    /// Records a key gossiped for this peer by someone else.
    pub fn apply_gossip_key(&mut self, fingerprint: Fingerprint, seen_at: DateTime<Utc>) {
        self.gossip_key_fingerprint = Some(fingerprint);
        self.last_seen = Some(seen_at);
    }

    pub fn set_prefer_encrypt(&mut self, preference: EncryptPreference) {
        self.prefer_encrypt = preference;
    }

    /// Marks the key in slot `key` as verified, provided its fingerprint is
    /// `fingerprint`.
    ///
    /// Returns `false` (and changes nothing) when the slot is empty or holds a
    /// different key.
    pub fn promote_to_verified(&mut self, key: PeerKey, fingerprint: &Fingerprint) -> bool {
        let current = match key {
            PeerKey::Public => self.public_key_fingerprint.as_ref(),
            PeerKey::Gossip => self.gossip_key_fingerprint.as_ref(),
        };
        if current != Some(fingerprint) {
            return false;
        }
        self.verified_key_fingerprint = Some(fingerprint.clone());
        self.verification = self.verification.max(VerificationLevel::BidirectVerified);
        true
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_seen
    }

    pub fn prefer_encrypt(&self) -> EncryptPreference {
        self.prefer_encrypt
    }

    pub fn public_key_fingerprint(&self) -> Option<&Fingerprint> {
        self.public_key_fingerprint.as_ref()
    }

    pub fn gossip_key_fingerprint(&self) -> Option<&Fingerprint> {
        self.gossip_key_fingerprint.as_ref()
    }

    pub fn verified_key_fingerprint(&self) -> Option<&Fingerprint> {
        self.verified_key_fingerprint.as_ref()
    }

    pub fn verification(&self) -> VerificationLevel {
        self.verification
    }

    /// Verified with a key that is still known for this peer.
    pub fn is_verified(&self) -> bool {
        self.verification >= VerificationLevel::BidirectVerified
            && self.verified_key_fingerprint.is_some()
    }

    /// True if any key slot holds `fingerprint`.
    pub fn has_fingerprint(&self, fingerprint: &Fingerprint) -> bool {
        [
            &self.public_key_fingerprint,
            &self.gossip_key_fingerprint,
            &self.verified_key_fingerprint,
        ]
        .into_iter()
        .any(|slot| slot.as_ref() == Some(fingerprint))
    }
}
