//! Handshake messages on the wire and the facts we get about received ones.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::crypto::Fingerprint;
use crate::ids::{ChatId, ContactId};

use super::step::{Encryption, HandshakeStep, UnknownStep};

pub const HEADER_SECURE_JOIN: &str = "Secure-Join";
pub const HEADER_INVITENUMBER: &str = "Secure-Join-Invitenumber";
pub const HEADER_AUTH: &str = "Secure-Join-Auth";
pub const HEADER_FINGERPRINT: &str = "Secure-Join-Fingerprint";
pub const HEADER_GROUP: &str = "Secure-Join-Group";
pub const HEADER_MEMBER_ADDED: &str = "Chat-Group-Member-Added";
pub const HEADER_MEMBER_REMOVED: &str = "Chat-Group-Member-Removed";

/// Mail headers with case-insensitive names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMap(BTreeMap<String, String>);

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in iter {
            map.insert(name.as_ref(), value);
        }
        map
    }
}

/// Security facts about a received message, as reported by the
/// decrypt/verify pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSecurity {
    pub encrypted: bool,
    /// Fingerprints of the keys that produced valid signatures.
    pub signatures: BTreeSet<Fingerprint>,
    /// Addresses whose keys were gossiped in the encrypted part.
    pub gossiped_addrs: BTreeSet<String>,
}

impl MessageSecurity {
    pub fn plaintext() -> Self {
        Self::default()
    }

    pub fn encrypted_signed_by(fingerprint: Fingerprint) -> Self {
        Self {
            encrypted: true,
            signatures: BTreeSet::from([fingerprint]),
            gossiped_addrs: BTreeSet::new(),
        }
    }

    pub fn with_gossip<I, S>(mut self, addrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.gossiped_addrs
            .extend(addrs.into_iter().map(|a| a.as_ref().to_ascii_lowercase()));
        self
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    pub fn is_signed_by(&self, fingerprint: &Fingerprint) -> bool {
        self.signatures.contains(fingerprint)
    }

    pub fn is_gossiped(&self, addr: &str) -> bool {
        self.gossiped_addrs
            .iter()
            .any(|gossiped| gossiped.eq_ignore_ascii_case(addr.trim()))
    }
}

/// An inbound message as handed to the handshake dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedMessage {
    pub headers: HeaderMap,
    pub security: MessageSecurity,
    /// Contacts named in `To:`/`Cc:`.
    pub recipients: Vec<ContactId>,
}

impl ReceivedMessage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Parses the handshake headers; `Ok(None)` when the message carries no
    /// `Secure-Join` header at all.
    pub fn handshake(&self) -> Result<Option<HandshakeMessage>, UnknownStep> {
        HandshakeMessage::from_headers(&self.headers)
    }
}

/// Parsed `Secure-Join*` headers of a received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMessage {
    pub step: HandshakeStep,
    pub invitenumber: Option<String>,
    pub auth: Option<String>,
    /// Raw header value; compared only after normalization.
    pub fingerprint: Option<String>,
    pub group_id: Option<String>,
    pub member_added: Option<String>,
}

impl HandshakeMessage {
    pub fn from_headers(headers: &HeaderMap) -> Result<Option<Self>, UnknownStep> {
        let Some(step) = headers.get(HEADER_SECURE_JOIN) else {
            return Ok(None);
        };
        let owned = |name: &str| {
            headers
                .get(name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Ok(Some(Self {
            step: step.parse()?,
            invitenumber: owned(HEADER_INVITENUMBER),
            auth: owned(HEADER_AUTH),
            fingerprint: owned(HEADER_FINGERPRINT),
            group_id: owned(HEADER_GROUP),
            member_added: owned(HEADER_MEMBER_ADDED),
        }))
    }
}

/// A handshake message to be queued for sending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingHandshake {
    /// 1:1 chat with the peer.
    pub chat_id: ChatId,
    pub step: HandshakeStep,
    pub invitenumber: Option<String>,
    pub auth: Option<String>,
    pub fingerprint: Option<Fingerprint>,
    pub group_id: Option<String>,
    pub encryption: Encryption,
}

impl OutgoingHandshake {
    pub fn new(chat_id: ChatId, step: HandshakeStep) -> Self {
        Self {
            chat_id,
            step,
            invitenumber: None,
            auth: None,
            fingerprint: None,
            group_id: None,
            encryption: step.encryption(),
        }
    }

    pub fn with_invitenumber(mut self, invitenumber: impl Into<String>) -> Self {
        self.invitenumber = Some(invitenumber.into());
        self
    }

    pub fn with_auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    pub fn with_group_id(mut self, group_id: Option<String>) -> Self {
        self.group_id = group_id;
        self
    }

    /// Wire headers for this message.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_SECURE_JOIN, self.step.as_str());
        if let Some(invitenumber) = &self.invitenumber {
            headers.insert(HEADER_INVITENUMBER, invitenumber.as_str());
        }
        if let Some(auth) = &self.auth {
            headers.insert(HEADER_AUTH, auth.as_str());
        }
        if let Some(fingerprint) = &self.fingerprint {
            headers.insert(HEADER_FINGERPRINT, fingerprint.hex());
        }
        if let Some(group_id) = &self.group_id {
            headers.insert(HEADER_GROUP, group_id.as_str());
        }
        headers
    }
}
