use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown Secure-Join step `{0}`")]
pub struct UnknownStep(pub String);

/// How an outgoing handshake message must be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encryption {
    /// Sent as-is; only the opening request, the joiner has no key of ours yet
    /// that it can trust.
    Plaintext,
    /// Must be end-to-end encrypted and signed, never downgraded.
    GuaranteeE2ee,
}

/// Value of the `Secure-Join` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandshakeStep {
    VcRequest,
    VcAuthRequired,
    VcRequestWithAuth,
    VcContactConfirm,
    VgRequest,
    VgAuthRequired,
    VgRequestWithAuth,
    VgMemberAdded,
    VgMemberAddedReceived,
}

impl HandshakeStep {
    pub fn as_str(self) -> &'static str {
        match self {
            HandshakeStep::VcRequest => "vc-request",
            HandshakeStep::VcAuthRequired => "vc-auth-required",
            HandshakeStep::VcRequestWithAuth => "vc-request-with-auth",
            HandshakeStep::VcContactConfirm => "vc-contact-confirm",
            HandshakeStep::VgRequest => "vg-request",
            HandshakeStep::VgAuthRequired => "vg-auth-required",
            HandshakeStep::VgRequestWithAuth => "vg-request-with-auth",
            HandshakeStep::VgMemberAdded => "vg-member-added",
            HandshakeStep::VgMemberAddedReceived => "vg-member-added-received",
        }
    }

    /// `vg-*` steps belong to a group join.
    pub fn is_group(self) -> bool {
        matches!(
            self,
            HandshakeStep::VgRequest
                | HandshakeStep::VgAuthRequired
                | HandshakeStep::VgRequestWithAuth
                | HandshakeStep::VgMemberAdded
                | HandshakeStep::VgMemberAddedReceived
        )
    }

    pub fn encryption(self) -> Encryption {
        match self {
            HandshakeStep::VcRequest | HandshakeStep::VgRequest => Encryption::Plaintext,
            _ => Encryption::GuaranteeE2ee,
        }
    }

    pub fn request(group: bool) -> Self {
        if group {
            HandshakeStep::VgRequest
        } else {
            HandshakeStep::VcRequest
        }
    }

    pub fn auth_required(group: bool) -> Self {
        if group {
            HandshakeStep::VgAuthRequired
        } else {
            HandshakeStep::VcAuthRequired
        }
    }

    pub fn request_with_auth(group: bool) -> Self {
        if group {
            HandshakeStep::VgRequestWithAuth
        } else {
            HandshakeStep::VcRequestWithAuth
        }
    }
}

impl std::fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HandshakeStep {
    type Err = UnknownStep;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let step = match s.trim() {
            "vc-request" => HandshakeStep::VcRequest,
            "vc-auth-required" => HandshakeStep::VcAuthRequired,
            "vc-request-with-auth" => HandshakeStep::VcRequestWithAuth,
            "vc-contact-confirm" => HandshakeStep::VcContactConfirm,
            "vg-request" => HandshakeStep::VgRequest,
            "vg-auth-required" => HandshakeStep::VgAuthRequired,
            "vg-request-with-auth" => HandshakeStep::VgRequestWithAuth,
            "vg-member-added" => HandshakeStep::VgMemberAdded,
            "vg-member-added-received" => HandshakeStep::VgMemberAddedReceived,
            other => return Err(UnknownStep(other.to_string())),
        };
        Ok(step)
    }
}
