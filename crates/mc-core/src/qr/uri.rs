//! `OPENPGP4FPR:` URI codec.
//!
//! ```text
//! OPENPGP4FPR:<FPR>#a=<addr>&n=<name>&i=<invitenumber>&s=<auth>
//! OPENPGP4FPR:<FPR>#a=<addr>&g=<group name>&x=<grpid>&i=<invitenumber>&s=<auth>
//! ```
//!
//! Names encode spaces as `+`; every other value is percent-encoded.

use std::borrow::Cow;

use crate::contact::may_be_valid_addr;
use crate::crypto::Fingerprint;

use super::QrError;

pub const OPENPGP4FPR_SCHEME: &str = "OPENPGP4FPR:";

/// What an invite code invites to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteTarget {
    Contact { display_name: String },
    Group { name: String, grpid: String },
}

/// Everything needed to render an invite URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteCode {
    pub fingerprint: Fingerprint,
    pub addr: String,
    pub target: InviteTarget,
    pub invitenumber: String,
    pub auth: String,
}

impl InviteCode {
    pub fn to_uri(&self) -> String {
        let addr = urlencoding::encode(&self.addr);
        let target = match &self.target {
            InviteTarget::Contact { display_name } => {
                format!("n={}", encode_name(display_name))
            }
            InviteTarget::Group { name, grpid } => {
                format!("g={}&x={}", encode_name(name), urlencoding::encode(grpid))
            }
        };
        format!(
            "{}{}#a={}&{}&i={}&s={}",
            OPENPGP4FPR_SCHEME,
            self.fingerprint.hex(),
            addr,
            target,
            urlencoding::encode(&self.invitenumber),
            urlencoding::encode(&self.auth),
        )
    }
}

/// Raw content of a scanned `OPENPGP4FPR:` code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQr {
    pub fingerprint: Option<Fingerprint>,
    pub addr: Option<String>,
    pub name: Option<String>,
    pub group_name: Option<String>,
    pub group_id: Option<String>,
    pub invitenumber: Option<String>,
    pub auth: Option<String>,
}

impl ParsedQr {
    /// Parses `text`. The scheme is matched case-insensitively.
    pub fn parse(text: &str) -> Result<Self, QrError> {
        let text = text.trim();
        let payload = strip_scheme(text).ok_or(QrError::UnknownQrCode)?;

        let (fpr_part, fragment) = match payload.split_once('#') {
            Some((fpr, fragment)) => (fpr, Some(fragment)),
            None => (payload, None),
        };

        let mut parsed = ParsedQr {
            fingerprint: Some(Fingerprint::parse(fpr_part)?),
            ..Default::default()
        };

        for pair in fragment.into_iter().flat_map(|f| f.split('&')) {
            if pair.is_empty() {
                continue;
            }
            let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode(key, raw)?;
            if value.is_empty() {
                continue;
            }
            match key {
                "a" => parsed.addr = Some(value),
                "n" => parsed.name = Some(value),
                "g" => parsed.group_name = Some(value),
                "x" => parsed.group_id = Some(value),
                "i" => parsed.invitenumber = Some(value),
                "s" => parsed.auth = Some(value),
                // unknown parameters are ignored, newer versions may add some
                _ => {}
            }
        }

        if let Some(addr) = &parsed.addr {
            if !may_be_valid_addr(addr) {
                return Err(QrError::BadAddress(addr.clone()));
            }
        }

        Ok(parsed)
    }

    /// Carries both secrets needed to start a handshake.
    pub fn has_tokens(&self) -> bool {
        self.invitenumber.is_some() && self.auth.is_some()
    }

    pub fn is_group(&self) -> bool {
        self.group_name.is_some() && self.group_id.is_some()
    }
}

fn strip_scheme(text: &str) -> Option<&str> {
    let prefix = text.get(..OPENPGP4FPR_SCHEME.len())?;
    if prefix.eq_ignore_ascii_case(OPENPGP4FPR_SCHEME) {
        text.get(OPENPGP4FPR_SCHEME.len()..)
    } else {
        None
    }
}

fn encode_name(name: &str) -> String {
    urlencoding::encode(name).replace("%20", "+")
}

/// Names carry spaces as `+`; a literal `+` arrives as `%2B`.
fn decode(key: &str, raw: &str) -> Result<String, QrError> {
    let raw = match key {
        "n" | "g" => Cow::Owned(raw.replace('+', " ")),
        _ => Cow::Borrowed(raw),
    };
    urlencoding::decode(&raw)
        .map(|v| v.into_owned())
        .map_err(|_| QrError::MalformedParameter(key.to_string()))
}
