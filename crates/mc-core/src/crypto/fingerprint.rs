//! OpenPGP key fingerprints
//!
//! 这个模块提供了密钥指纹的规范化、解析和展示功能。
//!
//! # Normalization / 规范化
//!
//! Fingerprints reach us from QR codes, mail headers and the key store, each
//! with its own spelling (lower case, spaces, colons). They are compared only
//! after normalization:
//!
//! ```text
//! "abcd 1234 ..."  ->  keep [0-9A-Fa-f]  ->  upper case  ->  "ABCD1234..."
//! ```
//!
//! A V4 OpenPGP fingerprint is 20 bytes, i.e. 40 hex digits.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 指纹错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    /// 无效的指纹长度
    #[error("Invalid fingerprint length: expected {expected} hex digits, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// 空指纹
    #[error("Empty fingerprint")]
    Empty,
}

/// Normalized fingerprint (upper-case hex, no separators).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hex digits of a V4 fingerprint.
    pub const HEX_LEN: usize = 40;

    /// 分组大小(字符数)
    const GROUP_SIZE: usize = 4;

    /// Normalizes `raw` without checking its length.
    ///
    /// Used for values that already come from a trusted source (the key
    /// store); untrusted input goes through [`Fingerprint::parse`].
    pub fn normalized(raw: &str) -> Self {
        Self(normalize(raw))
    }

    /// Parses and validates a fingerprint coming from a QR code or a header.
    pub fn parse(raw: &str) -> Result<Self, FingerprintError> {
        let hex = normalize(raw);
        if hex.is_empty() {
            return Err(FingerprintError::Empty);
        }
        if hex.len() != Self::HEX_LEN {
            return Err(FingerprintError::InvalidLength {
                expected: Self::HEX_LEN,
                actual: hex.len(),
            });
        }
        Ok(Self(hex))
    }

    pub fn hex(&self) -> &str {
        &self.0
    }

    /// Case- and separator-insensitive comparison against an arbitrary string.
    pub fn matches(&self, other: &str) -> bool {
        !self.0.is_empty() && self.0 == normalize(other)
    }

    /// 格式化为分组显示: `ABCD 1234 ...`
    pub fn to_display_groups(&self) -> String {
        self.0
            .as_bytes()
            .chunks(Self::GROUP_SIZE)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_hexdigit)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
