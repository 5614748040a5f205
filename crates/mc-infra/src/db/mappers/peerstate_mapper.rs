use crate::db::models::{NewPeerstateRow, PeerstateRow};
use crate::db::ports::{InsertMapper, RowMapper};
use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use mc_core::peerstate::PeerstateRecord;
use mc_core::{EncryptPreference, Fingerprint, Peerstate, VerificationLevel};

pub struct PeerstateRowMapper;

impl InsertMapper<Peerstate, NewPeerstateRow> for PeerstateRowMapper {
    fn to_row(&self, domain: &Peerstate) -> Result<NewPeerstateRow> {
        let record = domain.to_record();
        Ok(NewPeerstateRow {
            addr: record.addr,
            last_seen: record.last_seen.map(|dt| dt.timestamp()),
            prefer_encrypted: record.prefer_encrypt.code(),
            public_key_fingerprint: record.public_key_fingerprint.map(|f| f.hex().to_string()),
            gossip_key_fingerprint: record.gossip_key_fingerprint.map(|f| f.hex().to_string()),
            verified_key_fingerprint: record
                .verified_key_fingerprint
                .map(|f| f.hex().to_string()),
            verified: record.verification.code(),
        })
    }
}

impl RowMapper<PeerstateRow, Peerstate> for PeerstateRowMapper {
    fn to_domain(&self, row: &PeerstateRow) -> Result<Peerstate> {
        let last_seen = match row.last_seen {
            Some(ts) => Some(timestamp_to_utc(ts, "last_seen")?),
            None => None,
        };

        Ok(Peerstate::from_record(PeerstateRecord {
            addr: row.addr.clone(),
            last_seen,
            prefer_encrypt: EncryptPreference::from_code(row.prefer_encrypted),
            public_key_fingerprint: fingerprint(&row.public_key_fingerprint),
            gossip_key_fingerprint: fingerprint(&row.gossip_key_fingerprint),
            verified_key_fingerprint: fingerprint(&row.verified_key_fingerprint),
            verification: VerificationLevel::from_code(row.verified),
        }))
    }
}

/// Empty strings are stored by older rows for "no key".
fn fingerprint(value: &Option<String>) -> Option<Fingerprint> {
    value
        .as_deref()
        .map(Fingerprint::normalized)
        .filter(|f| !f.hex().is_empty())
}

fn timestamp_to_utc(ts: i64, field: &str) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0)
        .single()
        .ok_or_else(|| anyhow!("invalid {} timestamp: {}", field, ts))
}
