use crate::db::schema::acpeerstates;
use diesel::prelude::*;

#[derive(Debug, Queryable)]
#[diesel(table_name = acpeerstates)]
pub struct PeerstateRow {
    pub id: i32,
    pub addr: String,
    pub last_seen: Option<i64>,
    pub prefer_encrypted: i32,
    pub public_key_fingerprint: Option<String>,
    pub gossip_key_fingerprint: Option<String>,
    pub verified_key_fingerprint: Option<String>,
    pub verified: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = acpeerstates)]
pub struct NewPeerstateRow {
    pub addr: String,
    pub last_seen: Option<i64>,
    pub prefer_encrypted: i32,
    pub public_key_fingerprint: Option<String>,
    pub gossip_key_fingerprint: Option<String>,
    pub verified_key_fingerprint: Option<String>,
    pub verified: i32,
}
