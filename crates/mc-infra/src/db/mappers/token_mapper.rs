use crate::db::models::{NewTokenRow, TokenRow};
use crate::db::ports::{InsertMapper, RowMapper};
use anyhow::{anyhow, Result};
use chrono::{TimeZone, Utc};
use mc_core::{Token, TokenNamespace};

pub struct TokenRowMapper;

impl InsertMapper<Token, NewTokenRow> for TokenRowMapper {
    fn to_row(&self, domain: &Token) -> Result<NewTokenRow> {
        Ok(NewTokenRow {
            namespace: domain.namespace.code(),
            foreign_id: i64::from(domain.foreign_id),
            token: domain.value.clone(),
            created_at: domain.created_at.timestamp(),
        })
    }
}

impl RowMapper<TokenRow, Token> for TokenRowMapper {
    fn to_domain(&self, row: &TokenRow) -> Result<Token> {
        let namespace = TokenNamespace::from_code(row.namespace)
            .ok_or_else(|| anyhow!("invalid token namespace: {}", row.namespace))?;
        let foreign_id = u32::try_from(row.foreign_id)
            .map_err(|_| anyhow!("invalid token foreign_id: {}", row.foreign_id))?;
        let created_at = Utc
            .timestamp_opt(row.created_at, 0)
            .single()
            .ok_or_else(|| anyhow!("invalid created_at timestamp: {}", row.created_at))?;

        Ok(Token {
            namespace,
            foreign_id,
            value: row.token.clone(),
            created_at,
        })
    }
}
