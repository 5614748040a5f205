use crate::db::schema::tokens;
use diesel::prelude::*;

#[derive(Debug, Queryable)]
#[diesel(table_name = tokens)]
pub struct TokenRow {
    pub id: i32,
    pub namespace: i32,
    pub foreign_id: i64,
    pub token: String,
    pub created_at: i64,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tokens)]
pub struct NewTokenRow {
    pub namespace: i32,
    pub foreign_id: i64,
    pub token: String,
    pub created_at: i64,
}
