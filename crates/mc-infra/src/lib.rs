//! mailchat infrastructure
//!
//! - [`db`]: Diesel/SQLite adapters for the token store and the peerstates
//! - [`memory`]: in-memory implementations of every port, for embedding and
//!   tests

pub mod db;
pub mod memory;
