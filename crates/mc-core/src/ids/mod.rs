//! ID type wrappers for type safety.

mod id_macro;

pub mod chat_id;
pub mod contact_id;

pub use chat_id::ChatId;
pub use contact_id::ContactId;
