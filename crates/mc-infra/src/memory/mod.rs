//! In-memory port implementations
//!
//! Used by tests and by embedders that keep contacts and chats elsewhere and
//! only need the Secure Join bookkeeping. State lives behind `std::sync::Mutex`;
//! no lock is held across an `.await`.

mod chats;
mod connectivity;
mod contacts;
mod identity;
mod outbox;
mod peerstates;
mod token_store;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use chats::InMemoryChats;
pub use connectivity::StaticConnectivity;
pub use contacts::InMemoryContacts;
pub use identity::StaticIdentity;
pub use outbox::ChannelOutbox;
pub use peerstates::InMemoryPeerstates;
pub use token_store::InMemoryTokenStore;

/// A panic in another test thread must not cascade through the shared store.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
