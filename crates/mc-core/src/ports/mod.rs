//! Port interfaces for the application layer
//!
//! Ports define the contract between the Secure Join use cases and the rest
//! of the messenger: storage, the address book, chats, the outbound mail
//! queue and the own key pair. Implementations live in `mc-infra` or in the
//! embedding application.

mod chat;
mod connectivity;
mod contact;
pub mod errors;
mod identity;
mod peerstate_repository;
mod token_store;
mod transport;

pub use chat::ChatPort;
pub use connectivity::ConnectivityPort;
pub use contact::ContactPort;
pub use errors::{
    ChatError, ContactError, IdentityError, PeerstateRepositoryError, TokenStoreError,
    TransportError,
};
pub use identity::SelfIdentityPort;
pub use peerstate_repository::PeerstateRepositoryPort;
pub use token_store::TokenStorePort;
pub use transport::HandshakeTransportPort;
