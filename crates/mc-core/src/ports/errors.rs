use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum PeerstateRepositoryError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("corrupt peerstate for {addr}: {reason}")]
    Corrupt { addr: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("contact {0} not found")]
    NotFound(crate::ContactId),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat {0} not found")]
    NotFound(crate::ChatId),

    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot queue message: {0}")]
    Queue(String),

    #[error("no key to encrypt to {0}")]
    MissingKey(String),
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("own address is not configured")]
    NotConfigured,

    #[error("key generation failed: {0}")]
    KeyGeneration(String),
}
