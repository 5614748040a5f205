use async_trait::async_trait;

use crate::securejoin::OutgoingHandshake;

use super::errors::TransportError;

/// Outbound side of the handshake.
///
/// `send` only queues the message; rendering, encryption and delivery happen
/// behind the port. A message with [`Encryption::GuaranteeE2ee`] must never be
/// sent unencrypted.
///
/// [`Encryption::GuaranteeE2ee`]: crate::securejoin::Encryption::GuaranteeE2ee
#[async_trait]
pub trait HandshakeTransportPort: Send + Sync {
    async fn send(&self, message: OutgoingHandshake) -> Result<(), TransportError>;
}
