use async_trait::async_trait;
use tokio::sync::mpsc;

use mc_core::ports::{HandshakeTransportPort, TransportError};
use mc_core::OutgoingHandshake;

/// Transport that hands every outgoing handshake message to a channel; the
/// receiving end renders and delivers them.
#[derive(Debug, Clone)]
pub struct ChannelOutbox {
    tx: mpsc::UnboundedSender<OutgoingHandshake>,
}

impl ChannelOutbox {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutgoingHandshake>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl HandshakeTransportPort for ChannelOutbox {
    async fn send(&self, message: OutgoingHandshake) -> Result<(), TransportError> {
        tracing::debug!(step = %message.step, chat_id = %message.chat_id, "Queueing handshake message");
        self.tx
            .send(message)
            .map_err(|_| TransportError::Queue("outbox receiver dropped".to_string()))
    }
}
