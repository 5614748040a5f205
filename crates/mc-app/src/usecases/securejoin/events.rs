use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use mc_core::ContactId;

/// Progress of a running handshake, in permille.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureJoinEvent {
    InviterProgress { contact_id: ContactId, progress: u16 },
    JoinerProgress { contact_id: ContactId, progress: u16 },
}

#[async_trait]
pub trait SecureJoinEventPort: Send + Sync {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<SecureJoinEvent>>;
}

/// Fan-out of [`SecureJoinEvent`]s to every subscriber.
#[derive(Clone, Default)]
pub struct EventHub {
    senders: Arc<Mutex<Vec<mpsc::Sender<SecureJoinEvent>>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self) -> mpsc::Receiver<SecureJoinEvent> {
        let (event_tx, event_rx) = mpsc::channel(100);
        self.senders.lock().await.push(event_tx);
        event_rx
    }

    /// Never waits for slow subscribers: the dispatcher calling this runs
    /// inline on the inbound worker.
    pub async fn emit(&self, event: SecureJoinEvent) {
        let mut senders = self.senders.lock().await;
        senders.retain(|sender| match sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(?event, "Secure-join event subscriber lagging, event dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Secure-join event receiver dropped");
                false
            }
        });
    }
}
