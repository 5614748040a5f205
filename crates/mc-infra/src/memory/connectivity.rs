use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use mc_core::ports::ConnectivityPort;

/// Connectivity flag flipped by the embedder.
#[derive(Debug)]
pub struct StaticConnectivity {
    online: AtomicBool,
}

impl StaticConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }
}

#[async_trait]
impl ConnectivityPort for StaticConnectivity {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }
}
