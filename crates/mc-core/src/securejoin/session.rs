//! Joiner-side handshake state shared between the join driver and the
//! inbound dispatcher of the same account.
//!
//! The driver publishes the scanned code and then waits on the status
//! channel; the dispatcher reads the scan, moves `expects` forward and
//! finally publishes a terminal [`BobStatus`].

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};

use crate::qr::QrScanResult;

/// Which reply the joiner waits for next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BobExpects {
    Nothing,
    AuthRequired,
    ContactConfirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BobStatus {
    Undefined,
    Success,
    Error,
}

impl BobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, BobStatus::Undefined)
    }
}

/// Copy of the joiner state taken under the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BobSnapshot {
    pub expects: BobExpects,
    pub qr_scan: Option<QrScanResult>,
}

#[derive(Debug)]
struct BobState {
    expects: BobExpects,
    qr_scan: Option<QrScanResult>,
}

#[derive(Debug)]
pub struct HandshakeSession {
    state: Mutex<BobState>,
    status: watch::Sender<BobStatus>,
}

impl Default for HandshakeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl HandshakeSession {
    pub fn new() -> Self {
        let (status, _) = watch::channel(BobStatus::Undefined);
        Self {
            state: Mutex::new(BobState {
                expects: BobExpects::Nothing,
                qr_scan: None,
            }),
            status,
        }
    }

    /// Publishes a fresh scan and resets status and expectation.
    pub async fn begin(&self, scan: QrScanResult) {
        let mut state = self.state.lock().await;
        state.qr_scan = Some(scan);
        state.expects = BobExpects::Nothing;
        self.status.send_replace(BobStatus::Undefined);
    }

    pub async fn set_expects(&self, expects: BobExpects) {
        self.state.lock().await.expects = expects;
    }

    /// Moves `expects` from `from` to `to`; returns `false` if the current
    /// expectation is something else.
    pub async fn advance(&self, from: BobExpects, to: BobExpects) -> bool {
        let mut state = self.state.lock().await;
        if state.expects != from {
            return false;
        }
        state.expects = to;
        true
    }

    pub async fn snapshot(&self) -> BobSnapshot {
        let state = self.state.lock().await;
        BobSnapshot {
            expects: state.expects,
            qr_scan: state.qr_scan.clone(),
        }
    }

    /// Drops the scan and the expectation; the status is left for the
    /// driver to read.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.qr_scan = None;
        state.expects = BobExpects::Nothing;
    }

    pub fn finish(&self, status: BobStatus) {
        self.status.send_replace(status);
    }

    pub fn status(&self) -> BobStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<BobStatus> {
        self.status.subscribe()
    }
}
