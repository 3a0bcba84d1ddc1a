//! # Transceiver Boundary
//!
//! The stack talks to the bus medium through the [`Transceiver`] trait:
//! whole encoded telegrams out, whole raw telegrams in. Medium access,
//! bit timing and retransmission live below this boundary.
//!
//! [`MockTransceiver`] is the in-memory implementation used by the tests
//! and the simulator: it captures every sent telegram and replays
//! injected ones, and two of them can be wired back to back.

use crate::error::KnxError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};

/// Byte-level access to the bus medium.
#[async_trait]
pub trait Transceiver: Send + Sync {
    /// Transmits one encoded telegram.
    async fn send_bytes(&self, frame: &[u8]) -> Result<(), KnxError>;

    /// Receives the next raw telegram, or `None` when the medium is
    /// closed and no further telegrams will arrive.
    async fn recv_bytes(&self) -> Option<Vec<u8>>;
}

/// In-memory transceiver for tests and simulation.
pub struct MockTransceiver {
    sent: Arc<StdMutex<Vec<Vec<u8>>>>,
    inject_tx: mpsc::UnboundedSender<Vec<u8>>,
    inject_rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    peer: StdMutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    fail_sends: StdMutex<bool>,
}

impl MockTransceiver {
    pub fn new() -> Self {
        let (inject_tx, inject_rx) = mpsc::unbounded_channel();
        Self {
            sent: Arc::new(StdMutex::new(Vec::new())),
            inject_tx,
            inject_rx: Mutex::new(inject_rx),
            peer: StdMutex::new(None),
            fail_sends: StdMutex::new(false),
        }
    }

    /// Creates two transceivers wired back to back: what one sends, the
    /// other receives.
    pub fn pair() -> (Arc<Self>, Arc<Self>) {
        let a = Arc::new(Self::new());
        let b = Arc::new(Self::new());
        *a.peer.lock().expect("mock lock poisoned") = Some(b.inject_tx.clone());
        *b.peer.lock().expect("mock lock poisoned") = Some(a.inject_tx.clone());
        (a, b)
    }

    /// Queues a raw telegram for the next `recv_bytes` call.
    pub fn inject(&self, frame: Vec<u8>) {
        let _ = self.inject_tx.send(frame);
    }

    /// Returns every telegram sent so far, oldest first.
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.sent.lock().expect("mock lock poisoned").clone()
    }

    /// Makes every subsequent send fail.
    pub fn fail_sends(&self, fail: bool) {
        *self.fail_sends.lock().expect("mock lock poisoned") = fail;
    }
}

impl Default for MockTransceiver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transceiver for MockTransceiver {
    async fn send_bytes(&self, frame: &[u8]) -> Result<(), KnxError> {
        if *self.fail_sends.lock().expect("mock lock poisoned") {
            return Err(KnxError::Transceiver("simulated send failure".into()));
        }
        self.sent
            .lock()
            .expect("mock lock poisoned")
            .push(frame.to_vec());
        if let Some(peer) = self.peer.lock().expect("mock lock poisoned").as_ref() {
            let _ = peer.send(frame.to_vec());
        }
        Ok(())
    }

    async fn recv_bytes(&self) -> Option<Vec<u8>> {
        self.inject_rx.lock().await.recv().await
    }
}
