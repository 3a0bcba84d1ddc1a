//! # Stack Composition
//!
//! [`KnxStack`] wires the layers together for one device: the group data
//! service on top, the priority queue between it and the link layer, and
//! a [`Transceiver`] at the bottom.
//!
//! Two tasks run per started stack. The send task drains the priority
//! queue, encodes each frame and hands it to the transceiver. The receive
//! task decodes raw telegrams, walks them up through the network and
//! transport layers and delivers group APDUs to the service. Every
//! inbound error is logged and the telegram dropped; inbound traffic can
//! never crash the stack.

use crate::addressing::{IndividualAddress, KnxAddress};
use crate::dpt::{DptRegistry, DptValue};
use crate::error::KnxError;
use crate::group::service::{GroupDataService, ValueChange};
use crate::layers::link::{decode_frame, encode_frame};
use crate::layers::transport::{TransportLayer, TransportVerdict};
use crate::logging::{log_debug, log_info, log_warn};
use crate::queue::FramePriorityQueue;
use crate::transceiver::Transceiver;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Inactivity window after which a connected peer's sequence state is
/// forgotten.
const TRANSPORT_INACTIVITY_WINDOW: Duration = Duration::from_secs(6);

/// One KNX device: datapoints, bindings and the frame pipeline.
pub struct KnxStack {
    address: IndividualAddress,
    queue: Arc<FramePriorityQueue>,
    service: Arc<GroupDataService>,
    transceiver: Arc<dyn Transceiver>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl KnxStack {
    pub fn new(
        address: IndividualAddress,
        registry: Arc<DptRegistry>,
        transceiver: Arc<dyn Transceiver>,
    ) -> Self {
        let queue = Arc::new(FramePriorityQueue::new());
        let service = Arc::new(GroupDataService::new(
            address,
            registry,
            Arc::clone(&queue),
        ));
        let (shutdown, _) = watch::channel(false);
        Self {
            address,
            queue,
            service,
            transceiver,
            shutdown,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn address(&self) -> IndividualAddress {
        self.address
    }

    /// The group data service, for datapoint and binding setup.
    pub fn service(&self) -> &Arc<GroupDataService> {
        &self.service
    }

    /// Spawns the send and receive tasks. Idempotent only in the sense
    /// that calling it twice spawns duplicate tasks; call it once.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock().expect("stack lock poisoned");
        tasks.push(tokio::spawn(send_loop(
            Arc::clone(&self.queue),
            Arc::clone(&self.transceiver),
        )));
        tasks.push(tokio::spawn(receive_loop(
            Arc::clone(&self.transceiver),
            Arc::clone(&self.service),
            self.shutdown.subscribe(),
        )));
        log_info(&format!("Stack {} started", self.address));
    }

    /// Stops both tasks. The queue drains before the send task exits.
    pub async fn stop(&self) {
        self.queue.close();
        let _ = self.shutdown.send(true);
        let tasks: Vec<JoinHandle<()>> =
            std::mem::take(&mut *self.tasks.lock().expect("stack lock poisoned"));
        for task in tasks {
            let _ = task.await;
        }
        log_info(&format!("Stack {} stopped", self.address));
    }

    /// Writes a local output datapoint, transmitting per its bindings.
    pub fn write(&self, name: &str, value: DptValue) -> Result<(), KnxError> {
        self.service.write_datapoint(name, value)
    }

    /// Requests the group value behind a datapoint's binding.
    pub fn read(&self, name: &str) -> Result<(), KnxError> {
        self.service.read_datapoint(name)
    }

    /// Current local value of a datapoint.
    pub fn value(&self, name: &str) -> Result<Option<DptValue>, KnxError> {
        self.service.value(name)
    }

    /// Registers a change listener, optionally filtered to one datapoint.
    pub fn on_change<F>(&self, datapoint: Option<String>, listener: F)
    where
        F: Fn(&ValueChange) + Send + Sync + 'static,
    {
        self.service.on_change(datapoint, listener);
    }
}

async fn send_loop(queue: Arc<FramePriorityQueue>, transceiver: Arc<dyn Transceiver>) {
    while let Some(frame) = queue.dequeue().await {
        let bytes = match encode_frame(&frame) {
            Ok(b) => b,
            Err(e) => {
                log_warn(&format!("Dropping unencodable outbound frame: {e}"));
                continue;
            }
        };
        log_debug(&format!(
            "TX {} -> {}: {}",
            frame.npdu.source,
            frame.npdu.destination,
            hex::encode(&bytes)
        ));
        if let Err(e) = transceiver.send_bytes(&bytes).await {
            log_warn(&format!("Transceiver send failed: {e}"));
        }
    }
}

async fn receive_loop(
    transceiver: Arc<dyn Transceiver>,
    service: Arc<GroupDataService>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut transport = TransportLayer::new(TRANSPORT_INACTIVITY_WINDOW);
    loop {
        let bytes = tokio::select! {
            b = transceiver.recv_bytes() => match b {
                Some(b) => b,
                None => break,
            },
            _ = shutdown.changed() => break,
        };
        let frame = match decode_frame(&bytes) {
            Ok(f) => f,
            Err(e) => {
                log_warn(&format!(
                    "Dropping invalid telegram {}: {}",
                    hex::encode(&bytes),
                    e
                ));
                continue;
            }
        };
        if let Err(e) = frame.npdu.check_hop_count() {
            log_warn(&format!(
                "Dropping telegram from {}: {}",
                frame.npdu.source, e
            ));
            continue;
        }
        match transport.receive(frame.npdu.tpdu, frame.npdu.source) {
            TransportVerdict::Deliver(apdu) => match frame.npdu.destination {
                KnxAddress::Group(group) => service.on_receive(frame.npdu.source, group, &apdu),
                KnxAddress::Individual(dst) => {
                    log_debug(&format!(
                        "Ignoring point-to-point APDU for {dst} (group services only)"
                    ));
                }
            },
            TransportVerdict::Consumed => {}
            TransportVerdict::OutOfSequence { expected, received } => {
                log_warn(&format!(
                    "Out-of-sequence frame from {}: expected {}, got {}",
                    frame.npdu.source, expected, received
                ));
            }
        }
    }
}
