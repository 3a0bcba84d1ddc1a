//! Two full stacks wired back to back through mock transceivers.

use knx_rs::{
    AccessMode, Datapoint, DptRegistry, DptValue, GroupAddress, GroupObject, IndividualAddress,
    KnxStack, MockTransceiver, Priority, Transceiver,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_test::assert_ok;

struct Pair {
    sensor: KnxStack,
    display: KnxStack,
    sensor_side: Arc<MockTransceiver>,
}

/// A temperature sensor at 1.1.10 publishing to 2/1/4, and a display at
/// 1.1.20 following the same group address.
fn temperature_pair() -> Pair {
    let registry = Arc::new(DptRegistry::with_defaults());
    let (sensor_side, display_side) = MockTransceiver::pair();
    let group = GroupAddress::new(2, 1, 4).unwrap();

    let sensor = KnxStack::new(
        IndividualAddress::new(1, 1, 10).unwrap(),
        Arc::clone(&registry),
        Arc::clone(&sensor_side) as Arc<dyn Transceiver>,
    );
    sensor
        .service()
        .add_datapoint(Datapoint::new(
            "room_temp",
            "9.001".parse().unwrap(),
            AccessMode::Output,
        ))
        .unwrap();
    sensor
        .service()
        .bind(GroupObject {
            datapoint: "room_temp".to_string(),
            address: group,
            flags: "CRT".parse().unwrap(),
            priority: Priority::Normal,
        })
        .unwrap();

    let display = KnxStack::new(
        IndividualAddress::new(1, 1, 20).unwrap(),
        registry,
        display_side as Arc<dyn Transceiver>,
    );
    display
        .service()
        .add_datapoint(Datapoint::new(
            "shown_temp",
            "9.001".parse().unwrap(),
            AccessMode::Input,
        ))
        .unwrap();
    display
        .service()
        .bind(GroupObject {
            datapoint: "shown_temp".to_string(),
            address: group,
            flags: "CWU".parse().unwrap(),
            priority: Priority::Normal,
        })
        .unwrap();

    Pair {
        sensor,
        display,
        sensor_side,
    }
}

async fn next_change(rx: &mut mpsc::UnboundedReceiver<DptValue>) -> DptValue {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("no change within 1s")
        .expect("channel closed")
}

#[tokio::test]
async fn test_write_propagates_between_stacks() {
    let pair = temperature_pair();
    let (tx, mut rx) = mpsc::unbounded_channel();
    pair.display.on_change(Some("shown_temp".to_string()), move |change| {
        let _ = tx.send(change.value.clone());
    });
    pair.sensor.start();
    pair.display.start();

    tokio_test::assert_ok!(pair.sensor.write("room_temp", DptValue::Float(21.5)));

    assert_eq!(next_change(&mut rx).await, DptValue::Float(21.5));
    assert_eq!(
        pair.display.value("shown_temp").unwrap(),
        Some(DptValue::Float(21.5))
    );

    pair.sensor.stop().await;
    pair.display.stop().await;
}

#[tokio::test]
async fn test_read_request_is_answered_with_response() {
    let pair = temperature_pair();
    let (tx, mut rx) = mpsc::unbounded_channel();
    pair.display.on_change(None, move |change| {
        let _ = tx.send((change.previous.clone(), change.value.clone()));
    });
    pair.sensor.start();
    pair.display.start();

    // Seed the sensor without transmitting, then ask from the display side.
    pair.sensor
        .service()
        .init_datapoint("room_temp", DptValue::Float(19.25))
        .unwrap();
    pair.display.read("shown_temp").unwrap();

    // Exactly one notification, with a true before/after pair.
    let (previous, value) = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("no change within 1s")
        .expect("channel closed");
    assert_eq!(previous, None);
    assert_eq!(value, DptValue::Float(19.25));
    assert!(rx.try_recv().is_err());

    pair.sensor.stop().await;
    pair.display.stop().await;
}

#[tokio::test]
async fn test_corrupted_telegram_never_reaches_listeners() {
    let pair = temperature_pair();
    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    pair.display.on_change(None, move |change| {
        sink.lock().unwrap().push(change.value.clone());
    });
    pair.display.start();

    // Build a valid telegram by hand, then flip one payload bit. The
    // display's receive loop must log and drop it.
    pair.sensor.write("room_temp", DptValue::Float(21.5)).unwrap();
    pair.sensor.start();
    pair.sensor.stop().await;
    let mut sent = pair.sensor_side.sent_frames();
    let mut telegram = sent.pop().expect("sensor transmitted");
    telegram[7] ^= 0x01;

    // The pair is already cross-wired, so inject on the display's side
    // by sending through the sensor transceiver's raw path.
    pair.sensor_side.send_bytes(&telegram).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    pair.display.stop().await;

    // Exactly one change: the intact telegram. The corrupted copy is gone.
    assert_eq!(changes.lock().unwrap().as_slice(), &[DptValue::Float(21.5)]);
}

#[tokio::test]
async fn test_stopped_stack_rejects_writes() {
    let pair = temperature_pair();
    pair.sensor.start();
    pair.sensor.stop().await;
    assert!(pair.sensor.write("room_temp", DptValue::Float(1.0)).is_err());
}
