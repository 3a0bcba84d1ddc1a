use knx_rs::layers::application::encode_group_value;
use knx_rs::{
    AccessMode, Apci, Apdu, CommFlags, Datapoint, DptRegistry, DptValue, FramePriorityQueue,
    GroupAddress, GroupDataService, GroupObject, IndividualAddress, KnxError, Priority,
};
use std::sync::{Arc, Mutex};

struct Rig {
    service: GroupDataService,
    queue: Arc<FramePriorityQueue>,
    registry: Arc<DptRegistry>,
}

fn rig() -> Rig {
    let registry = Arc::new(DptRegistry::with_defaults());
    let queue = Arc::new(FramePriorityQueue::new());
    let service = GroupDataService::new(
        IndividualAddress::new(1, 1, 10).unwrap(),
        Arc::clone(&registry),
        Arc::clone(&queue),
    );
    Rig {
        service,
        queue,
        registry,
    }
}

fn peer() -> IndividualAddress {
    IndividualAddress::new(1, 1, 77).unwrap()
}

fn object(name: &str, address: GroupAddress, flags: &str, priority: Priority) -> GroupObject {
    GroupObject {
        datapoint: name.to_string(),
        address,
        flags: flags.parse().unwrap(),
        priority,
    }
}

fn write_apdu(registry: &DptRegistry, dpt: &str, value: DptValue) -> Apdu {
    let codec = registry.lookup_str(dpt).unwrap();
    encode_group_value(Apci::GroupValueWrite, codec.as_ref(), &value).unwrap()
}

#[test]
fn test_datapoint_requires_known_dpt() {
    let r = rig();
    let err = r
        .service
        .add_datapoint(Datapoint::new(
            "x",
            "99.001".parse().unwrap(),
            AccessMode::Input,
        ))
        .unwrap_err();
    assert!(matches!(err, KnxError::UnknownDpt(_)));
}

#[test]
fn test_bind_requires_existing_datapoint() {
    let r = rig();
    let err = r
        .service
        .bind(object(
            "ghost",
            GroupAddress::new(1, 1, 1).unwrap(),
            "C",
            Priority::Normal,
        ))
        .unwrap_err();
    assert!(matches!(err, KnxError::UnknownDatapoint(_)));
}

#[test]
fn test_transmitting_write_reaches_queue_with_binding_priority() {
    let r = rig();
    r.service
        .add_datapoint(Datapoint::new(
            "alarm_out",
            "1.001".parse().unwrap(),
            AccessMode::Output,
        ))
        .unwrap();
    let addr = GroupAddress::new(4, 0, 7).unwrap();
    r.service
        .bind(object("alarm_out", addr, "CT", Priority::Alarm))
        .unwrap();

    r.service
        .write_datapoint("alarm_out", DptValue::Bool(true))
        .unwrap();

    let frame = r.queue.try_dequeue().expect("one frame queued");
    assert_eq!(frame.priority, Priority::Alarm);
    assert_eq!(frame.npdu.destination.raw(), addr.raw());
    assert_eq!(
        frame.npdu.tpdu.apdu.unwrap().apci,
        Apci::GroupValueWrite
    );
    assert!(r.queue.try_dequeue().is_none());
}

#[test]
fn test_transmitted_float_carries_wire_encoding() {
    let r = rig();
    r.service
        .add_datapoint(Datapoint::new(
            "temp_out",
            "9.001".parse().unwrap(),
            AccessMode::Output,
        ))
        .unwrap();
    let addr = GroupAddress::new(2, 1, 4).unwrap();
    r.service
        .bind(object("temp_out", addr, "CT", Priority::Normal))
        .unwrap();

    r.service
        .write_datapoint("temp_out", DptValue::Float(21.5))
        .unwrap();
    let frame = r.queue.try_dequeue().expect("one frame queued");
    let apdu = frame.npdu.tpdu.apdu.unwrap();
    assert_eq!(apdu.apci, Apci::GroupValueWrite);
    assert_eq!(apdu.payload.as_slice(), &[0x0C, 0x33]);
    assert!(r.queue.try_dequeue().is_none());
}

#[test]
fn test_write_without_transmit_flag_stays_local() {
    let r = rig();
    r.service
        .add_datapoint(Datapoint::new(
            "local",
            "1.001".parse().unwrap(),
            AccessMode::Output,
        ))
        .unwrap();
    r.service
        .bind(object(
            "local",
            GroupAddress::new(1, 1, 2).unwrap(),
            "C",
            Priority::Normal,
        ))
        .unwrap();

    r.service.write_datapoint("local", DptValue::Bool(true)).unwrap();
    assert_eq!(r.service.value("local").unwrap(), Some(DptValue::Bool(true)));
    assert!(r.queue.try_dequeue().is_none());
}

#[test]
fn test_inbound_write_honours_flags() {
    let r = rig();
    r.service
        .add_datapoint(Datapoint::new(
            "temp",
            "9.001".parse().unwrap(),
            AccessMode::Input,
        ))
        .unwrap();
    let addr = GroupAddress::new(2, 1, 4).unwrap();
    // No Write flag: the telegram must not update the value.
    r.service
        .bind(object("temp", addr, "CU", Priority::Normal))
        .unwrap();

    let apdu = write_apdu(&r.registry, "9.001", DptValue::Float(21.5));
    r.service.on_receive(peer(), addr, &apdu);
    assert!(r.service.value("temp").unwrap().is_none());
}

#[test]
fn test_inbound_write_updates_and_notifies_once() {
    let r = rig();
    r.service
        .add_datapoint(Datapoint::new(
            "temp",
            "9.001".parse().unwrap(),
            AccessMode::Input,
        ))
        .unwrap();
    let addr = GroupAddress::new(2, 1, 4).unwrap();
    r.service
        .bind(object("temp", addr, "CWU", Priority::Normal))
        .unwrap();

    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    r.service.on_change(None, move |change| {
        sink.lock()
            .unwrap()
            .push((change.datapoint.clone(), change.value.clone()));
    });

    let apdu = write_apdu(&r.registry, "9.001", DptValue::Float(21.5));
    r.service.on_receive(peer(), addr, &apdu);

    assert_eq!(r.service.value("temp").unwrap(), Some(DptValue::Float(21.5)));
    let changes = changes.lock().unwrap();
    assert_eq!(changes.as_slice(), &[("temp".to_string(), DptValue::Float(21.5))]);
}

#[test]
fn test_listener_filter_by_datapoint_name() {
    let r = rig();
    for (name, addr) in [("a", GroupAddress::new(1, 0, 1).unwrap()), ("b", GroupAddress::new(1, 0, 2).unwrap())] {
        r.service
            .add_datapoint(Datapoint::new(
                name,
                "1.001".parse().unwrap(),
                AccessMode::Input,
            ))
            .unwrap();
        r.service
            .bind(object(name, addr, "CW", Priority::Normal))
            .unwrap();
    }
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    r.service.on_change(Some("b".to_string()), move |change| {
        sink.lock().unwrap().push(change.datapoint.clone());
    });

    let apdu = write_apdu(&r.registry, "1.001", DptValue::Bool(true));
    r.service.on_receive(peer(), GroupAddress::new(1, 0, 1).unwrap(), &apdu);
    r.service.on_receive(peer(), GroupAddress::new(1, 0, 2).unwrap(), &apdu);
    assert_eq!(seen.lock().unwrap().as_slice(), &["b".to_string()]);
}

#[test]
fn test_shared_address_updates_every_bound_datapoint() {
    let r = rig();
    let addr = GroupAddress::new(2, 1, 4).unwrap();
    for name in ["panel_temp", "logger_temp"] {
        r.service
            .add_datapoint(Datapoint::new(
                name,
                "9.001".parse().unwrap(),
                AccessMode::Input,
            ))
            .unwrap();
        r.service
            .bind(object(name, addr, "CW", Priority::Normal))
            .unwrap();
    }

    let apdu = write_apdu(&r.registry, "9.001", DptValue::Float(20.0));
    r.service.on_receive(peer(), addr, &apdu);
    assert_eq!(
        r.service.value("panel_temp").unwrap(),
        Some(DptValue::Float(20.0))
    );
    assert_eq!(
        r.service.value("logger_temp").unwrap(),
        Some(DptValue::Float(20.0))
    );
}

#[test]
fn test_notification_carries_old_and_new_value() {
    let r = rig();
    r.service
        .add_datapoint(Datapoint::new(
            "temp",
            "9.001".parse().unwrap(),
            AccessMode::Input,
        ))
        .unwrap();
    let addr = GroupAddress::new(2, 1, 4).unwrap();
    r.service
        .bind(object("temp", addr, "CW", Priority::Normal))
        .unwrap();

    let pairs = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&pairs);
    r.service.on_change(None, move |change| {
        sink.lock()
            .unwrap()
            .push((change.previous.clone(), change.value.clone()));
    });

    r.service
        .on_receive(peer(), addr, &write_apdu(&r.registry, "9.001", DptValue::Float(18.0)));
    r.service
        .on_receive(peer(), addr, &write_apdu(&r.registry, "9.001", DptValue::Float(21.0)));
    assert_eq!(
        pairs.lock().unwrap().as_slice(),
        &[
            (None, DptValue::Float(18.0)),
            (Some(DptValue::Float(18.0)), DptValue::Float(21.0)),
        ]
    );
}

#[test]
fn test_undecodable_payload_leaves_value_untouched() {
    let r = rig();
    r.service
        .add_datapoint(Datapoint::new(
            "temp",
            "9.001".parse().unwrap(),
            AccessMode::Input,
        ))
        .unwrap();
    let addr = GroupAddress::new(2, 1, 4).unwrap();
    r.service
        .bind(object("temp", addr, "CWU", Priority::Normal))
        .unwrap();

    // Boolean-sized payload against a two-octet DPT.
    let apdu = write_apdu(&r.registry, "1.001", DptValue::Bool(true));
    r.service.on_receive(peer(), addr, &apdu);
    assert!(r.service.value("temp").unwrap().is_none());
}

#[test]
fn test_read_answered_only_with_read_flag_and_value() {
    let r = rig();
    r.service
        .add_datapoint(Datapoint::new(
            "setpoint",
            "9.001".parse().unwrap(),
            AccessMode::Output,
        ))
        .unwrap();
    let addr = GroupAddress::new(3, 2, 1).unwrap();
    r.service
        .bind(object("setpoint", addr, "CR", Priority::Normal))
        .unwrap();

    // No value yet: a read stays unanswered.
    r.service.on_receive(peer(), addr, &Apdu::group_read());
    assert!(r.queue.try_dequeue().is_none());

    r.service
        .init_datapoint("setpoint", DptValue::Float(19.0))
        .unwrap();
    r.service.on_receive(peer(), addr, &Apdu::group_read());
    let frame = r.queue.try_dequeue().expect("response queued");
    assert_eq!(
        frame.npdu.tpdu.apdu.unwrap().apci,
        Apci::GroupValueResponse
    );
}

#[test]
fn test_flags_gate_is_communication() {
    let flags: CommFlags = "RWTU".parse().unwrap();
    assert!(!flags.writable());
    let flags: CommFlags = "CRWTU".parse().unwrap();
    assert!(flags.writable() && flags.readable() && flags.transmits() && flags.updates());
}
