//! Group data service: routes group telegrams to and from local
//! datapoints according to each binding's communication flags.

use crate::addressing::{GroupAddress, IndividualAddress, KnxAddress};
use crate::apdu::{Apci, Apdu};
use crate::dpt::{DptRegistry, DptValue};
use crate::error::KnxError;
use crate::group::datapoint::{AccessMode, Datapoint};
use crate::group::object::GroupObject;
use crate::layers::application::{decode_group_value, encode_group_value};
use crate::layers::link::LinkFrame;
use crate::layers::network::Npdu;
use crate::layers::transport::Tpdu;
use crate::queue::FramePriorityQueue;
use crate::logging::{log_debug, log_info, log_warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Notification delivered to change listeners after a datapoint value
/// was updated from the bus. `previous` is `None` for the first value a
/// datapoint ever takes.
#[derive(Debug, Clone)]
pub struct ValueChange {
    pub datapoint: String,
    pub previous: Option<DptValue>,
    pub value: DptValue,
}

type ChangeListener = Box<dyn Fn(&ValueChange) + Send + Sync>;

struct ServiceState {
    datapoints: HashMap<String, Datapoint>,
    // One datapoint may be bound to several addresses and one address may
    // carry several datapoints; only the exact (datapoint, address) pair
    // is unique.
    bindings: HashMap<u16, Vec<GroupObject>>,
    listeners: Vec<(Option<String>, ChangeListener)>,
}

/// The application layer of one device.
///
/// Holds the datapoint table and its group address bindings, consumes
/// decoded inbound APDUs and produces outbound frames on the priority
/// queue. All state lives behind one mutex; change listeners run while
/// it is held, so a listener must not call back into the service.
pub struct GroupDataService {
    state: Mutex<ServiceState>,
    registry: Arc<DptRegistry>,
    queue: Arc<FramePriorityQueue>,
    local_address: IndividualAddress,
}

impl GroupDataService {
    pub fn new(
        local_address: IndividualAddress,
        registry: Arc<DptRegistry>,
        queue: Arc<FramePriorityQueue>,
    ) -> Self {
        Self {
            state: Mutex::new(ServiceState {
                datapoints: HashMap::new(),
                bindings: HashMap::new(),
                listeners: Vec::new(),
            }),
            registry,
            queue,
            local_address,
        }
    }

    /// Registers a datapoint. The name must be unique and its DPT must
    /// resolve in the codec registry.
    pub fn add_datapoint(&self, datapoint: Datapoint) -> Result<(), KnxError> {
        self.registry.lookup(datapoint.dpt)?;
        let mut state = self.state.lock().expect("service lock poisoned");
        if state.datapoints.contains_key(&datapoint.name) {
            return Err(KnxError::InvalidConfig(format!(
                "datapoint {:?} declared twice",
                datapoint.name
            )));
        }
        log_debug(&format!(
            "Datapoint {:?} registered as DPT {}",
            datapoint.name, datapoint.dpt
        ));
        state.datapoints.insert(datapoint.name.clone(), datapoint);
        Ok(())
    }

    /// Binds a datapoint to a group address.
    ///
    /// Binding the same datapoint to the same address twice fails with
    /// [`KnxError::DuplicateBinding`]. The same datapoint on additional
    /// addresses, or additional datapoints on the same address, are both
    /// fine.
    pub fn bind(&self, object: GroupObject) -> Result<(), KnxError> {
        let mut state = self.state.lock().expect("service lock poisoned");
        if !state.datapoints.contains_key(&object.datapoint) {
            return Err(KnxError::UnknownDatapoint(object.datapoint));
        }
        let slot = state.bindings.entry(object.address.raw()).or_default();
        if slot.iter().any(|o| o.datapoint == object.datapoint) {
            return Err(KnxError::DuplicateBinding {
                datapoint: object.datapoint,
                address: object.address.to_string(),
            });
        }
        log_info(&format!(
            "Bound datapoint {:?} to {} ({})",
            object.datapoint, object.address, object.flags
        ));
        slot.push(object);
        Ok(())
    }

    /// Registers a change listener, optionally filtered to one datapoint.
    pub fn on_change<F>(&self, datapoint: Option<String>, listener: F)
    where
        F: Fn(&ValueChange) + Send + Sync + 'static,
    {
        let mut state = self.state.lock().expect("service lock poisoned");
        state.listeners.push((datapoint, Box::new(listener)));
    }

    /// Returns the current value of a datapoint.
    pub fn value(&self, name: &str) -> Result<Option<DptValue>, KnxError> {
        let state = self.state.lock().expect("service lock poisoned");
        let dp = state
            .datapoints
            .get(name)
            .ok_or_else(|| KnxError::UnknownDatapoint(name.to_string()))?;
        Ok(dp.value().cloned())
    }

    /// Seeds a datapoint value without touching the bus. Used for
    /// configured defaults; works for any access mode.
    pub fn init_datapoint(&self, name: &str, value: DptValue) -> Result<(), KnxError> {
        let mut state = self.state.lock().expect("service lock poisoned");
        let dp = state
            .datapoints
            .get_mut(name)
            .ok_or_else(|| KnxError::UnknownDatapoint(name.to_string()))?;
        let codec = self.registry.lookup(dp.dpt)?;
        dp.set_value(codec.as_ref(), value)
    }

    /// Sets a datapoint locally and, if its binding transmits, sends a
    /// GroupValueWrite at the binding's priority.
    pub fn write_datapoint(&self, name: &str, value: DptValue) -> Result<(), KnxError> {
        let mut state = self.state.lock().expect("service lock poisoned");
        let dp = state
            .datapoints
            .get_mut(name)
            .ok_or_else(|| KnxError::UnknownDatapoint(name.to_string()))?;
        if dp.access != AccessMode::Output {
            return Err(KnxError::InvalidConfig(format!(
                "datapoint {name:?} is not an output"
            )));
        }
        let codec = self.registry.lookup(dp.dpt)?;
        dp.set_value(codec.as_ref(), value.clone())?;

        let transmitting: Vec<GroupObject> = state
            .bindings
            .values()
            .flatten()
            .filter(|o| o.datapoint == name && o.flags.transmits())
            .cloned()
            .collect();
        for object in transmitting {
            let apdu = encode_group_value(Apci::GroupValueWrite, codec.as_ref(), &value)?;
            self.enqueue(&object, apdu)?;
        }
        Ok(())
    }

    /// Sends a GroupValueRead for the named datapoint's binding. The
    /// answer arrives later as a GroupValueResponse.
    pub fn read_datapoint(&self, name: &str) -> Result<(), KnxError> {
        let state = self.state.lock().expect("service lock poisoned");
        if !state.datapoints.contains_key(name) {
            return Err(KnxError::UnknownDatapoint(name.to_string()));
        }
        let object = state
            .bindings
            .values()
            .flatten()
            .find(|o| o.datapoint == name && o.flags.contains(crate::group::CommFlags::COMMUNICATION))
            .cloned()
            .ok_or_else(|| {
                KnxError::InvalidConfig(format!("datapoint {name:?} has no communicating binding"))
            })?;
        drop(state);
        self.enqueue(&object, Apdu::group_read())
    }

    /// Handles one inbound group APDU addressed to `destination`.
    ///
    /// Every object bound to the destination is offered the telegram.
    /// Telegrams for unbound addresses and telegrams an object's flags do
    /// not admit are dropped silently; decode failures are logged and
    /// leave the datapoint untouched.
    pub fn on_receive(&self, source: IndividualAddress, destination: GroupAddress, apdu: &Apdu) {
        let mut state = self.state.lock().expect("service lock poisoned");
        let objects: Vec<GroupObject> = state
            .bindings
            .get(&destination.raw())
            .cloned()
            .unwrap_or_default();
        if objects.is_empty() {
            log_debug(&format!(
                "No binding for group address {destination}, ignoring"
            ));
            return;
        }
        for object in &objects {
            match apdu.apci {
                Apci::GroupValueWrite if object.flags.writable() => {
                    self.apply_update(&mut state, object, apdu);
                }
                Apci::GroupValueResponse if object.flags.updates() => {
                    self.apply_update(&mut state, object, apdu);
                }
                Apci::GroupValueRead if object.flags.readable() => {
                    self.answer_read(&state, object);
                }
                other => {
                    log_debug(&format!(
                        "Binding {} on {} does not admit {:?} from {} ({}), ignoring",
                        object.datapoint, destination, other, source, object.flags
                    ));
                }
            }
        }
    }

    fn apply_update(&self, state: &mut ServiceState, object: &GroupObject, apdu: &Apdu) {
        let Some(dp) = state.datapoints.get_mut(&object.datapoint) else {
            return;
        };
        if dp.access != AccessMode::Input {
            log_debug(&format!(
                "Datapoint {:?} is not an input, ignoring bus update",
                dp.name
            ));
            return;
        }
        let codec = match self.registry.lookup(dp.dpt) {
            Ok(c) => c,
            Err(e) => {
                log_warn(&format!("Datapoint {:?} has no codec: {}", dp.name, e));
                return;
            }
        };
        let value = match decode_group_value(apdu, codec.as_ref()) {
            Ok(v) => v,
            Err(e) => {
                log_warn(&format!(
                    "Dropping update for {:?}, payload {} undecodable: {}",
                    dp.name,
                    hex::encode(apdu.payload.as_slice()),
                    e
                ));
                return;
            }
        };
        let previous = dp.value().cloned();
        if let Err(e) = dp.set_value(codec.as_ref(), value.clone()) {
            log_warn(&format!("Dropping update for {:?}: {}", dp.name, e));
            return;
        }
        log_debug(&format!(
            "Datapoint {:?} updated from bus: {}",
            dp.name, value
        ));
        let change = ValueChange {
            datapoint: object.datapoint.clone(),
            previous,
            value,
        };
        for (filter, listener) in &state.listeners {
            if filter.as_deref().map_or(true, |f| f == change.datapoint) {
                listener(&change);
            }
        }
    }

    fn answer_read(&self, state: &ServiceState, object: &GroupObject) {
        let Some(dp) = state.datapoints.get(&object.datapoint) else {
            return;
        };
        let Some(value) = dp.value() else {
            log_debug(&format!(
                "Datapoint {:?} has no value yet, not answering read",
                dp.name
            ));
            return;
        };
        let codec = match self.registry.lookup(dp.dpt) {
            Ok(c) => c,
            Err(e) => {
                log_warn(&format!("Datapoint {:?} has no codec: {}", dp.name, e));
                return;
            }
        };
        match encode_group_value(Apci::GroupValueResponse, codec.as_ref(), value) {
            Ok(apdu) => {
                if let Err(e) = self.enqueue(object, apdu) {
                    log_warn(&format!(
                        "Could not queue response for {:?}: {}",
                        dp.name, e
                    ));
                }
            }
            Err(e) => log_warn(&format!(
                "Could not encode response for {:?}: {}",
                dp.name, e
            )),
        }
    }

    fn enqueue(&self, object: &GroupObject, apdu: Apdu) -> Result<(), KnxError> {
        let npdu = Npdu::new(
            self.local_address,
            KnxAddress::Group(object.address),
            Tpdu::group(apdu),
        );
        self.queue
            .enqueue(LinkFrame::new(object.priority, npdu))
    }
}
