//! # Declarative Device Configuration
//!
//! A device's datapoint table and group bindings can be described in a
//! JSON document and applied to a [`GroupDataService`] in one pass. Any
//! error in the document is fatal; a device never starts with half its
//! bindings in place.
//!
//! ```json
//! {
//!   "individual_address": "1.1.10",
//!   "datapoints": [
//!     { "name": "room_temp", "dpt": "9.001", "access": "input" }
//!   ],
//!   "bindings": [
//!     { "datapoint": "room_temp", "group_address": "2/1/4",
//!       "flags": "CWU", "priority": "normal" }
//!   ]
//! }
//! ```

use crate::addressing::{GroupAddress, IndividualAddress};
use crate::dpt::{DptRegistry, DptValue, KnxTime, StepControl, ValueKind};
use crate::error::KnxError;
use crate::group::datapoint::{AccessMode, Datapoint};
use crate::group::object::{CommFlags, GroupObject};
use crate::group::service::GroupDataService;
use crate::layers::link::Priority;
use crate::logging::log_info;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatapointConfig {
    pub name: String,
    pub dpt: String,
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingConfig {
    pub datapoint: String,
    pub group_address: String,
    pub flags: String,
    #[serde(default = "default_priority")]
    pub priority: String,
}

fn default_priority() -> String {
    "normal".to_string()
}

/// Top-level configuration document for one device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub individual_address: String,
    #[serde(default)]
    pub datapoints: Vec<DatapointConfig>,
    #[serde(default)]
    pub bindings: Vec<BindingConfig>,
}

impl DeviceConfig {
    pub fn from_json(json: &str) -> Result<Self, KnxError> {
        serde_json::from_str(json)
            .map_err(|e| KnxError::InvalidConfig(format!("not a device document: {e}")))
    }

    pub fn individual_address(&self) -> Result<IndividualAddress, KnxError> {
        self.individual_address.parse()
    }

    /// Creates every datapoint and binding on the service. Defaults are
    /// seeded after all datapoints exist.
    pub fn apply(&self, service: &GroupDataService, registry: &DptRegistry) -> Result<(), KnxError> {
        for dp in &self.datapoints {
            let dpt = dp.dpt.parse()?;
            let access: AccessMode = dp.access.parse()?;
            service.add_datapoint(Datapoint::new(dp.name.clone(), dpt, access))?;
        }
        for dp in &self.datapoints {
            if let Some(default) = &dp.default {
                let codec = registry.lookup(dp.dpt.parse()?)?;
                let value = value_from_json(codec.value_kind(), default)?;
                service.init_datapoint(&dp.name, value)?;
            }
        }
        for binding in &self.bindings {
            let address: GroupAddress = binding.group_address.parse()?;
            let flags: CommFlags = binding.flags.parse()?;
            let priority: Priority = binding.priority.parse()?;
            service.bind(GroupObject {
                datapoint: binding.datapoint.clone(),
                address,
                flags,
                priority,
            })?;
        }
        log_info(&format!(
            "Applied configuration: {} datapoint(s), {} binding(s)",
            self.datapoints.len(),
            self.bindings.len()
        ));
        Ok(())
    }
}

/// Converts a JSON literal to the [`DptValue`] variant a codec expects.
pub fn value_from_json(kind: ValueKind, json: &JsonValue) -> Result<DptValue, KnxError> {
    let mismatch = || KnxError::InvalidConfig(format!("{json} is not a {kind:?} value"));
    match kind {
        ValueKind::Bool => json.as_bool().map(DptValue::Bool).ok_or_else(mismatch),
        ValueKind::Int => json.as_i64().map(DptValue::Int).ok_or_else(mismatch),
        ValueKind::Float => json.as_f64().map(DptValue::Float).ok_or_else(mismatch),
        ValueKind::Str => json
            .as_str()
            .map(|s| DptValue::Str(s.to_string()))
            .ok_or_else(mismatch),
        ValueKind::Date => {
            let s = json.as_str().ok_or_else(mismatch)?;
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| KnxError::InvalidConfig(format!("bad date {s:?}: {e}")))?;
            Ok(DptValue::Date(date))
        }
        ValueKind::Time => {
            // Either "14:30:45" or { "weekday": 3, "time": "14:30:45" }.
            let (weekday, time_str) = match json {
                JsonValue::String(s) => (None, s.as_str()),
                JsonValue::Object(map) => {
                    let weekday = match map.get("weekday") {
                        Some(v) => Some(
                            u8::try_from(v.as_u64().ok_or_else(mismatch)?)
                                .map_err(|_| mismatch())?,
                        ),
                        None => None,
                    };
                    let time = map
                        .get("time")
                        .and_then(JsonValue::as_str)
                        .ok_or_else(mismatch)?;
                    (weekday, time)
                }
                _ => return Err(mismatch()),
            };
            let time = NaiveTime::parse_from_str(time_str, "%H:%M:%S")
                .map_err(|e| KnxError::InvalidConfig(format!("bad time {time_str:?}: {e}")))?;
            Ok(DptValue::Time(KnxTime { weekday, time }))
        }
        ValueKind::Step => {
            if json.as_str() == Some("stop") {
                return Ok(DptValue::Step(StepControl::stop()));
            }
            let map = json.as_object().ok_or_else(mismatch)?;
            let increase = map
                .get("increase")
                .and_then(JsonValue::as_bool)
                .ok_or_else(mismatch)?;
            let step = map
                .get("step")
                .and_then(JsonValue::as_u64)
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(mismatch)?;
            if step > StepControl::MAX_STEP {
                return Err(KnxError::InvalidConfig(format!(
                    "step code {step} outside 0..=7"
                )));
            }
            Ok(DptValue::Step(StepControl { increase, step }))
        }
    }
}
