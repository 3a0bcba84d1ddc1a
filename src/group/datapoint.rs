//! Named datapoints: the device-local variables group communication
//! reads and writes.

use crate::dpt::{DptCodec, DptId, DptValue};
use crate::error::KnxError;

/// Direction of a datapoint relative to the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Updated from the bus, never transmitted.
    Input,
    /// Transmitted to the bus when written locally.
    Output,
    /// Local configuration value, not exchanged at runtime.
    Param,
}

impl std::str::FromStr for AccessMode {
    type Err = KnxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "input" => Ok(AccessMode::Input),
            "output" => Ok(AccessMode::Output),
            "param" | "parameter" => Ok(AccessMode::Param),
            other => Err(KnxError::InvalidConfig(format!(
                "unknown access mode {other:?}"
            ))),
        }
    }
}

/// A named local value with a fixed datapoint type.
///
/// The current value is always one the DPT codec can represent: every
/// assignment is validated by encoding it, so a stored value can never
/// fail later at transmit time.
#[derive(Debug, Clone)]
pub struct Datapoint {
    pub name: String,
    pub dpt: DptId,
    pub access: AccessMode,
    value: Option<DptValue>,
}

impl Datapoint {
    pub fn new(name: impl Into<String>, dpt: DptId, access: AccessMode) -> Self {
        Self {
            name: name.into(),
            dpt,
            access,
            value: None,
        }
    }

    pub fn value(&self) -> Option<&DptValue> {
        self.value.as_ref()
    }

    /// Replaces the stored value after proving the codec accepts it.
    pub(crate) fn set_value(
        &mut self,
        codec: &dyn DptCodec,
        value: DptValue,
    ) -> Result<(), KnxError> {
        if value.kind() != codec.value_kind() {
            return Err(KnxError::ValueFormat(format!(
                "datapoint {:?} holds {:?} values, got {:?}",
                self.name,
                codec.value_kind(),
                value.kind()
            )));
        }
        codec.encode(&value)?;
        self.value = Some(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dpt::DptRegistry;

    #[test]
    fn set_value_rejects_wrong_kind() {
        let registry = DptRegistry::with_defaults();
        let codec = registry.lookup_str("9.001").unwrap();
        let mut dp = Datapoint::new("temp", "9.001".parse().unwrap(), AccessMode::Output);
        let err = dp
            .set_value(codec.as_ref(), DptValue::Bool(true))
            .unwrap_err();
        assert!(matches!(err, KnxError::ValueFormat(_)));
        assert!(dp.value().is_none());
    }

    #[test]
    fn set_value_rejects_out_of_range() {
        let registry = DptRegistry::with_defaults();
        let codec = registry.lookup_str("9.001").unwrap();
        let mut dp = Datapoint::new("temp", "9.001".parse().unwrap(), AccessMode::Output);
        let err = dp
            .set_value(codec.as_ref(), DptValue::Float(1e9))
            .unwrap_err();
        assert!(matches!(err, KnxError::ValueRange(_)));
        assert!(dp.value().is_none());
    }

    #[test]
    fn access_mode_parses_case_insensitively() {
        assert_eq!("Output".parse::<AccessMode>().unwrap(), AccessMode::Output);
        assert_eq!("param".parse::<AccessMode>().unwrap(), AccessMode::Param);
        assert!("both".parse::<AccessMode>().is_err());
    }
}
