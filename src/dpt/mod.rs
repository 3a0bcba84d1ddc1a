//! The dpt module contains the components responsible for translating
//! between application-level values and their KNX Datapoint Type (DPT)
//! wire representations.
//!
//! Each codec belongs to a main-type family (boolean 1.x, 3-bit control
//! 3.x, signed/unsigned integers 6.x/7.x/8.x/12.x/13.x, 2-byte float 9.x,
//! time 10.x, date 11.x, 4-byte float 14.x, character string 16.x). The
//! [`DptRegistry`] resolves a dotted identifier such as "9.001" to a codec,
//! falling back to the family's default sub-type when the exact sub-type is
//! unregistered.

pub mod boolean;
pub mod control;
pub mod datetime;
pub mod float16;
pub mod numeric;
pub mod string;

pub use boolean::BooleanCodec;
pub use control::{StepCodec, StepControl};
pub use datetime::{DateCodec, KnxTime, TimeCodec};
pub use float16::Float16Codec;
pub use numeric::{Float32Codec, Signed16Codec, Signed32Codec, Signed8Codec, Unsigned16Codec, Unsigned32Codec};
pub use string::StringCodec;

use crate::error::KnxError;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Dotted datapoint-type identifier, e.g. "9.001".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DptId {
    pub main: u16,
    pub sub: u16,
}

impl DptId {
    pub const fn new(main: u16, sub: u16) -> Self {
        Self { main, sub }
    }
}

impl fmt::Display for DptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.main, self.sub)
    }
}

impl FromStr for DptId {
    type Err = KnxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (main, sub) = s
            .split_once('.')
            .ok_or_else(|| KnxError::UnknownDpt(format!("not a main.sub identifier: {s:?}")))?;
        let main = main
            .parse::<u16>()
            .map_err(|_| KnxError::UnknownDpt(format!("invalid main type in {s:?}")))?;
        let sub = sub
            .parse::<u16>()
            .map_err(|_| KnxError::UnknownDpt(format!("invalid sub type in {s:?}")))?;
        Ok(Self { main, sub })
    }
}

/// Application-level value of a datapoint, tagged by domain type.
///
/// Each codec produces and consumes exactly one variant; mismatches are
/// rejected when a datapoint is created, not when it is used.
#[derive(Debug, Clone, PartialEq)]
pub enum DptValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    Time(KnxTime),
    Step(StepControl),
}

impl DptValue {
    pub const fn kind(&self) -> ValueKind {
        match self {
            DptValue::Bool(_) => ValueKind::Bool,
            DptValue::Int(_) => ValueKind::Int,
            DptValue::Float(_) => ValueKind::Float,
            DptValue::Str(_) => ValueKind::Str,
            DptValue::Date(_) => ValueKind::Date,
            DptValue::Time(_) => ValueKind::Time,
            DptValue::Step(_) => ValueKind::Step,
        }
    }
}

impl fmt::Display for DptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DptValue::Bool(v) => write!(f, "{v}"),
            DptValue::Int(v) => write!(f, "{v}"),
            DptValue::Float(v) => write!(f, "{v}"),
            DptValue::Str(v) => write!(f, "{v}"),
            DptValue::Date(v) => write!(f, "{v}"),
            DptValue::Time(v) => write!(f, "{v}"),
            DptValue::Step(v) => write!(f, "{v}"),
        }
    }
}

/// Domain type produced/consumed by a codec, used for bind-time checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Str,
    Date,
    Time,
    Step,
}

/// Wire size of a codec's payload.
///
/// Payloads of six bits or fewer ride inside the low bits of the APCI
/// octet; larger payloads are appended as whole octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLength {
    /// Small payload carried inside the APCI octet (1..=6 bits).
    Bits(u8),
    /// Payload appended as whole octets.
    Bytes(usize),
}

/// A converter between one [`DptValue`] variant and its wire representation.
pub trait DptCodec: Send + Sync {
    /// The identifier this codec instance was registered under.
    fn id(&self) -> DptId;

    /// The fixed wire size of this codec's payload.
    fn payload_length(&self) -> PayloadLength;

    /// The value variant this codec produces and consumes.
    fn value_kind(&self) -> ValueKind;

    /// Encodes a value to its wire payload.
    ///
    /// Out-of-range values fail with [`KnxError::ValueRange`]; they are
    /// never clamped or wrapped.
    fn encode(&self, value: &DptValue) -> Result<Vec<u8>, KnxError>;

    /// Decodes a wire payload back to a value.
    fn decode(&self, raw: &[u8]) -> Result<DptValue, KnxError>;
}

/// Checks the payload slice length against the codec's declared size.
pub(crate) fn check_payload_len(codec: &dyn DptCodec, raw: &[u8]) -> Result<(), KnxError> {
    let expected = match codec.payload_length() {
        PayloadLength::Bits(_) => 1,
        PayloadLength::Bytes(n) => n,
    };
    if raw.len() != expected {
        return Err(KnxError::ValueFormat(format!(
            "DPT {} expects {} payload byte(s), got {}",
            codec.id(),
            expected,
            raw.len()
        )));
    }
    Ok(())
}

/// Rejects a value whose variant does not match the codec.
pub(crate) fn wrong_kind(codec: &dyn DptCodec, value: &DptValue) -> KnxError {
    KnxError::ValueFormat(format!(
        "DPT {} expects a {:?} value, got {:?}",
        codec.id(),
        codec.value_kind(),
        value.kind()
    ))
}

/// The standard codec table, shared by every registry built with defaults.
static STANDARD_CODECS: Lazy<Vec<Arc<dyn DptCodec>>> = Lazy::new(|| {
    let mut codecs: Vec<Arc<dyn DptCodec>> = Vec::new();
    // 1.x boolean: switch, bool, up/down, open/close
    for sub in [1, 2, 8, 9] {
        codecs.push(Arc::new(BooleanCodec::new(DptId::new(1, sub))));
    }
    // 3.x 3-bit control: dimming, blinds
    for sub in [7, 8] {
        codecs.push(Arc::new(StepCodec::new(DptId::new(3, sub))));
    }
    // 6.x 8-bit signed: percent, counter pulses
    for sub in [1, 10] {
        codecs.push(Arc::new(Signed8Codec::new(DptId::new(6, sub))));
    }
    // 7.x / 8.x 2-byte integers
    for sub in [1, 12] {
        codecs.push(Arc::new(Unsigned16Codec::new(DptId::new(7, sub))));
    }
    for sub in [1, 11] {
        codecs.push(Arc::new(Signed16Codec::new(DptId::new(8, sub))));
    }
    // 9.x 2-byte float: temperature, lux, humidity
    for sub in [1, 4, 7] {
        codecs.push(Arc::new(Float16Codec::new(DptId::new(9, sub))));
    }
    // 10.x time / 11.x date
    codecs.push(Arc::new(TimeCodec::new(DptId::new(10, 1))));
    codecs.push(Arc::new(DateCodec::new(DptId::new(11, 1))));
    // 12.x / 13.x 4-byte integers
    codecs.push(Arc::new(Unsigned32Codec::new(DptId::new(12, 1))));
    for sub in [1, 10] {
        codecs.push(Arc::new(Signed32Codec::new(DptId::new(13, sub))));
    }
    // 14.x 4-byte float: temperature, power
    for sub in [56, 68] {
        codecs.push(Arc::new(Float32Codec::new(DptId::new(14, sub))));
    }
    // 16.x character string
    codecs.push(Arc::new(StringCodec::new(DptId::new(16, 0))));
    codecs
});

/// Default sub-type per main family, used when the exact sub is unregistered.
static DEFAULT_SUBTYPES: Lazy<HashMap<u16, u16>> = Lazy::new(|| {
    HashMap::from([
        (1, 1),
        (3, 7),
        (6, 1),
        (7, 1),
        (8, 1),
        (9, 1),
        (10, 1),
        (11, 1),
        (12, 1),
        (13, 1),
        (14, 56),
        (16, 0),
    ])
});

/// Registry resolving DPT identifiers to codecs.
pub struct DptRegistry {
    codecs: HashMap<DptId, Arc<dyn DptCodec>>,
    default_subs: HashMap<u16, u16>,
}

impl DptRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
            default_subs: HashMap::new(),
        }
    }

    /// Creates a registry pre-populated with the standard codec table.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for codec in STANDARD_CODECS.iter() {
            registry.codecs.insert(codec.id(), Arc::clone(codec));
        }
        registry.default_subs = DEFAULT_SUBTYPES.clone();
        registry
    }

    /// Registers a codec under its own identifier.
    pub fn register(&mut self, codec: Arc<dyn DptCodec>) {
        let id = codec.id();
        self.default_subs.entry(id.main).or_insert(id.sub);
        self.codecs.insert(id, codec);
    }

    /// Resolves an identifier to a codec.
    ///
    /// Exact sub-type first, then the main family's default sub-type;
    /// fails with [`KnxError::UnknownDpt`] if even the family is unknown.
    pub fn lookup(&self, id: DptId) -> Result<Arc<dyn DptCodec>, KnxError> {
        if let Some(codec) = self.codecs.get(&id) {
            return Ok(Arc::clone(codec));
        }
        if let Some(default_sub) = self.default_subs.get(&id.main) {
            if let Some(codec) = self.codecs.get(&DptId::new(id.main, *default_sub)) {
                return Ok(Arc::clone(codec));
            }
        }
        Err(KnxError::UnknownDpt(id.to_string()))
    }

    /// Resolves a dotted identifier string such as "9.001".
    pub fn lookup_str(&self, id: &str) -> Result<Arc<dyn DptCodec>, KnxError> {
        self.lookup(id.parse()?)
    }
}

impl Default for DptRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpt_id_parse_and_display() {
        let id: DptId = "9.001".parse().unwrap();
        assert_eq!(id, DptId::new(9, 1));
        assert_eq!(id.to_string(), "9.001");
    }

    #[test]
    fn lookup_exact_then_family_default() {
        let registry = DptRegistry::with_defaults();
        assert_eq!(registry.lookup_str("9.001").unwrap().id(), DptId::new(9, 1));
        // 9.999 is unregistered: falls back to the family default 9.001
        assert_eq!(registry.lookup_str("9.999").unwrap().id(), DptId::new(9, 1));
        assert!(matches!(
            registry.lookup_str("99.001"),
            Err(KnxError::UnknownDpt(_))
        ));
    }

    #[test]
    fn custom_registration_wins_over_default() {
        let mut registry = DptRegistry::with_defaults();
        registry.register(Arc::new(BooleanCodec::with_labels(
            DptId::new(1, 9),
            "Open",
            "Close",
        )));
        let codec = registry.lookup_str("1.009").unwrap();
        assert_eq!(codec.id(), DptId::new(1, 9));
    }
}
