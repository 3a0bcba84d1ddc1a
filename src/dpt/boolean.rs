//! DPT 1.x - Boolean (1 bit)
//!
//! One bit carried in the small six-bit payload inside the APCI octet.
//! Decode treats any set low bit as true. A codec instance may carry an
//! enumerated label pair (e.g. "Open"/"Close") for display purposes; the
//! value itself is always [`DptValue::Bool`].

use crate::dpt::{check_payload_len, wrong_kind, DptCodec, DptId, DptValue, PayloadLength, ValueKind};
use crate::error::KnxError;

#[derive(Debug, Clone)]
pub struct BooleanCodec {
    id: DptId,
    labels: Option<(&'static str, &'static str)>,
}

impl BooleanCodec {
    pub fn new(id: DptId) -> Self {
        Self { id, labels: None }
    }

    /// Creates a codec with a (false, true) label pair, e.g. ("Close", "Open").
    pub fn with_labels(id: DptId, false_label: &'static str, true_label: &'static str) -> Self {
        Self {
            id,
            labels: Some((false_label, true_label)),
        }
    }

    /// Display label for a boolean value, when a label pair is configured.
    pub fn label(&self, value: bool) -> Option<&'static str> {
        self.labels.map(|(f, t)| if value { t } else { f })
    }
}

impl DptCodec for BooleanCodec {
    fn id(&self) -> DptId {
        self.id
    }

    fn payload_length(&self) -> PayloadLength {
        PayloadLength::Bits(1)
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Bool
    }

    fn encode(&self, value: &DptValue) -> Result<Vec<u8>, KnxError> {
        match value {
            DptValue::Bool(v) => Ok(vec![u8::from(*v)]),
            other => Err(wrong_kind(self, other)),
        }
    }

    fn decode(&self, raw: &[u8]) -> Result<DptValue, KnxError> {
        check_payload_len(self, raw)?;
        Ok(DptValue::Bool(raw[0] & 0x01 != 0))
    }
}
