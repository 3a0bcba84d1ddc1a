//! DPT 3.x - 3-bit controlled (dimming / blinds step)
//!
//! Four bits in the small payload: one control bit (direction) plus a
//! 3-bit step code. Step code 0 means "stop".

use crate::dpt::{check_payload_len, wrong_kind, DptCodec, DptId, DptValue, PayloadLength, ValueKind};
use crate::error::KnxError;
use std::fmt;

/// A (direction, step-count) pair; `step` 0 is "stop".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepControl {
    pub increase: bool,
    pub step: u8,
}

impl StepControl {
    /// Maximum step code (3 bits)
    pub const MAX_STEP: u8 = 7;

    pub const fn stop() -> Self {
        Self {
            increase: false,
            step: 0,
        }
    }

    pub const fn is_stop(self) -> bool {
        self.step == 0
    }
}

impl fmt::Display for StepControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_stop() {
            write!(f, "stop")
        } else if self.increase {
            write!(f, "up {}", self.step)
        } else {
            write!(f, "down {}", self.step)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StepCodec {
    id: DptId,
}

impl StepCodec {
    pub fn new(id: DptId) -> Self {
        Self { id }
    }
}

impl DptCodec for StepCodec {
    fn id(&self) -> DptId {
        self.id
    }

    fn payload_length(&self) -> PayloadLength {
        PayloadLength::Bits(4)
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Step
    }

    fn encode(&self, value: &DptValue) -> Result<Vec<u8>, KnxError> {
        match value {
            DptValue::Step(ctrl) => {
                if ctrl.step > StepControl::MAX_STEP {
                    return Err(KnxError::ValueRange(format!(
                        "step code {} exceeds {}",
                        ctrl.step,
                        StepControl::MAX_STEP
                    )));
                }
                Ok(vec![(u8::from(ctrl.increase) << 3) | ctrl.step])
            }
            other => Err(wrong_kind(self, other)),
        }
    }

    fn decode(&self, raw: &[u8]) -> Result<DptValue, KnxError> {
        check_payload_len(self, raw)?;
        Ok(DptValue::Step(StepControl {
            increase: raw[0] & 0x08 != 0,
            step: raw[0] & 0x07,
        }))
    }
}
