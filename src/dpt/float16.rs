//! DPT 9.x - 2-byte float
//!
//! Custom 16-bit floating point format:
//!
//! ```text
//! Byte 0: SEEE EMMM
//! Byte 1: MMMM MMMM
//!
//! S = sign bit, E = 4-bit exponent, M = 11-bit two's-complement mantissa
//! Value = 0.01 * mantissa * 2^exponent
//! ```
//!
//! Encode picks the smallest exponent whose mantissa fits the signed
//! 11-bit range (-2048..=2047), rounding to the nearest representable
//! step of `0.01 * 2^exponent`. The reserved wire pattern `0x7FFF`
//! means "invalid data" and fails decoding with `ValueFormat`.

use crate::constants::DPT9_INVALID_DATA;
use crate::dpt::{check_payload_len, wrong_kind, DptCodec, DptId, DptValue, PayloadLength, ValueKind};
use crate::error::KnxError;

/// Largest encodable value (mantissa 2046, exponent 15). Mantissa 2047
/// at exponent 15 is the reserved invalid-data pattern 0x7FFF.
pub const DPT9_MAX: f64 = 670_433.28;
/// Smallest value representable by the format (mantissa -2048, exponent 15).
pub const DPT9_MIN: f64 = -671_088.64;

#[derive(Debug, Clone, Copy)]
pub struct Float16Codec {
    id: DptId,
}

impl Float16Codec {
    pub fn new(id: DptId) -> Self {
        Self { id }
    }
}

impl DptCodec for Float16Codec {
    fn id(&self) -> DptId {
        self.id
    }

    fn payload_length(&self) -> PayloadLength {
        PayloadLength::Bytes(2)
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Float
    }

    fn encode(&self, value: &DptValue) -> Result<Vec<u8>, KnxError> {
        let v = match value {
            DptValue::Float(v) => *v,
            other => return Err(wrong_kind(self, other)),
        };
        if !v.is_finite() || !(DPT9_MIN..=DPT9_MAX).contains(&v) {
            return Err(KnxError::ValueRange(format!(
                "{v} outside {DPT9_MIN}..={DPT9_MAX} for DPT {}",
                self.id
            )));
        }

        // Smallest exponent whose rounded mantissa fits 11 signed bits.
        let mut exponent = 0u16;
        let mut mantissa = (v * 100.0).round();
        while !(-2048.0..=2047.0).contains(&mantissa) && exponent < 15 {
            exponent += 1;
            mantissa = (v * 100.0 / f64::from(1u32 << exponent)).round();
        }
        if !(-2048.0..=2047.0).contains(&mantissa) {
            return Err(KnxError::ValueRange(format!(
                "{v} not representable for DPT {}",
                self.id
            )));
        }
        let mantissa = mantissa as i16;

        let sign = u16::from(mantissa < 0) << 15;
        let word = sign | (exponent << 11) | (mantissa as u16 & 0x07FF);
        // 0x7FFF would be indistinguishable from the invalid pattern.
        if word == DPT9_INVALID_DATA {
            return Err(KnxError::ValueRange(format!(
                "{v} rounds to the reserved invalid pattern for DPT {}",
                self.id
            )));
        }
        Ok(word.to_be_bytes().to_vec())
    }

    fn decode(&self, raw: &[u8]) -> Result<DptValue, KnxError> {
        check_payload_len(self, raw)?;
        let word = u16::from_be_bytes([raw[0], raw[1]]);
        if word == DPT9_INVALID_DATA {
            return Err(KnxError::ValueFormat(format!(
                "reserved invalid-data pattern for DPT {}",
                self.id
            )));
        }
        let exponent = (word >> 11) & 0x0F;
        let mut mantissa = i32::from(word & 0x07FF);
        if word & 0x8000 != 0 {
            mantissa -= 2048;
        }
        Ok(DptValue::Float(
            0.01 * f64::from(mantissa) * f64::from(1u32 << exponent),
        ))
    }
}
