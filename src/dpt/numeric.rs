//! Integer and IEEE-float datapoint types
//!
//! - DPT 6.x: 8-bit signed (two's complement byte)
//! - DPT 7.x / 8.x: 2-byte unsigned / signed, big-endian
//! - DPT 12.x / 13.x: 4-byte unsigned / signed, big-endian
//! - DPT 14.x: 4-byte IEEE-754 float, direct bit reinterpretation
//!
//! Integer encode is a pure big-endian reinterpretation; an out-of-range
//! value fails with `ValueRange` and is never clamped or wrapped.

use crate::dpt::{check_payload_len, wrong_kind, DptCodec, DptId, DptValue, PayloadLength, ValueKind};
use crate::error::KnxError;

fn int_from(value: &DptValue, codec: &dyn DptCodec) -> Result<i64, KnxError> {
    match value {
        DptValue::Int(v) => Ok(*v),
        other => Err(wrong_kind(codec, other)),
    }
}

fn range_check(codec: &dyn DptCodec, v: i64, min: i64, max: i64) -> Result<(), KnxError> {
    if v < min || v > max {
        return Err(KnxError::ValueRange(format!(
            "{v} outside {min}..={max} for DPT {}",
            codec.id()
        )));
    }
    Ok(())
}

macro_rules! int_codec {
    ($name:ident, $bytes:expr, $min:expr, $max:expr, $to_bytes:expr, $from_bytes:expr) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name {
            id: DptId,
        }

        impl $name {
            pub fn new(id: DptId) -> Self {
                Self { id }
            }
        }

        impl DptCodec for $name {
            fn id(&self) -> DptId {
                self.id
            }

            fn payload_length(&self) -> PayloadLength {
                PayloadLength::Bytes($bytes)
            }

            fn value_kind(&self) -> ValueKind {
                ValueKind::Int
            }

            fn encode(&self, value: &DptValue) -> Result<Vec<u8>, KnxError> {
                let v = int_from(value, self)?;
                range_check(self, v, $min, $max)?;
                let to_bytes: fn(i64) -> Vec<u8> = $to_bytes;
                Ok(to_bytes(v))
            }

            fn decode(&self, raw: &[u8]) -> Result<DptValue, KnxError> {
                check_payload_len(self, raw)?;
                let from_bytes: fn(&[u8]) -> i64 = $from_bytes;
                Ok(DptValue::Int(from_bytes(raw)))
            }
        }
    };
}

int_codec!(
    Signed8Codec,
    1,
    i64::from(i8::MIN),
    i64::from(i8::MAX),
    |v| vec![v as i8 as u8],
    |raw| i64::from(raw[0] as i8)
);

int_codec!(
    Unsigned16Codec,
    2,
    0,
    i64::from(u16::MAX),
    |v| (v as u16).to_be_bytes().to_vec(),
    |raw| i64::from(u16::from_be_bytes([raw[0], raw[1]]))
);

int_codec!(
    Signed16Codec,
    2,
    i64::from(i16::MIN),
    i64::from(i16::MAX),
    |v| (v as i16).to_be_bytes().to_vec(),
    |raw| i64::from(i16::from_be_bytes([raw[0], raw[1]]))
);

int_codec!(
    Unsigned32Codec,
    4,
    0,
    i64::from(u32::MAX),
    |v| (v as u32).to_be_bytes().to_vec(),
    |raw| i64::from(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
);

int_codec!(
    Signed32Codec,
    4,
    i64::from(i32::MIN),
    i64::from(i32::MAX),
    |v| (v as i32).to_be_bytes().to_vec(),
    |raw| i64::from(i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
);

/// DPT 14.x - 4-byte IEEE-754 float.
#[derive(Debug, Clone, Copy)]
pub struct Float32Codec {
    id: DptId,
}

impl Float32Codec {
    pub fn new(id: DptId) -> Self {
        Self { id }
    }
}

impl DptCodec for Float32Codec {
    fn id(&self) -> DptId {
        self.id
    }

    fn payload_length(&self) -> PayloadLength {
        PayloadLength::Bytes(4)
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Float
    }

    fn encode(&self, value: &DptValue) -> Result<Vec<u8>, KnxError> {
        let v = match value {
            DptValue::Float(v) => *v,
            other => return Err(wrong_kind(self, other)),
        };
        if !v.is_finite() {
            return Err(KnxError::ValueRange(format!(
                "non-finite value for DPT {}",
                self.id
            )));
        }
        let single = v as f32;
        if v.is_normal() && !single.is_finite() {
            return Err(KnxError::ValueRange(format!(
                "{v} overflows 32-bit float for DPT {}",
                self.id
            )));
        }
        Ok(single.to_be_bytes().to_vec())
    }

    fn decode(&self, raw: &[u8]) -> Result<DptValue, KnxError> {
        check_payload_len(self, raw)?;
        let bits = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        Ok(DptValue::Float(f64::from(f32::from_bits(bits))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned16_is_big_endian() {
        let codec = Unsigned16Codec::new(DptId::new(7, 1));
        assert_eq!(codec.encode(&DptValue::Int(0x1234)).unwrap(), vec![0x12, 0x34]);
        assert_eq!(codec.decode(&[0x12, 0x34]).unwrap(), DptValue::Int(0x1234));
    }

    #[test]
    fn unsigned16_rejects_negative() {
        let codec = Unsigned16Codec::new(DptId::new(7, 1));
        assert!(matches!(
            codec.encode(&DptValue::Int(-1)),
            Err(KnxError::ValueRange(_))
        ));
        assert!(matches!(
            codec.encode(&DptValue::Int(65536)),
            Err(KnxError::ValueRange(_))
        ));
    }

    #[test]
    fn signed8_twos_complement() {
        let codec = Signed8Codec::new(DptId::new(6, 10));
        assert_eq!(codec.encode(&DptValue::Int(-1)).unwrap(), vec![0xFF]);
        assert_eq!(codec.decode(&[0x80]).unwrap(), DptValue::Int(-128));
        assert!(codec.encode(&DptValue::Int(128)).is_err());
    }

    #[test]
    fn signed32_extremes_round_trip() {
        let codec = Signed32Codec::new(DptId::new(13, 1));
        for v in [i64::from(i32::MIN), -1, 0, i64::from(i32::MAX)] {
            let raw = codec.encode(&DptValue::Int(v)).unwrap();
            assert_eq!(codec.decode(&raw).unwrap(), DptValue::Int(v));
        }
    }

    #[test]
    fn float32_bit_reinterpretation() {
        let codec = Float32Codec::new(DptId::new(14, 56));
        let raw = codec.encode(&DptValue::Float(1.5)).unwrap();
        assert_eq!(raw, 1.5f32.to_be_bytes().to_vec());
        assert_eq!(codec.decode(&raw).unwrap(), DptValue::Float(1.5));
        assert!(codec.encode(&DptValue::Float(f64::NAN)).is_err());
    }
}
