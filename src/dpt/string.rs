//! DPT 16.x - Character string
//!
//! Fixed 14-byte ISO-8859-1 buffer, null-padded. Decode trims trailing
//! NULs; encode fails with `ValueTooLong` past 14 bytes and with
//! `ValueFormat` for characters outside Latin-1.

use crate::constants::DPT16_STRING_LENGTH;
use crate::dpt::{check_payload_len, wrong_kind, DptCodec, DptId, DptValue, PayloadLength, ValueKind};
use crate::error::KnxError;

#[derive(Debug, Clone, Copy)]
pub struct StringCodec {
    id: DptId,
}

impl StringCodec {
    pub fn new(id: DptId) -> Self {
        Self { id }
    }
}

impl DptCodec for StringCodec {
    fn id(&self) -> DptId {
        self.id
    }

    fn payload_length(&self) -> PayloadLength {
        PayloadLength::Bytes(DPT16_STRING_LENGTH)
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Str
    }

    fn encode(&self, value: &DptValue) -> Result<Vec<u8>, KnxError> {
        let s = match value {
            DptValue::Str(s) => s,
            other => return Err(wrong_kind(self, other)),
        };
        let mut buf = Vec::with_capacity(DPT16_STRING_LENGTH);
        for c in s.chars() {
            let code = u32::from(c);
            if code > 0xFF {
                return Err(KnxError::ValueFormat(format!(
                    "character {c:?} outside ISO-8859-1 for DPT {}",
                    self.id
                )));
            }
            buf.push(code as u8);
        }
        if buf.len() > DPT16_STRING_LENGTH {
            return Err(KnxError::ValueTooLong {
                max: DPT16_STRING_LENGTH,
                actual: buf.len(),
            });
        }
        buf.resize(DPT16_STRING_LENGTH, 0);
        Ok(buf)
    }

    fn decode(&self, raw: &[u8]) -> Result<DptValue, KnxError> {
        check_payload_len(self, raw)?;
        let trimmed = raw
            .iter()
            .rposition(|&b| b != 0)
            .map_or(&raw[..0], |end| &raw[..=end]);
        // ISO-8859-1 maps byte-for-byte onto the first 256 code points.
        Ok(DptValue::Str(trimmed.iter().map(|&b| b as char).collect()))
    }
}
