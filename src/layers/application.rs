//! # Layer 7 (Application)
//!
//! Builds and parses group-service APDUs against a datapoint's codec.
//! On the way out, the codec's payload length decides whether the value
//! is embedded in the APCI octet or appended as whole octets; on the way
//! in, the payload length is validated against the codec before decoding.

use crate::apdu::{Apci, Apdu, ApduPayload};
use crate::dpt::{DptCodec, DptValue, PayloadLength};
use crate::error::KnxError;

/// Encodes a value into a GroupValueWrite or GroupValueResponse APDU.
pub fn encode_group_value(
    apci: Apci,
    codec: &dyn DptCodec,
    value: &DptValue,
) -> Result<Apdu, KnxError> {
    debug_assert!(matches!(
        apci,
        Apci::GroupValueWrite | Apci::GroupValueResponse
    ));
    let raw = codec.encode(value)?;
    let payload = match codec.payload_length() {
        PayloadLength::Bits(_) => ApduPayload::Small(raw[0]),
        PayloadLength::Bytes(_) => ApduPayload::Bytes(raw),
    };
    Ok(Apdu::new(apci, payload))
}

/// Decodes the value carried by a GroupValueWrite or GroupValueResponse.
///
/// Fails with [`KnxError::MalformedApdu`] when the APCI is not a value
/// carrier or the payload form/length does not match the codec.
pub fn decode_group_value(apdu: &Apdu, codec: &dyn DptCodec) -> Result<DptValue, KnxError> {
    if !matches!(apdu.apci, Apci::GroupValueWrite | Apci::GroupValueResponse) {
        return Err(KnxError::MalformedApdu(format!(
            "{:?} does not carry a group value",
            apdu.apci
        )));
    }
    match (codec.payload_length(), &apdu.payload) {
        (PayloadLength::Bits(_), ApduPayload::Small(v)) => codec.decode(&[*v]),
        (PayloadLength::Bytes(expected), ApduPayload::Bytes(raw)) => {
            if raw.len() != expected {
                return Err(KnxError::MalformedApdu(format!(
                    "payload of {} octet(s) where DPT {} expects {expected}",
                    raw.len(),
                    codec.id()
                )));
            }
            codec.decode(raw)
        }
        (expected, payload) => Err(KnxError::MalformedApdu(format!(
            "payload {payload:?} does not match DPT {} ({expected:?})",
            codec.id()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dpt::{BooleanCodec, DptId, Float16Codec};

    #[test]
    fn boolean_value_embeds_in_apci_octet() {
        let codec = BooleanCodec::new(DptId::new(1, 1));
        let apdu = encode_group_value(Apci::GroupValueWrite, &codec, &DptValue::Bool(true)).unwrap();
        assert_eq!(apdu.payload, ApduPayload::Small(0x01));
        assert_eq!(decode_group_value(&apdu, &codec).unwrap(), DptValue::Bool(true));
    }

    #[test]
    fn float_value_appends_octets() {
        let codec = Float16Codec::new(DptId::new(9, 1));
        let apdu =
            encode_group_value(Apci::GroupValueResponse, &codec, &DptValue::Float(21.5)).unwrap();
        assert_eq!(apdu.payload, ApduPayload::Bytes(vec![0x0C, 0x33]));
        assert_eq!(
            decode_group_value(&apdu, &codec).unwrap(),
            DptValue::Float(21.5)
        );
    }

    #[test]
    fn payload_length_mismatch_rejected() {
        let codec = Float16Codec::new(DptId::new(9, 1));
        let apdu = Apdu::new(Apci::GroupValueWrite, ApduPayload::Bytes(vec![0x0C]));
        assert!(matches!(
            decode_group_value(&apdu, &codec),
            Err(KnxError::MalformedApdu(_))
        ));
    }

    #[test]
    fn payload_form_mismatch_rejected() {
        // A 2-byte float cannot arrive embedded in the APCI octet.
        let codec = Float16Codec::new(DptId::new(9, 1));
        let apdu = Apdu::new(Apci::GroupValueWrite, ApduPayload::Small(0x21));
        assert!(matches!(
            decode_group_value(&apdu, &codec),
            Err(KnxError::MalformedApdu(_))
        ));
    }

    #[test]
    fn read_request_is_not_a_value_carrier() {
        let codec = BooleanCodec::new(DptId::new(1, 1));
        assert!(decode_group_value(&Apdu::group_read(), &codec).is_err());
    }
}
