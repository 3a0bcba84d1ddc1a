//! # APDU Model
//!
//! An Application Protocol Data Unit is an application-layer control code
//! (APCI) plus an optional payload. The 10-bit APCI is packed across the
//! first two TPDU octets: bits 9..8 in the low two bits of the TPCI octet,
//! bits 7..6 in the high two bits of the following octet. Payloads of six
//! bits or fewer (boolean, dimming step) ride inside that octet's low
//! bits; larger payloads are appended as whole octets.
//!
//! APDUs are constructed fresh per telegram and immutable after that.

use crate::constants::{
    APCI_ADC_READ, APCI_DEVICE_DESCRIPTOR_READ, APCI_DEVICE_DESCRIPTOR_RESPONSE,
    APCI_GROUP_VALUE_READ, APCI_GROUP_VALUE_RESPONSE, APCI_GROUP_VALUE_WRITE,
    APCI_INDIVIDUAL_ADDRESS_READ, APCI_INDIVIDUAL_ADDRESS_RESPONSE, APCI_INDIVIDUAL_ADDRESS_WRITE,
    APCI_MEMORY_READ, APCI_RESTART, APCI_SMALL_PAYLOAD_MAX,
};
use crate::error::KnxError;

/// Application-layer control codes (10-bit APCI values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apci {
    GroupValueRead,
    GroupValueResponse,
    GroupValueWrite,
    IndividualAddressWrite,
    IndividualAddressRead,
    IndividualAddressResponse,
    AdcRead,
    MemoryRead,
    DeviceDescriptorRead,
    DeviceDescriptorResponse,
    Restart,
    Other(u16),
}

impl Apci {
    pub const fn code(self) -> u16 {
        match self {
            Apci::GroupValueRead => APCI_GROUP_VALUE_READ,
            Apci::GroupValueResponse => APCI_GROUP_VALUE_RESPONSE,
            Apci::GroupValueWrite => APCI_GROUP_VALUE_WRITE,
            Apci::IndividualAddressWrite => APCI_INDIVIDUAL_ADDRESS_WRITE,
            Apci::IndividualAddressRead => APCI_INDIVIDUAL_ADDRESS_READ,
            Apci::IndividualAddressResponse => APCI_INDIVIDUAL_ADDRESS_RESPONSE,
            Apci::AdcRead => APCI_ADC_READ,
            Apci::MemoryRead => APCI_MEMORY_READ,
            Apci::DeviceDescriptorRead => APCI_DEVICE_DESCRIPTOR_READ,
            Apci::DeviceDescriptorResponse => APCI_DEVICE_DESCRIPTOR_RESPONSE,
            Apci::Restart => APCI_RESTART,
            Apci::Other(code) => code,
        }
    }

    pub const fn from_code(code: u16) -> Self {
        match code {
            APCI_GROUP_VALUE_READ => Apci::GroupValueRead,
            APCI_GROUP_VALUE_RESPONSE => Apci::GroupValueResponse,
            APCI_GROUP_VALUE_WRITE => Apci::GroupValueWrite,
            APCI_INDIVIDUAL_ADDRESS_WRITE => Apci::IndividualAddressWrite,
            APCI_INDIVIDUAL_ADDRESS_READ => Apci::IndividualAddressRead,
            APCI_INDIVIDUAL_ADDRESS_RESPONSE => Apci::IndividualAddressResponse,
            APCI_ADC_READ => Apci::AdcRead,
            APCI_MEMORY_READ => Apci::MemoryRead,
            APCI_DEVICE_DESCRIPTOR_READ => Apci::DeviceDescriptorRead,
            APCI_DEVICE_DESCRIPTOR_RESPONSE => Apci::DeviceDescriptorResponse,
            APCI_RESTART => Apci::Restart,
            other => Apci::Other(other),
        }
    }

    pub const fn is_group_service(self) -> bool {
        matches!(
            self,
            Apci::GroupValueRead | Apci::GroupValueResponse | Apci::GroupValueWrite
        )
    }
}

/// Payload carried by an APDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApduPayload {
    /// No payload (e.g. GroupValueRead).
    None,
    /// Small payload (<= 6 bits) embedded in the APCI octet.
    Small(u8),
    /// Payload appended as whole octets.
    Bytes(Vec<u8>),
}

impl ApduPayload {
    /// Payload content as a byte slice, regardless of carriage form.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            ApduPayload::None => &[],
            ApduPayload::Small(v) => std::slice::from_ref(v),
            ApduPayload::Bytes(b) => b,
        }
    }
}

/// An application-layer protocol data unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apdu {
    pub apci: Apci,
    pub payload: ApduPayload,
}

impl Apdu {
    pub fn new(apci: Apci, payload: ApduPayload) -> Self {
        Self { apci, payload }
    }

    /// A GroupValueRead request (always empty payload).
    pub fn group_read() -> Self {
        Self::new(Apci::GroupValueRead, ApduPayload::None)
    }

    /// Packs the APDU into TPDU octets.
    ///
    /// Octet 0 carries only the APCI high bits (the TPCI bits are filled
    /// in by the transport layer); octet 1 carries APCI bits 7..6 plus an
    /// embedded small payload, followed by appended payload octets.
    pub fn to_bytes(&self) -> Result<Vec<u8>, KnxError> {
        let code = self.apci.code();
        let mut bytes = vec![((code >> 8) & 0x03) as u8, (code & 0xC0) as u8];
        match &self.payload {
            ApduPayload::None => {}
            ApduPayload::Small(v) => {
                if *v > APCI_SMALL_PAYLOAD_MAX {
                    return Err(KnxError::MalformedApdu(format!(
                        "small payload {v:#04x} exceeds 6 bits"
                    )));
                }
                bytes[1] |= v;
            }
            ApduPayload::Bytes(data) => bytes.extend_from_slice(data),
        }
        Ok(bytes)
    }

    /// Parses an APDU from TPDU octets (TPCI bits already masked off).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KnxError> {
        if bytes.len() < 2 {
            return Err(KnxError::MalformedApdu(format!(
                "TPDU too short for an APCI: {} byte(s)",
                bytes.len()
            )));
        }
        let code = (u16::from(bytes[0] & 0x03) << 8) | u16::from(bytes[1] & 0xC0);
        let apci = Apci::from_code(code);
        let payload = if bytes.len() > 2 {
            ApduPayload::Bytes(bytes[2..].to_vec())
        } else {
            match apci {
                // GroupValueRead carries no data; its low bits must be clear.
                Apci::GroupValueRead => {
                    if bytes[1] & 0x3F != 0 {
                        return Err(KnxError::MalformedApdu(
                            "GroupValueRead with embedded payload".into(),
                        ));
                    }
                    ApduPayload::None
                }
                _ => ApduPayload::Small(bytes[1] & 0x3F),
            }
        };
        Ok(Self { apci, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_read_packs_to_two_clear_octets() {
        let bytes = Apdu::group_read().to_bytes().unwrap();
        assert_eq!(bytes, vec![0x00, 0x00]);
        let apdu = Apdu::from_bytes(&bytes).unwrap();
        assert_eq!(apdu.apci, Apci::GroupValueRead);
        assert_eq!(apdu.payload, ApduPayload::None);
    }

    #[test]
    fn small_payload_embeds_in_apci_octet() {
        let apdu = Apdu::new(Apci::GroupValueWrite, ApduPayload::Small(0x01));
        let bytes = apdu.to_bytes().unwrap();
        assert_eq!(bytes, vec![0x00, 0x81]);
        assert_eq!(Apdu::from_bytes(&bytes).unwrap(), apdu);
    }

    #[test]
    fn byte_payload_appends_octets() {
        let apdu = Apdu::new(
            Apci::GroupValueResponse,
            ApduPayload::Bytes(vec![0x0C, 0x33]),
        );
        let bytes = apdu.to_bytes().unwrap();
        assert_eq!(bytes, vec![0x00, 0x40, 0x0C, 0x33]);
        assert_eq!(Apdu::from_bytes(&bytes).unwrap(), apdu);
    }

    #[test]
    fn short_tpdu_rejected() {
        assert!(matches!(
            Apdu::from_bytes(&[0x00]),
            Err(KnxError::MalformedApdu(_))
        ));
    }

    #[test]
    fn read_with_embedded_bits_rejected() {
        assert!(matches!(
            Apdu::from_bytes(&[0x00, 0x01]),
            Err(KnxError::MalformedApdu(_))
        ));
    }

    #[test]
    fn unknown_apci_becomes_other() {
        let apdu = Apdu::from_bytes(&[0x02, 0x40, 0xAA]).unwrap();
        assert_eq!(apdu.apci, Apci::Other(0x240));
    }
}
