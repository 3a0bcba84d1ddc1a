//! # Layer 2 (Data Link)
//!
//! Wire codec for the TP1 `L_Data.standard` telegram:
//!
//! ```text
//! octet 0      control (frame format, repeat flag, priority bits 3..2)
//! octets 1-2   source individual address, big-endian
//! octets 3-4   destination address, big-endian
//! octet 5      address type (bit 7) | hop count (bits 6..4) | length
//! octet 6      TPCI / APCI high bits
//! octet 7..    APCI low bits (+ embedded small payload), payload octets
//! last octet   check octet: inverted XOR over all preceding octets
//! ```
//!
//! The length nibble counts the octets following the TPCI octet. A
//! checksum mismatch on receive yields [`KnxError::FrameCorrupted`]; the
//! caller drops the frame and keeps processing, since corrupt telegrams
//! are expected on a shared bus.

use crate::addressing::{GroupAddress, IndividualAddress, KnxAddress};
use crate::constants::{
    KNX_ADDRESS_TYPE_GROUP, KNX_CONTROL_FIXED_BIT, KNX_CONTROL_FRAME_FORMAT_STANDARD,
    KNX_CONTROL_NOT_REPEATED, KNX_MASK_PAYLOAD_LENGTH,
};
use crate::error::KnxError;
use crate::layers::network::Npdu;
use crate::layers::transport::Tpdu;
use bytes::{BufMut, BytesMut};
use nom::number::complete::{be_u16, be_u8};
use nom::bytes::complete::take;
use nom::IResult;

/// KNX priority classes, highest severity first.
///
/// The derived ordering (declaration order) is the queue ordering. The
/// control-octet bit patterns do not follow severity: System is 00,
/// Alarm 10, High 01 (a.k.a. urgent), Normal 11 (a.k.a. low). The two
/// naming schemes found in KNX documentation map onto the same levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    System,
    Alarm,
    High,
    Normal,
}

impl Priority {
    /// Alias for [`Priority::High`] in the urgent/low naming scheme.
    pub const URGENT: Priority = Priority::High;
    /// Alias for [`Priority::Normal`] in the urgent/low naming scheme.
    pub const LOW: Priority = Priority::Normal;

    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Priority::System,
            0b10 => Priority::Alarm,
            0b01 => Priority::High,
            _ => Priority::Normal,
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            Priority::System => 0b00,
            Priority::Alarm => 0b10,
            Priority::High => 0b01,
            Priority::Normal => 0b11,
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = KnxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Ok(Priority::System),
            "alarm" => Ok(Priority::Alarm),
            "high" | "urgent" => Ok(Priority::High),
            "normal" | "low" => Ok(Priority::Normal),
            other => Err(KnxError::InvalidConfig(format!(
                "unknown priority {other:?}"
            ))),
        }
    }
}

/// An immutable link-layer frame wrapping a network-layer NPDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFrame {
    pub priority: Priority,
    /// Set when the frame is a repetition of an earlier transmission.
    pub repeated: bool,
    pub npdu: Npdu,
}

impl LinkFrame {
    pub fn new(priority: Priority, npdu: Npdu) -> Self {
        Self {
            priority,
            repeated: false,
            npdu,
        }
    }

    fn control_octet(&self) -> u8 {
        let mut ctrl = KNX_CONTROL_FRAME_FORMAT_STANDARD | KNX_CONTROL_FIXED_BIT;
        if !self.repeated {
            ctrl |= KNX_CONTROL_NOT_REPEATED;
        }
        ctrl | (self.priority.bits() << 2)
    }
}

/// Packs a link frame into wire octets, appending the check octet.
pub fn encode_frame(frame: &LinkFrame) -> Result<Vec<u8>, KnxError> {
    let tpdu = frame.npdu.tpdu.to_bytes()?;
    // Length nibble counts the octets after the TPCI octet.
    let payload_len = tpdu.len() - 1;
    if payload_len > usize::from(KNX_MASK_PAYLOAD_LENGTH) {
        return Err(KnxError::MalformedApdu(format!(
            "payload of {payload_len} octets exceeds a standard frame"
        )));
    }

    let mut buf = BytesMut::with_capacity(8 + tpdu.len());
    buf.put_u8(frame.control_octet());
    buf.put_u16(frame.npdu.source.raw());
    buf.put_u16(frame.npdu.destination.raw());
    let mut at_hop_len = (frame.npdu.hop_count & 0x07) << 4 | payload_len as u8;
    if frame.npdu.destination.is_group() {
        at_hop_len |= KNX_ADDRESS_TYPE_GROUP;
    }
    buf.put_u8(at_hop_len);
    buf.put_slice(&tpdu);
    buf.put_u8(check_octet(&buf));
    Ok(buf.to_vec())
}

/// Inverted XOR over all frame octets preceding the check octet.
fn check_octet(data: &[u8]) -> u8 {
    !data.iter().fold(0u8, |acc, b| acc ^ b)
}

struct RawFrame<'a> {
    control: u8,
    source: u16,
    destination: u16,
    at_hop_len: u8,
    tpdu: &'a [u8],
    checksum: u8,
}

fn parse_frame(input: &[u8]) -> IResult<&[u8], RawFrame<'_>> {
    let (input, control) = be_u8(input)?;
    let (input, source) = be_u16(input)?;
    let (input, destination) = be_u16(input)?;
    let (input, at_hop_len) = be_u8(input)?;
    let payload_len = usize::from(at_hop_len & KNX_MASK_PAYLOAD_LENGTH);
    let (input, tpdu) = take(payload_len + 1)(input)?;
    let (input, checksum) = be_u8(input)?;
    Ok((
        input,
        RawFrame {
            control,
            source,
            destination,
            at_hop_len,
            tpdu,
            checksum,
        },
    ))
}

/// Parses and verifies a link frame from wire octets.
///
/// Structural failures yield [`KnxError::FrameParse`], a check-octet
/// mismatch yields [`KnxError::FrameCorrupted`]. The check octet is
/// verified before the TPDU is interpreted, so a corrupt frame never
/// reports a transport- or application-layer error.
pub fn decode_frame(bytes: &[u8]) -> Result<LinkFrame, KnxError> {
    let (remaining, raw) =
        parse_frame(bytes).map_err(|e| KnxError::FrameParse(e.to_string()))?;
    if !remaining.is_empty() {
        return Err(KnxError::FrameParse(format!(
            "{} trailing byte(s) after frame",
            remaining.len()
        )));
    }
    let calculated = check_octet(&bytes[..bytes.len() - 1]);
    if raw.checksum != calculated {
        return Err(KnxError::FrameCorrupted {
            expected: raw.checksum,
            calculated,
        });
    }

    if raw.control & KNX_CONTROL_FRAME_FORMAT_STANDARD == 0 {
        return Err(KnxError::FrameParse(
            "extended format frames are not supported".into(),
        ));
    }
    let destination = if raw.at_hop_len & KNX_ADDRESS_TYPE_GROUP != 0 {
        KnxAddress::Group(GroupAddress::from(raw.destination))
    } else {
        KnxAddress::Individual(IndividualAddress::from(raw.destination))
    };
    Ok(LinkFrame {
        priority: Priority::from_bits((raw.control >> 2) & 0b11),
        repeated: raw.control & KNX_CONTROL_NOT_REPEATED == 0,
        npdu: Npdu {
            source: IndividualAddress::from(raw.source),
            destination,
            hop_count: (raw.at_hop_len >> 4) & 0x07,
            tpdu: Tpdu::from_raw(raw.tpdu)?,
        },
    })
}
