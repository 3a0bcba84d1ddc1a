//! # KNX Addressing
//!
//! This module provides the two interpretations of a 16-bit KNX address:
//! the individual address (area.line.device, 4/4/8 bits) identifying one
//! physical device, and the group address (main/middle/sub, 5/3/8 bits, or
//! the flat two-level main/sub, 5/11 bits) identifying a logical
//! communication object shared by many devices.
//!
//! Both types wrap the raw 16-bit value; component accessors always
//! recompute from the raw value so the fields can never drift out of sync.
//! Equality, ordering and hashing are by the raw value.

use crate::error::KnxError;
use std::fmt;
use std::str::FromStr;

/// KNX individual address identifying one physical device (area.line.device).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndividualAddress {
    raw: u16,
}

impl IndividualAddress {
    /// Maximum area value (4 bits)
    pub const MAX_AREA: u8 = 15;
    /// Maximum line value (4 bits)
    pub const MAX_LINE: u8 = 15;

    /// Creates an individual address from its components.
    pub fn new(area: u8, line: u8, device: u8) -> Result<Self, KnxError> {
        if area > Self::MAX_AREA {
            return Err(KnxError::AddressOutOfRange(format!(
                "area {area} exceeds {}",
                Self::MAX_AREA
            )));
        }
        if line > Self::MAX_LINE {
            return Err(KnxError::AddressOutOfRange(format!(
                "line {line} exceeds {}",
                Self::MAX_LINE
            )));
        }
        let raw = (u16::from(area) << 12) | (u16::from(line) << 8) | u16::from(device);
        Ok(Self { raw })
    }

    pub const fn area(self) -> u8 {
        ((self.raw >> 12) & 0x0F) as u8
    }

    pub const fn line(self) -> u8 {
        ((self.raw >> 8) & 0x0F) as u8
    }

    pub const fn device(self) -> u8 {
        (self.raw & 0xFF) as u8
    }

    pub const fn raw(self) -> u16 {
        self.raw
    }
}

impl From<u16> for IndividualAddress {
    fn from(raw: u16) -> Self {
        Self { raw }
    }
}

impl From<IndividualAddress> for u16 {
    fn from(addr: IndividualAddress) -> u16 {
        addr.raw
    }
}

impl fmt::Display for IndividualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.area(), self.line(), self.device())
    }
}

impl FromStr for IndividualAddress {
    type Err = KnxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(KnxError::AddressParse(format!(
                "expected area.line.device, got {s:?}"
            )));
        }
        let parse = |p: &str| {
            p.parse::<u8>()
                .map_err(|_| KnxError::AddressParse(format!("invalid component {p:?} in {s:?}")))
        };
        Self::new(parse(parts[0])?, parse(parts[1])?, parse(parts[2])?)
    }
}

/// KNX group address identifying a logical communication object.
///
/// Stored as 16 raw bits; the three-level view is main/middle/sub
/// (5/3/8 bits), the two-level view is main/sub (5/11 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupAddress {
    raw: u16,
}

impl GroupAddress {
    /// Maximum main group value (5 bits)
    pub const MAX_MAIN: u8 = 31;
    /// Maximum middle group value (3 bits)
    pub const MAX_MIDDLE: u8 = 7;
    /// Maximum sub value in the two-level view (11 bits)
    pub const MAX_SUB_2LEVEL: u16 = 2047;

    /// Creates a three-level group address (main/middle/sub).
    pub fn new(main: u8, middle: u8, sub: u8) -> Result<Self, KnxError> {
        if main > Self::MAX_MAIN {
            return Err(KnxError::AddressOutOfRange(format!(
                "main group {main} exceeds {}",
                Self::MAX_MAIN
            )));
        }
        if middle > Self::MAX_MIDDLE {
            return Err(KnxError::AddressOutOfRange(format!(
                "middle group {middle} exceeds {}",
                Self::MAX_MIDDLE
            )));
        }
        let raw = (u16::from(main) << 11) | (u16::from(middle) << 8) | u16::from(sub);
        Ok(Self { raw })
    }

    /// Creates a two-level group address (main/sub).
    pub fn new_2level(main: u8, sub: u16) -> Result<Self, KnxError> {
        if main > Self::MAX_MAIN {
            return Err(KnxError::AddressOutOfRange(format!(
                "main group {main} exceeds {}",
                Self::MAX_MAIN
            )));
        }
        if sub > Self::MAX_SUB_2LEVEL {
            return Err(KnxError::AddressOutOfRange(format!(
                "sub group {sub} exceeds {}",
                Self::MAX_SUB_2LEVEL
            )));
        }
        let raw = (u16::from(main) << 11) | sub;
        Ok(Self { raw })
    }

    pub const fn main(self) -> u8 {
        ((self.raw >> 11) & 0x1F) as u8
    }

    pub const fn middle(self) -> u8 {
        ((self.raw >> 8) & 0x07) as u8
    }

    pub const fn sub(self) -> u8 {
        (self.raw & 0xFF) as u8
    }

    /// Sub value in the flat two-level view (11 bits).
    pub const fn sub_2level(self) -> u16 {
        self.raw & 0x07FF
    }

    pub const fn raw(self) -> u16 {
        self.raw
    }

    /// Renders the two-level "main/sub" form.
    pub fn to_string_2level(self) -> String {
        format!("{}/{}", self.main(), self.sub_2level())
    }
}

impl From<u16> for GroupAddress {
    fn from(raw: u16) -> Self {
        Self { raw }
    }
}

impl From<GroupAddress> for u16 {
    fn from(addr: GroupAddress) -> u16 {
        addr.raw
    }
}

impl fmt::Display for GroupAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.main(), self.middle(), self.sub())
    }
}

impl FromStr for GroupAddress {
    type Err = KnxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        let parse = |p: &str| {
            p.parse::<u16>()
                .map_err(|_| KnxError::AddressParse(format!("invalid component {p:?} in {s:?}")))
        };
        let narrow = |v: u16, what: &str, max: u16| {
            if v > max {
                return Err(KnxError::AddressOutOfRange(format!(
                    "{what} {v} exceeds {max}"
                )));
            }
            Ok(v as u8)
        };
        match parts.len() {
            2 => {
                let main = narrow(parse(parts[0])?, "main group", Self::MAX_MAIN.into())?;
                let sub = parse(parts[1])?;
                Self::new_2level(main, sub)
            }
            3 => {
                let main = narrow(parse(parts[0])?, "main group", Self::MAX_MAIN.into())?;
                let middle = narrow(parse(parts[1])?, "middle group", Self::MAX_MIDDLE.into())?;
                let sub = narrow(parse(parts[2])?, "sub group", 255)?;
                Self::new(main, middle, sub)
            }
            _ => Err(KnxError::AddressParse(format!(
                "expected main/middle/sub or main/sub, got {s:?}"
            ))),
        }
    }
}

/// Destination of a network-layer telegram: physical device or group object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnxAddress {
    Individual(IndividualAddress),
    Group(GroupAddress),
}

impl KnxAddress {
    pub const fn raw(self) -> u16 {
        match self {
            KnxAddress::Individual(a) => a.raw(),
            KnxAddress::Group(a) => a.raw(),
        }
    }

    pub const fn is_group(self) -> bool {
        matches!(self, KnxAddress::Group(_))
    }
}

impl fmt::Display for KnxAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnxAddress::Individual(a) => a.fmt(f),
            KnxAddress::Group(a) => a.fmt(f),
        }
    }
}
