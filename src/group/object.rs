//! Group objects: the binding of a local datapoint to a group address,
//! gated by communication flags.

use crate::addressing::GroupAddress;
use crate::error::KnxError;
use crate::layers::link::Priority;
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Communication flags controlling which telegram directions a group
    /// object participates in.
    ///
    /// `COMMUNICATION` is the master gate: with it cleared the object is
    /// detached from the bus entirely, whatever else is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommFlags: u8 {
        const COMMUNICATION = 0b0000_0001;
        const READ          = 0b0000_0010;
        const WRITE         = 0b0000_0100;
        const TRANSMIT      = 0b0000_1000;
        const UPDATE        = 0b0001_0000;
        const INIT          = 0b0010_0000;
    }
}

impl CommFlags {
    /// Whether the object answers GroupValueRead with a response.
    pub fn readable(self) -> bool {
        self.contains(CommFlags::COMMUNICATION | CommFlags::READ)
    }

    /// Whether the object accepts GroupValueWrite from the bus.
    pub fn writable(self) -> bool {
        self.contains(CommFlags::COMMUNICATION | CommFlags::WRITE)
    }

    /// Whether a local write is sent to the bus.
    pub fn transmits(self) -> bool {
        self.contains(CommFlags::COMMUNICATION | CommFlags::TRANSMIT)
    }

    /// Whether GroupValueResponse telegrams update the local value.
    pub fn updates(self) -> bool {
        self.contains(CommFlags::COMMUNICATION | CommFlags::UPDATE)
    }
}

impl fmt::Display for CommFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, letter) in [
            (CommFlags::COMMUNICATION, 'C'),
            (CommFlags::READ, 'R'),
            (CommFlags::WRITE, 'W'),
            (CommFlags::TRANSMIT, 'T'),
            (CommFlags::UPDATE, 'U'),
            (CommFlags::INIT, 'I'),
        ] {
            if self.contains(flag) {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for CommFlags {
    type Err = KnxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = CommFlags::empty();
        for c in s.chars() {
            flags |= match c.to_ascii_uppercase() {
                'C' => CommFlags::COMMUNICATION,
                'R' => CommFlags::READ,
                'W' => CommFlags::WRITE,
                'T' => CommFlags::TRANSMIT,
                'U' => CommFlags::UPDATE,
                'I' => CommFlags::INIT,
                other => {
                    return Err(KnxError::InvalidConfig(format!(
                        "unknown communication flag {other:?}"
                    )))
                }
            };
        }
        Ok(flags)
    }
}

/// One datapoint bound to one group address.
#[derive(Debug, Clone)]
pub struct GroupObject {
    pub datapoint: String,
    pub address: GroupAddress,
    pub flags: CommFlags,
    pub priority: Priority,
}
