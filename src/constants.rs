//! KNX Protocol Constants
//!
//! This module defines constants used in the KNX protocol implementation,
//! based on the KNX standard TP1 telegram layout.

/// Control octet bit for the standard (non-extended) frame format
pub const KNX_CONTROL_FRAME_FORMAT_STANDARD: u8 = 0x80;

/// Control octet bit that is fixed to 1 in L_Data frames
pub const KNX_CONTROL_FIXED_BIT: u8 = 0x10;

/// Control octet bit set when the frame is an original (not a repetition)
pub const KNX_CONTROL_NOT_REPEATED: u8 = 0x20;

/// Control octet mask for the priority bits (bits 3..2)
pub const KNX_CONTROL_MASK_PRIORITY: u8 = 0x0C;

/// Address-type/hop octet bit set for group-addressed telegrams
pub const KNX_ADDRESS_TYPE_GROUP: u8 = 0x80;

/// Address-type/hop octet mask for the hop count (bits 6..4)
pub const KNX_MASK_HOP_COUNT: u8 = 0x70;

/// Address-type/hop octet mask for the payload length nibble
pub const KNX_MASK_PAYLOAD_LENGTH: u8 = 0x0F;

/// Default hop count stamped on outgoing telegrams
pub const KNX_DEFAULT_HOP_COUNT: u8 = 6;

// ----------------------------------------------------------------------------
// TPCI (transport control) octet layout
// ----------------------------------------------------------------------------

/// TPCI bit distinguishing control frames from data frames
pub const TPCI_CONTROL_FLAG: u8 = 0x80;

/// TPCI bit set for connection-oriented (numbered) frames
pub const TPCI_NUMBERED_FLAG: u8 = 0x40;

/// TPCI mask for the 4-bit sequence number (bits 5..2)
pub const TPCI_MASK_SEQUENCE: u8 = 0x3C;

/// TPCI code for T_Connect
pub const TPCI_CONNECT: u8 = 0x80;

/// TPCI code for T_Disconnect
pub const TPCI_DISCONNECT: u8 = 0x81;

/// TPCI base code for T_Ack (sequence number in bits 5..2)
pub const TPCI_ACK: u8 = 0xC2;

/// TPCI base code for T_Nack (sequence number in bits 5..2)
pub const TPCI_NACK: u8 = 0xC3;

// ----------------------------------------------------------------------------
// APCI (application control) codes, 10 bits
// ----------------------------------------------------------------------------

pub const APCI_GROUP_VALUE_READ: u16 = 0x000;
pub const APCI_GROUP_VALUE_RESPONSE: u16 = 0x040;
pub const APCI_GROUP_VALUE_WRITE: u16 = 0x080;
pub const APCI_INDIVIDUAL_ADDRESS_WRITE: u16 = 0x0C0;
pub const APCI_INDIVIDUAL_ADDRESS_READ: u16 = 0x100;
pub const APCI_INDIVIDUAL_ADDRESS_RESPONSE: u16 = 0x140;
pub const APCI_ADC_READ: u16 = 0x180;
pub const APCI_MEMORY_READ: u16 = 0x200;
pub const APCI_DEVICE_DESCRIPTOR_READ: u16 = 0x300;
pub const APCI_DEVICE_DESCRIPTOR_RESPONSE: u16 = 0x340;
pub const APCI_RESTART: u16 = 0x380;

/// Largest payload value that can ride inside the APCI octet's low 6 bits
pub const APCI_SMALL_PAYLOAD_MAX: u8 = 0x3F;

// ----------------------------------------------------------------------------
// DPT framing
// ----------------------------------------------------------------------------

/// Fixed buffer size of DPT 16.x character strings
pub const DPT16_STRING_LENGTH: usize = 14;

/// Reserved DPT 9.x wire pattern meaning "invalid data"
pub const DPT9_INVALID_DATA: u16 = 0x7FFF;
