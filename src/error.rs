//! # KNX Error Handling
//!
//! This module defines the KnxError enum, which represents the different error
//! types that can occur in the knx-rs crate.
//!
//! Errors fall into three groups with different propagation rules: codec
//! errors ([`KnxError::UnknownDpt`], [`KnxError::ValueRange`],
//! [`KnxError::ValueFormat`], [`KnxError::ValueTooLong`]) surface
//! synchronously to the caller when they arise from an outbound encode;
//! pipeline errors ([`KnxError::MalformedApdu`], [`KnxError::HopCountExceeded`],
//! [`KnxError::FrameCorrupted`]) are logged and the offending telegram is
//! dropped when they arise from inbound bus traffic; configuration errors
//! ([`KnxError::DuplicateBinding`], [`KnxError::UnknownDatapoint`],
//! [`KnxError::InvalidConfig`]) are fatal at startup.

use thiserror::Error;

/// Represents the different error types that can occur in the KNX crate.
#[derive(Debug, Error)]
pub enum KnxError {
    /// Indicates an unregistered datapoint type identifier.
    #[error("Unknown DPT: {0}")]
    UnknownDpt(String),

    /// Indicates a value outside the range its DPT can represent.
    #[error("Value out of range: {0}")]
    ValueRange(String),

    /// Indicates a value (or payload) that does not match its DPT format.
    #[error("Invalid value format: {0}")]
    ValueFormat(String),

    /// Indicates a string value exceeding the fixed DPT buffer size.
    #[error("Value too long: {actual} bytes exceeds maximum of {max}")]
    ValueTooLong { max: usize, actual: usize },

    /// Indicates an unrecognized APCI or a payload length mismatch.
    #[error("Malformed APDU: {0}")]
    MalformedApdu(String),

    /// Indicates an exhausted hop count on a received telegram.
    #[error("Hop count exceeded")]
    HopCountExceeded,

    /// Indicates a checksum mismatch on a received link-layer frame.
    #[error("Frame corrupted: check octet {expected:#04x}, calculated {calculated:#04x}")]
    FrameCorrupted { expected: u8, calculated: u8 },

    /// Indicates an error when parsing a link-layer frame.
    #[error("Error parsing KNX frame: {0}")]
    FrameParse(String),

    /// Indicates an address component outside its field width.
    #[error("Address component out of range: {0}")]
    AddressOutOfRange(String),

    /// Indicates an unparseable address string.
    #[error("Invalid address string: {0}")]
    AddressParse(String),

    /// Indicates a datapoint already bound to the same group address.
    #[error("Datapoint {datapoint} is already bound to {address}")]
    DuplicateBinding { datapoint: String, address: String },

    /// Indicates a reference to a datapoint that was never created.
    #[error("Unknown datapoint: {0}")]
    UnknownDatapoint(String),

    /// Indicates invalid declarative device configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Indicates an error at the transceiver boundary.
    #[error("Transceiver error: {0}")]
    Transceiver(String),

    /// Indicates an operation against a stopped stack.
    #[error("Stack is stopped")]
    StackStopped,
}
