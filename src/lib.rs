//! # knx-rs - A Rust Crate for KNX/EIB Bus Communication
//!
//! The knx-rs crate provides a Rust implementation of the KNX (EIB) building
//! automation protocol: the layered telegram pipeline of a TP1 end device,
//! the datapoint type (DPT) codecs that translate between application values
//! and their binary payloads, and the group communication model binding
//! named local datapoints to shared group addresses.
//!
//! ## Features
//!
//! - Encode and decode standard L_Data telegrams, checksum included
//! - DPT codec registry covering the common main types (1.x, 3.x, 6.x-9.x,
//!   10.x-14.x, 16.x) with family-default fallback
//! - Group data service with per-binding communication flags (CRWTU I)
//! - Priority-ordered outbound queue (system, alarm, high, normal)
//! - Connection-oriented transport sequence tracking with expiry
//! - Declarative JSON device configuration
//! - Pluggable transceiver boundary with an in-memory mock for tests
//!
//! ## Usage
//!
//! ```no_run
//! use knx_rs::{DptRegistry, DptValue, KnxStack, MockTransceiver};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), knx_rs::KnxError> {
//! let registry = Arc::new(DptRegistry::with_defaults());
//! let stack = KnxStack::new(
//!     "1.1.10".parse()?,
//!     registry,
//!     Arc::new(MockTransceiver::new()),
//! );
//! stack.start();
//! # Ok(())
//! # }
//! ```

pub mod addressing;
pub mod apdu;
pub mod config;
pub mod constants;
pub mod dpt;
pub mod error;
pub mod group;
pub mod layers;
pub mod logging;
pub mod queue;
pub mod stack;
pub mod transceiver;

pub use crate::error::KnxError;
pub use crate::logging::{init_logger, log_info};

// Addressing and telegram pipeline
pub use addressing::{GroupAddress, IndividualAddress, KnxAddress};
pub use apdu::{Apci, Apdu, ApduPayload};
pub use layers::{decode_frame, encode_frame, LinkFrame, Npdu, Priority, Tpdu};

// Datapoint types
pub use dpt::{DptCodec, DptId, DptRegistry, DptValue, PayloadLength, ValueKind};

// Group communication
pub use group::{AccessMode, CommFlags, Datapoint, GroupDataService, GroupObject, ValueChange};

// Stack and its boundaries
pub use config::DeviceConfig;
pub use queue::FramePriorityQueue;
pub use stack::KnxStack;
pub use transceiver::{MockTransceiver, Transceiver};
