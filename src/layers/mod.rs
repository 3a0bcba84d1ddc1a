//! The layers module contains the frame pipeline: the four cooperating
//! layers that wrap an APDU inside successively larger envelopes on the
//! way out (application -> transport -> network -> link) and unwrap them
//! in the opposite order on the way in.
//!
//! Frames are immutable value objects; each layer's envelope owns the
//! inner frame it wraps, and transformation between layers produces a new
//! frame rather than mutating in place.

pub mod application;
pub mod link;
pub mod network;
pub mod transport;

pub use application::{decode_group_value, encode_group_value};
pub use link::{decode_frame, encode_frame, LinkFrame, Priority};
pub use network::Npdu;
pub use transport::{Tpdu, TransportControl, TransportLayer, TransportVerdict};
