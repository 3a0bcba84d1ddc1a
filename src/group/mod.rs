//! # Group Data Layer
//!
//! Application-level view of the bus: named datapoints, their group
//! object bindings with communication flags, and the service that maps
//! between local values and group telegrams.

pub mod datapoint;
pub mod object;
pub mod service;

pub use datapoint::{AccessMode, Datapoint};
pub use object::{CommFlags, GroupObject};
pub use service::{GroupDataService, ValueChange};
