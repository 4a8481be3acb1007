//! FPGA device models for the ferrite place-and-route toolchain.
//!
//! This crate defines the [`Device`] trait that abstracts over device
//! databases, the shared location and delay types, and [`GridDevice`],
//! a concrete rectangular-grid model used by demos and tests.
//!
//! The placement core consumes devices exclusively through [`Device`];
//! real device families provide their own implementations backed by
//! vendor databases.

#![warn(missing_docs)]

pub mod device;
pub mod grid;
pub mod ids;
pub mod types;

pub use device::Device;
pub use grid::GridDevice;
pub use ids::BelId;
pub use types::{Delay, Loc};
