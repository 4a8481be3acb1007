//! Shared foundational types for the ferrite place-and-route toolchain.
//!
//! Provides interned type tags used throughout the device and netlist
//! models, and the result types for internal (bug-class) errors.

#![warn(missing_docs)]

pub mod ident;
pub mod result;

pub use ident::{Ident, Interner};
pub use result::{FerriteResult, InternalError};
