//! Internal-error types for broken toolchain invariants.
//!
//! Placement distinguishes two failure classes. Failures caused by the
//! design or the device — no free bel of a matching type, a constraint
//! chain that fits nowhere — are expected outcomes; the crate detecting
//! them raises its own typed error and reports through the diagnostics
//! sink. [`InternalError`] is reserved for states the toolchain promises
//! can never arise: a netlist whose name index disagrees with its cells,
//! a placement map entry pointing at an unbound cell. Hitting one means
//! a bug in ferrite, not a problem with the user's design.

/// The standard result type for operations that can only fail on a
/// broken internal invariant.
pub type FerriteResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in ferrite, not a user input problem.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the broken invariant.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
