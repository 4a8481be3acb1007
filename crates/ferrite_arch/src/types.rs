//! Shared data types for device models: grid locations and delays.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// A discrete location on the device grid.
///
/// `x` and `y` address a tile; `z` addresses a slot within the tile
/// (tiles may stack several bels of the same type). Ordering is
/// lexicographic by `(x, y, z)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Loc {
    /// Column index (0-based).
    pub x: i32,
    /// Row index (0-based).
    pub y: i32,
    /// Slot index within the tile (0-based).
    pub z: i32,
}

impl Loc {
    /// Creates a location from its three coordinates.
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// A signed delay in picoseconds.
///
/// Signed so that slack arithmetic (`budget - delay`) stays closed:
/// negative values represent timing failures.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Delay(i64);

impl Delay {
    /// A zero delay.
    pub const ZERO: Delay = Delay(0);

    /// The largest representable delay, used as the identity for `min`.
    pub const MAX: Delay = Delay(i64::MAX);

    /// Creates a delay from picoseconds.
    pub fn from_ps(ps: i64) -> Self {
        Self(ps)
    }

    /// Returns the delay in picoseconds.
    pub fn as_ps(self) -> i64 {
        self.0
    }
}

impl Add for Delay {
    type Output = Delay;

    fn add(self, rhs: Delay) -> Delay {
        Delay(self.0 + rhs.0)
    }
}

impl Sub for Delay {
    type Output = Delay;

    fn sub(self, rhs: Delay) -> Delay {
        Delay(self.0 - rhs.0)
    }
}
