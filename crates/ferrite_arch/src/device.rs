//! The device-database trait consumed by the placement core.

use crate::ids::BelId;
use crate::types::{Delay, Loc};
use ferrite_common::Ident;

/// Read-only access to a device database.
///
/// This is the minimum surface the placement core needs: bel enumeration
/// and lookup, grid extents for spatial searches, the global-buffer and
/// validity predicates, and the delay oracle for timing-driven cost.
/// Implementations must enumerate bels in a stable order, placement
/// determinism depends on it.
///
/// The live placement map is *not* part of the device; it belongs to the
/// placement context that wraps a `Device`.
pub trait Device {
    /// All bels in the device, in a stable, deterministic order.
    fn bels(&self) -> &[BelId];

    /// The type tag of a bel.
    fn bel_type(&self, bel: BelId) -> Ident;

    /// Maps a cell type tag to the bel type that can implement it.
    ///
    /// Returns `None` if no bel type on this device implements the cell
    /// type.
    fn bel_type_for_cell(&self, cell_ty: Ident) -> Option<Ident>;

    /// The grid location of a bel.
    fn bel_location(&self, bel: BelId) -> Loc;

    /// Inverse lookup: the bel at a location, if any.
    fn bel_at_location(&self, loc: Loc) -> Option<BelId>;

    /// Number of grid columns.
    fn grid_dim_x(&self) -> i32;

    /// Number of grid rows.
    fn grid_dim_y(&self) -> i32;

    /// Number of bel slots stacked at tile `(x, y)`.
    fn tile_dim_z(&self, x: i32, y: i32) -> i32;

    /// Whether a bel drives a global network (clock buffers and similar).
    ///
    /// Global-buffer bels are excluded from wirelength estimation.
    fn bel_global_buf(&self, bel: BelId) -> bool;

    /// Architecture-specific legality of placing a cell of the given type
    /// on a bel (beyond the basic type match).
    fn is_valid_bel_for_cell(&self, cell_ty: Ident, bel: BelId) -> bool;

    /// Estimates the routing delay between two locations.
    fn predict_delay(&self, from: Loc, to: Loc) -> Delay;

    /// Converts a delay to nanoseconds.
    fn delay_ns(&self, delay: Delay) -> f64 {
        delay.as_ps() as f64 / 1000.0
    }
}
