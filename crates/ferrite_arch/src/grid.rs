//! A concrete rectangular-grid device model.
//!
//! [`GridDevice`] implements [`Device`] over an explicit list of bels on
//! a `width x height` grid, with a Manhattan-distance delay model. It is
//! the device used by demos and by the placement core's tests; real
//! device families plug in their own [`Device`] implementations.

use crate::device::Device;
use crate::ids::BelId;
use crate::types::{Delay, Loc};
use ferrite_common::Ident;
use std::collections::{HashMap, HashSet};

/// A rectangular-grid device built bel by bel.
pub struct GridDevice {
    width: i32,
    height: i32,
    bels: Vec<BelId>,
    bel_types: Vec<Ident>,
    bel_locs: Vec<Loc>,
    by_loc: HashMap<Loc, BelId>,
    tile_depth: HashMap<(i32, i32), i32>,
    global_bufs: HashSet<BelId>,
    type_map: HashMap<Ident, Ident>,
    invalid: HashSet<(Ident, BelId)>,
    delay_per_unit: Delay,
}

impl GridDevice {
    /// Creates an empty device with the given grid extents.
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "grid extents must be positive");
        Self {
            width,
            height,
            bels: Vec::new(),
            bel_types: Vec::new(),
            bel_locs: Vec::new(),
            by_loc: HashMap::new(),
            tile_depth: HashMap::new(),
            global_bufs: HashSet::new(),
            type_map: HashMap::new(),
            invalid: HashSet::new(),
            delay_per_unit: Delay::from_ps(500),
        }
    }

    /// Adds a bel of the given type at a location and returns its ID.
    ///
    /// Bels are enumerated in insertion order. Panics if the location is
    /// outside the grid or already holds a bel.
    pub fn add_bel(&mut self, loc: Loc, ty: Ident) -> BelId {
        assert!(
            loc.x >= 0 && loc.x < self.width && loc.y >= 0 && loc.y < self.height && loc.z >= 0,
            "bel location {loc:?} is outside the grid"
        );
        let bel = BelId::from_raw(self.bels.len() as u32);
        let prev = self.by_loc.insert(loc, bel);
        assert!(prev.is_none(), "duplicate bel at {loc:?}");
        let depth = self.tile_depth.entry((loc.x, loc.y)).or_insert(0);
        *depth = (*depth).max(loc.z + 1);
        self.bels.push(bel);
        self.bel_types.push(ty);
        self.bel_locs.push(loc);
        bel
    }

    /// Fills every `(x, y)` tile with `depth` bels of the given type.
    pub fn fill(&mut self, ty: Ident, depth: i32) {
        for x in 0..self.width {
            for y in 0..self.height {
                for z in 0..depth {
                    self.add_bel(Loc::new(x, y, z), ty);
                }
            }
        }
    }

    /// Marks a bel as a global buffer.
    pub fn mark_global_buf(&mut self, bel: BelId) {
        self.global_bufs.insert(bel);
    }

    /// Maps a cell type to a bel type. Unmapped cell types fall back to
    /// the identically named bel type.
    pub fn map_cell_type(&mut self, cell_ty: Ident, bel_ty: Ident) {
        self.type_map.insert(cell_ty, bel_ty);
    }

    /// Marks a (cell type, bel) pair as architecturally invalid.
    /// All pairs are valid by default.
    pub fn mark_invalid(&mut self, cell_ty: Ident, bel: BelId) {
        self.invalid.insert((cell_ty, bel));
    }

    /// Sets the delay charged per unit of Manhattan distance.
    pub fn set_delay_per_unit(&mut self, delay: Delay) {
        self.delay_per_unit = delay;
    }

    /// Number of bels in the device.
    pub fn bel_count(&self) -> usize {
        self.bels.len()
    }
}

impl Device for GridDevice {
    fn bels(&self) -> &[BelId] {
        &self.bels
    }

    fn bel_type(&self, bel: BelId) -> Ident {
        self.bel_types[bel.as_raw() as usize]
    }

    fn bel_type_for_cell(&self, cell_ty: Ident) -> Option<Ident> {
        Some(self.type_map.get(&cell_ty).copied().unwrap_or(cell_ty))
    }

    fn bel_location(&self, bel: BelId) -> Loc {
        self.bel_locs[bel.as_raw() as usize]
    }

    fn bel_at_location(&self, loc: Loc) -> Option<BelId> {
        self.by_loc.get(&loc).copied()
    }

    fn grid_dim_x(&self) -> i32 {
        self.width
    }

    fn grid_dim_y(&self) -> i32 {
        self.height
    }

    fn tile_dim_z(&self, x: i32, y: i32) -> i32 {
        self.tile_depth.get(&(x, y)).copied().unwrap_or(0)
    }

    fn bel_global_buf(&self, bel: BelId) -> bool {
        self.global_bufs.contains(&bel)
    }

    fn is_valid_bel_for_cell(&self, cell_ty: Ident, bel: BelId) -> bool {
        !self.invalid.contains(&(cell_ty, bel))
    }

    fn predict_delay(&self, from: Loc, to: Loc) -> Delay {
        let dist = ((from.x - to.x).abs() + (from.y - to.y).abs()) as i64;
        Delay::from_ps(dist * self.delay_per_unit.as_ps())
    }
}
