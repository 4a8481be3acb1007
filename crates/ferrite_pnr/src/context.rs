//! The placement context: device access plus the live placement map.
//!
//! All bel bindings flow through [`PlaceContext::bind_bel`] and
//! [`PlaceContext::unbind_bel`], which keep the bel→cell map and the
//! cells' `bel`/`strength` fields consistent and enforce the binding
//! invariants (one cell per bel, locked bindings never removed).

use crate::data::{Netlist, Strength};
use crate::ids::CellId;
use ferrite_arch::{BelId, Device};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Options controlling a placement run.
#[derive(Debug, Clone)]
pub struct PlaceOptions {
    /// Weight cost by predicted timing slack.
    pub timing_driven: bool,
    /// Emit per-candidate search notes.
    pub verbose: bool,
    /// Seed for the jitter RNG. Runs with the same seed, device, and
    /// netlist produce identical placements.
    pub seed: u64,
}

impl Default for PlaceOptions {
    fn default() -> Self {
        Self {
            timing_driven: false,
            verbose: false,
            seed: 42,
        }
    }
}

/// Device access plus the mutable placement state shared by every
/// placement operation.
pub struct PlaceContext<'d> {
    device: &'d dyn Device,
    bindings: HashMap<BelId, CellId>,
    rng: StdRng,
    /// Weight cost by predicted timing slack.
    pub timing_driven: bool,
    /// Emit per-candidate search notes.
    pub verbose: bool,
}

impl<'d> PlaceContext<'d> {
    /// Creates a context over a device with the given options.
    pub fn new(device: &'d dyn Device, options: PlaceOptions) -> Self {
        Self {
            device,
            bindings: HashMap::new(),
            rng: StdRng::seed_from_u64(options.seed),
            timing_driven: options.timing_driven,
            verbose: options.verbose,
        }
    }

    /// The device this context places onto.
    pub fn device(&self) -> &'d dyn Device {
        self.device
    }

    /// Binds `cell` to `bel` with the given strength.
    ///
    /// # Panics
    ///
    /// Panics if the bel already holds a cell or the cell is already
    /// bound; callers must rip up first.
    pub fn bind_bel(&mut self, netlist: &mut Netlist, bel: BelId, cell: CellId, strength: Strength) {
        assert!(
            !self.bindings.contains_key(&bel),
            "bel {} is already bound",
            bel.as_raw()
        );
        let c = netlist.cell_mut(cell);
        assert!(c.bel.is_none(), "cell '{}' is already bound", c.name);
        c.bel = Some(bel);
        c.strength = strength;
        self.bindings.insert(bel, cell);
    }

    /// Unbinds whatever cell holds `bel`.
    ///
    /// # Panics
    ///
    /// Panics if the bel is not bound, or if the bound cell's strength is
    /// [`Strength::Locked`] — locked bindings are never removed.
    pub fn unbind_bel(&mut self, netlist: &mut Netlist, bel: BelId) {
        let cell = match self.bindings.get(&bel) {
            Some(&cell) => cell,
            None => panic!("bel {} is not bound", bel.as_raw()),
        };
        let c = netlist.cell_mut(cell);
        assert!(
            c.strength < Strength::Locked,
            "cannot unbind locked cell '{}'",
            c.name
        );
        c.bel = None;
        c.strength = Strength::None;
        self.bindings.remove(&bel);
    }

    /// Whether `bel` is free.
    pub fn check_bel_avail(&self, bel: BelId) -> bool {
        !self.bindings.contains_key(&bel)
    }

    /// The cell bound to `bel`, if any.
    pub fn bound_bel_cell(&self, bel: BelId) -> Option<CellId> {
        self.bindings.get(&bel).copied()
    }

    /// The cell that would have to move before `bel` could be bound.
    ///
    /// Bels here are exclusive slots, so this is the bound cell.
    pub fn conflicting_bel_cell(&self, bel: BelId) -> Option<CellId> {
        self.bound_bel_cell(bel)
    }

    /// Returns a uniform random value in `[0, n)`.
    pub fn rng(&mut self, n: i64) -> i64 {
        self.rng.gen_range(0..n)
    }

    /// Number of bound bels.
    pub fn bound_count(&self) -> usize {
        self.bindings.len()
    }
}
