//! Relative-constraint legalisation.
//!
//! Constraint chains (trees of cells linked by `constr_parent` /
//! `constr_children`) must sit at locations satisfying their relative
//! offsets. The legaliser walks every chain root in sorted-name order
//! and, for chains that are not already satisfied, runs a backtracking
//! search over candidate root locations, assigning children at offset or
//! freely searched locations. A feasible assignment is applied
//! atomically: every chain cell's old binding is removed before any new
//! binding is made, and displaced bystanders are re-placed afterwards
//! with the single-cell placer.

use crate::context::PlaceContext;
use crate::data::{Netlist, Strength};
use crate::error::PnrError;
use crate::ids::CellId;
use crate::place::place_single_cell;
use ferrite_arch::{Device, Loc};
use ferrite_diagnostics::{Diagnostic, DiagnosticSink};
use std::collections::{HashMap, HashSet};

/// Penalty contributed by an unplaced cell (or a cell with an unplaced
/// parent): large enough to dominate any real grid distance.
const UNPLACED_PENALTY: i32 = 100_000;

/// Returns how far the chain rooted at `cell` is from satisfying its
/// placement constraints. Zero means satisfied.
///
/// An unplaced cell, or a non-root whose parent is unplaced, contributes
/// a penalty of 100 000 and cuts off its subtree. Roots compare each
/// constrained axis against their absolute location; non-roots compare x
/// and y against the offset from their parent, and z either absolutely or
/// as an offset per `constr_abs_z`. Children recurse and sum.
pub fn constraints_distance(ctx: &PlaceContext, netlist: &Netlist, cell: CellId) -> i32 {
    let c = netlist.cell(cell);
    let bel = match c.bel {
        Some(bel) => bel,
        None => return UNPLACED_PENALTY,
    };
    let loc = ctx.device().bel_location(bel);
    let mut dist = 0;
    match c.constr_parent {
        None => {
            if let Some(x) = c.constr_x {
                dist += (x - loc.x).abs();
            }
            if let Some(y) = c.constr_y {
                dist += (y - loc.y).abs();
            }
            if let Some(z) = c.constr_z {
                dist += (z - loc.z).abs();
            }
        }
        Some(parent) => {
            let parent_bel = match netlist.cell(parent).bel {
                Some(bel) => bel,
                None => return UNPLACED_PENALTY,
            };
            let parent_loc = ctx.device().bel_location(parent_bel);
            if let Some(x) = c.constr_x {
                dist += (x - (loc.x - parent_loc.x)).abs();
            }
            if let Some(y) = c.constr_y {
                dist += (y - (loc.y - parent_loc.y)).abs();
            }
            if let Some(z) = c.constr_z {
                if c.constr_abs_z {
                    dist += (z - loc.z).abs();
                } else {
                    dist += (z - (loc.z - parent_loc.z)).abs();
                }
            }
        }
    }
    for &child in &c.constr_children {
        dist += constraints_distance(ctx, netlist, child);
    }
    dist
}

/// Emits values along one axis in order of increasing distance from a
/// start point: `start, start+1, start-1, start+2, start-2, ...`,
/// restricted to `[min, max]`. Out-of-range values are skipped rather
/// than clamped, so no value is emitted twice even when the start sits on
/// a range edge. The search is exhausted once the diameter exceeds
/// `max - min`.
#[derive(Debug, Clone)]
struct DiameterSearch {
    start: i32,
    min: i32,
    max: i32,
    diameter: i32,
    sign: i32,
}

impl DiameterSearch {
    fn new(start: i32, min: i32, max: i32) -> Self {
        let start = if min <= max { start.clamp(min, max) } else { start };
        Self {
            start,
            min,
            max,
            diameter: 0,
            sign: 0,
        }
    }

    /// A search emitting exactly one fixed value.
    fn fixed(value: i32) -> Self {
        Self::new(value, value, value)
    }

    fn done(&self) -> bool {
        self.diameter > self.max - self.min
    }

    fn get(&self) -> i32 {
        (self.start + self.sign * self.diameter)
            .max(self.min)
            .min(self.max)
    }

    fn next(&mut self) {
        loop {
            if self.sign == 0 {
                self.sign = 1;
                self.diameter = 1;
            } else if self.sign == 1 {
                self.sign = -1;
            } else {
                self.sign = 1;
                self.diameter += 1;
            }
            if self.done() {
                return;
            }
            let value = self.start + self.sign * self.diameter;
            if value >= self.min && value <= self.max {
                return;
            }
        }
    }

    fn reset(&mut self) {
        self.sign = 0;
        self.diameter = 0;
    }
}

/// Advances a three-axis nested search one step: z is innermost, then y,
/// then x; an outer axis moves only when the inner one wraps.
fn advance(xs: &mut DiameterSearch, ys: &mut DiameterSearch, zs: &mut DiameterSearch) {
    zs.next();
    if zs.done() {
        zs.reset();
        ys.next();
        if ys.done() {
            ys.reset();
            xs.next();
        }
    }
}

/// One invocation of constraint legalisation over a whole netlist.
struct ConstraintLegaliser<'a, 'd> {
    ctx: &'a mut PlaceContext<'d>,
    netlist: &'a mut Netlist,
    sink: &'a DiagnosticSink,
    /// Cells displaced by chain placement, re-placed at the end.
    ripped: Vec<CellId>,
    /// Locations cells held before legalisation began, used as search
    /// centres for roots that have since lost their bel.
    old_locations: HashMap<CellId, Loc>,
}

impl<'a, 'd> ConstraintLegaliser<'a, 'd> {
    fn new(
        ctx: &'a mut PlaceContext<'d>,
        netlist: &'a mut Netlist,
        sink: &'a DiagnosticSink,
    ) -> Self {
        Self {
            ctx,
            netlist,
            sink,
            ripped: Vec::new(),
            old_locations: HashMap::new(),
        }
    }

    fn constraints_satisfied(&self, cell: CellId) -> bool {
        constraints_distance(self.ctx, self.netlist, cell) == 0
    }

    /// Tests whether `cell` can sit at `loc` with all of its chain
    /// children recursively assigned consistent locations.
    ///
    /// Pure exploration: successful assignments are recorded in
    /// `solution` and reserved in `used`, but no bel is bound or unbound.
    /// On failure the reservation for `loc` is withdrawn.
    fn valid_loc_for(
        &self,
        cell: CellId,
        loc: Loc,
        solution: &mut HashMap<CellId, Loc>,
        used: &mut HashSet<Loc>,
    ) -> bool {
        let device = self.ctx.device();
        let bel = match device.bel_at_location(loc) {
            Some(bel) => bel,
            None => return false,
        };
        if device.bel_type_for_cell(self.netlist.cell(cell).ty) != Some(device.bel_type(bel)) {
            return false;
        }
        if !self.ctx.check_bel_avail(bel) {
            if let Some(conflicting) = self.ctx.conflicting_bel_cell(bel) {
                if self.netlist.cell(conflicting).strength >= Strength::Strong {
                    return false;
                }
            }
        }
        used.insert(loc);

        for &child in &self.netlist.cell(cell).constr_children {
            let ch = self.netlist.cell(child);
            let mut xs = match ch.constr_x {
                Some(dx) => DiameterSearch::fixed(loc.x + dx),
                None => DiameterSearch::new(loc.x, 0, device.grid_dim_x() - 1),
            };
            let mut ys = match ch.constr_y {
                Some(dy) => DiameterSearch::fixed(loc.y + dy),
                None => DiameterSearch::new(loc.y, 0, device.grid_dim_y() - 1),
            };
            let mut zs = match ch.constr_z {
                Some(z) if ch.constr_abs_z => DiameterSearch::fixed(z),
                Some(dz) => DiameterSearch::fixed(loc.z + dz),
                None => DiameterSearch::new(loc.z, 0, device.tile_dim_z(loc.x, loc.y) - 1),
            };
            let mut success = false;
            while !xs.done() {
                let child_loc = Loc::new(xs.get(), ys.get(), zs.get());
                advance(&mut xs, &mut ys, &mut zs);
                if used.contains(&child_loc) {
                    continue;
                }
                if self.ctx.verbose {
                    self.sink.emit(Diagnostic::note(format!(
                        "checking '{}' at ({}, {}, {})",
                        ch.name, child_loc.x, child_loc.y, child_loc.z
                    )));
                }
                if self.valid_loc_for(child, child_loc, solution, used) {
                    success = true;
                    break;
                }
            }
            if !success {
                used.remove(&loc);
                return false;
            }
        }

        // A deeper retry may re-assign this cell; release the previously
        // reserved location in that case.
        if let Some(previous) = solution.insert(cell, loc) {
            if previous != loc {
                used.remove(&previous);
            }
        }
        true
    }

    /// Sets the strength of every cell in the chain to `Locked`.
    fn lockdown_chain(&mut self, root: CellId) {
        self.netlist.cell_mut(root).strength = Strength::Locked;
        let children = self.netlist.cell(root).constr_children.clone();
        for child in children {
            self.lockdown_chain(child);
        }
    }

    /// Unbinds the whole solution, then rebinds each cell at its solved
    /// location with `Locked` strength, ripping up weaker bystanders.
    fn apply_solution(&mut self, solution: &HashMap<CellId, Loc>) {
        let mut placements: Vec<(CellId, Loc)> = solution.iter().map(|(&c, &l)| (c, l)).collect();
        placements.sort_by(|a, b| {
            self.netlist
                .cell(a.0)
                .name
                .cmp(&self.netlist.cell(b.0).name)
        });

        // Unbind the whole chain before rebinding anything: a cell may
        // move onto a bel another chain member is vacating.
        for &(cell, _) in &placements {
            if let Some(bel) = self.netlist.cell(cell).bel {
                self.ctx.unbind_bel(self.netlist, bel);
            }
        }
        for &(cell, loc) in &placements {
            let bel = self
                .ctx
                .device()
                .bel_at_location(loc)
                .expect("solution location resolves to a bel");
            if !self.ctx.check_bel_avail(bel) {
                if let Some(conflicting) = self.ctx.conflicting_bel_cell(bel) {
                    assert!(
                        self.netlist.cell(conflicting).strength < Strength::Strong,
                        "constraint search proposed displacing strongly placed cell '{}'",
                        self.netlist.cell(conflicting).name
                    );
                    if self.ctx.verbose {
                        self.sink.emit(Diagnostic::note(format!(
                            "ripping up '{}' for chain cell '{}'",
                            self.netlist.cell(conflicting).name,
                            self.netlist.cell(cell).name
                        )));
                    }
                    self.ctx.unbind_bel(self.netlist, bel);
                    self.ripped.push(conflicting);
                }
            }
            if self.ctx.verbose {
                self.sink.emit(Diagnostic::note(format!(
                    "placing '{}' at ({}, {}, {})",
                    self.netlist.cell(cell).name,
                    loc.x,
                    loc.y,
                    loc.z
                )));
            }
            self.ctx.bind_bel(self.netlist, bel, cell, Strength::Locked);
        }
    }

    /// Legalises the chain rooted at `cell`. Non-roots are skipped (their
    /// root drives them). Returns `false` if no root location admits a
    /// feasible assignment.
    fn legalise_cell(&mut self, cell: CellId) -> bool {
        if self.netlist.cell(cell).constr_parent.is_some() {
            return true;
        }
        if self.constraints_satisfied(cell) {
            self.lockdown_chain(cell);
            return true;
        }

        let device = self.ctx.device();
        let current_loc = match self.netlist.cell(cell).bel {
            Some(bel) => device.bel_location(bel),
            None => self
                .old_locations
                .get(&cell)
                .copied()
                .unwrap_or(Loc::new(0, 0, 0)),
        };
        let c = self.netlist.cell(cell);
        let root_name = c.name.clone();
        let mut xs = match c.constr_x {
            Some(x) => DiameterSearch::fixed(x),
            None => DiameterSearch::new(current_loc.x, 0, device.grid_dim_x() - 1),
        };
        let mut ys = match c.constr_y {
            Some(y) => DiameterSearch::fixed(y),
            None => DiameterSearch::new(current_loc.y, 0, device.grid_dim_y() - 1),
        };
        let mut zs = match c.constr_z {
            Some(z) => DiameterSearch::fixed(z),
            None => DiameterSearch::new(
                current_loc.z,
                0,
                device.tile_dim_z(current_loc.x, current_loc.y) - 1,
            ),
        };

        while !xs.done() {
            let root_loc = Loc::new(xs.get(), ys.get(), zs.get());
            advance(&mut xs, &mut ys, &mut zs);
            if self.ctx.verbose {
                self.sink.emit(Diagnostic::note(format!(
                    "trying ({}, {}, {}) for chain root '{root_name}'",
                    root_loc.x, root_loc.y, root_loc.z
                )));
            }
            let mut solution = HashMap::new();
            let mut used = HashSet::new();
            if self.valid_loc_for(cell, root_loc, &mut solution, &mut used) {
                self.apply_solution(&solution);
                assert!(
                    self.constraints_satisfied(cell),
                    "chain '{root_name}' still unsatisfied after legalisation"
                );
                return true;
            }
        }
        false
    }

    /// Dumps a chain's constraint tree as notes, one line per cell.
    fn dump_chain(&self, cell: CellId, depth: usize) {
        let c = self.netlist.cell(cell);
        let axis = |v: Option<i32>| v.map_or_else(|| "*".to_string(), |v| v.to_string());
        self.sink.emit(Diagnostic::note(format!(
            "{}'{}' ({}, {}, {})",
            "    ".repeat(depth),
            c.name,
            axis(c.constr_x),
            axis(c.constr_y),
            axis(c.constr_z)
        )));
        for &child in &c.constr_children {
            self.dump_chain(child, depth + 1);
        }
    }

    fn legalise_constraints(mut self) -> Result<(), PnrError> {
        self.sink
            .emit(Diagnostic::note("legalising relative constraints..."));
        let order = self.netlist.cell_ids_sorted_by_name();
        for &cell in &order {
            if let Some(bel) = self.netlist.cell(cell).bel {
                let loc = self.ctx.device().bel_location(bel);
                self.old_locations.insert(cell, loc);
            }
        }
        for &cell in &order {
            if !self.legalise_cell(cell) {
                let root = self.netlist.cell(cell).name.clone();
                self.dump_chain(cell, 0);
                self.sink.emit(Diagnostic::error(format!(
                    "failed to place chain starting at cell '{root}'"
                )));
                return Err(PnrError::UnsatisfiableChain { root });
            }
        }
        let ripped = std::mem::take(&mut self.ripped);
        for cell in ripped {
            // A displaced cell that belongs to a chain of its own has
            // been re-placed (and locked) by that chain's legalisation.
            if self.netlist.cell(cell).strength == Strength::Locked {
                continue;
            }
            if let Err(source) = place_single_cell(self.ctx, self.netlist, cell, false) {
                let name = self.netlist.cell(cell).name.clone();
                self.sink.emit(Diagnostic::error(format!(
                    "failed to place cell '{name}' after relative constraint legalisation"
                )));
                return Err(PnrError::ChainCellUnplaceable {
                    cell: name,
                    source: Box::new(source),
                });
            }
        }
        Ok(())
    }
}

/// Legalises every relative placement constraint in the netlist.
///
/// On success every cell satisfies [`constraints_distance`] `== 0` and
/// every chain cell is bound with [`Strength::Locked`]. On failure the
/// placement is partially mutated and the caller must abort the run.
pub fn legalise_relative_constraints(
    ctx: &mut PlaceContext,
    netlist: &mut Netlist,
    sink: &DiagnosticSink,
) -> Result<(), PnrError> {
    ConstraintLegaliser::new(ctx, netlist, sink).legalise_constraints()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PlaceOptions;
    use ferrite_arch::{Device, GridDevice};
    use ferrite_common::{Ident, Interner};

    fn collect(mut search: DiameterSearch) -> Vec<i32> {
        let mut values = Vec::new();
        while !search.done() {
            values.push(search.get());
            search.next();
        }
        values
    }

    #[test]
    fn diameter_search_emits_outward_from_start() {
        let s = DiameterSearch::new(3, 0, 7);
        assert_eq!(collect(s), vec![3, 4, 2, 5, 1, 6, 0, 7]);
    }

    #[test]
    fn diameter_search_at_upper_edge_has_no_duplicates() {
        let s = DiameterSearch::new(7, 0, 7);
        assert_eq!(collect(s), vec![7, 6, 5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn diameter_search_at_lower_edge_has_no_duplicates() {
        let s = DiameterSearch::new(0, 0, 7);
        assert_eq!(collect(s), vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn diameter_search_clamps_out_of_range_start() {
        let s = DiameterSearch::new(12, 0, 3);
        assert_eq!(collect(s), vec![3, 2, 1, 0]);
    }

    #[test]
    fn diameter_search_fixed_emits_once() {
        let s = DiameterSearch::fixed(5);
        assert_eq!(collect(s), vec![5]);
    }

    #[test]
    fn diameter_search_reset_replays() {
        let mut s = DiameterSearch::new(1, 0, 2);
        let first: Vec<i32> = {
            let mut v = Vec::new();
            while !s.done() {
                v.push(s.get());
                s.next();
            }
            v
        };
        s.reset();
        assert_eq!(collect(s), first);
    }

    struct Chain {
        dev: GridDevice,
        nl: Netlist,
        ty: Ident,
    }

    fn grid_fixture(width: i32, height: i32) -> Chain {
        let interner = Interner::new();
        let ty = interner.get_or_intern("SLICE");
        let mut dev = GridDevice::new(width, height);
        dev.fill(ty, 1);
        Chain {
            dev,
            nl: Netlist::new(),
            ty,
        }
    }

    fn bind_weak(ctx: &mut PlaceContext, nl: &mut Netlist, cell: CellId, loc: Loc) {
        let bel = ctx.device().bel_at_location(loc).unwrap();
        ctx.bind_bel(nl, bel, cell, Strength::Weak);
    }

    fn loc_of(ctx: &PlaceContext, nl: &Netlist, cell: CellId) -> Loc {
        ctx.device().bel_location(nl.cell(cell).bel.expect("placed"))
    }

    #[test]
    fn distance_of_unplaced_cell_is_large() {
        let Chain { dev, mut nl, ty } = grid_fixture(4, 4);
        let c = nl.add_cell("c", ty);
        let ctx = PlaceContext::new(&dev, PlaceOptions::default());
        assert_eq!(constraints_distance(&ctx, &nl, c), 100_000);
    }

    #[test]
    fn distance_of_root_counts_constrained_axes() {
        let Chain { dev, mut nl, ty } = grid_fixture(8, 8);
        let c = nl.add_cell("c", ty);
        nl.cell_mut(c).constr_x = Some(2);
        nl.cell_mut(c).constr_y = Some(6);
        let mut ctx = PlaceContext::new(&dev, PlaceOptions::default());
        bind_weak(&mut ctx, &mut nl, c, Loc::new(5, 6, 0));
        // |2-5| + |6-6|, z unconstrained.
        assert_eq!(constraints_distance(&ctx, &nl, c), 3);
    }

    #[test]
    fn distance_of_child_uses_parent_offset() {
        let Chain { dev, mut nl, ty } = grid_fixture(8, 8);
        let root = nl.add_cell("root", ty);
        let kid = nl.add_cell("kid", ty);
        nl.set_constr_parent(kid, root);
        nl.cell_mut(kid).constr_x = Some(1);
        nl.cell_mut(kid).constr_y = Some(0);
        nl.cell_mut(kid).constr_z = Some(0);

        let mut ctx = PlaceContext::new(&dev, PlaceOptions::default());
        bind_weak(&mut ctx, &mut nl, root, Loc::new(2, 3, 0));
        bind_weak(&mut ctx, &mut nl, kid, Loc::new(3, 3, 0));
        assert_eq!(constraints_distance(&ctx, &nl, root), 0);

        // Move the child one tile east: offset (2, 0) vs required (1, 0).
        let kid_bel = nl.cell(kid).bel.unwrap();
        ctx.unbind_bel(&mut nl, kid_bel);
        bind_weak(&mut ctx, &mut nl, kid, Loc::new(4, 3, 0));
        assert_eq!(constraints_distance(&ctx, &nl, root), 1);
    }

    #[test]
    fn distance_honours_absolute_z() {
        let interner = Interner::new();
        let ty = interner.get_or_intern("SLICE");
        let mut dev = GridDevice::new(2, 1);
        dev.fill(ty, 4);
        let mut nl = Netlist::new();
        let root = nl.add_cell("root", ty);
        let kid = nl.add_cell("kid", ty);
        nl.set_constr_parent(kid, root);
        nl.cell_mut(kid).constr_z = Some(3);
        nl.cell_mut(kid).constr_abs_z = true;

        let mut ctx = PlaceContext::new(&dev, PlaceOptions::default());
        bind_weak(&mut ctx, &mut nl, root, Loc::new(0, 0, 2));
        bind_weak(&mut ctx, &mut nl, kid, Loc::new(1, 0, 1));
        // Absolute z: |3 - 1|, regardless of the parent's z.
        assert_eq!(constraints_distance(&ctx, &nl, root), 2);

        nl.cell_mut(kid).constr_abs_z = false;
        // Relative z: |3 - (1 - 2)| = 4.
        assert_eq!(constraints_distance(&ctx, &nl, root), 4);
    }

    #[test]
    fn distance_with_unplaced_parent_is_large() {
        let Chain { dev, mut nl, ty } = grid_fixture(4, 4);
        let root = nl.add_cell("root", ty);
        let kid = nl.add_cell("kid", ty);
        nl.set_constr_parent(kid, root);
        nl.cell_mut(kid).constr_x = Some(1);
        let mut ctx = PlaceContext::new(&dev, PlaceOptions::default());
        bind_weak(&mut ctx, &mut nl, kid, Loc::new(1, 0, 0));
        assert_eq!(constraints_distance(&ctx, &nl, kid), 100_000);
    }

    #[test]
    fn satisfied_chain_is_locked_without_rebinding() {
        let Chain { dev, mut nl, ty } = grid_fixture(8, 8);
        let root = nl.add_cell("root", ty);
        let kid = nl.add_cell("kid", ty);
        nl.set_constr_parent(kid, root);
        nl.cell_mut(kid).constr_x = Some(1);
        nl.cell_mut(kid).constr_y = Some(0);
        nl.cell_mut(kid).constr_z = Some(0);

        let mut ctx = PlaceContext::new(&dev, PlaceOptions::default());
        bind_weak(&mut ctx, &mut nl, root, Loc::new(2, 3, 0));
        bind_weak(&mut ctx, &mut nl, kid, Loc::new(3, 3, 0));
        let root_bel = nl.cell(root).bel;
        let kid_bel = nl.cell(kid).bel;

        let sink = DiagnosticSink::new();
        legalise_relative_constraints(&mut ctx, &mut nl, &sink).unwrap();

        assert_eq!(nl.cell(root).bel, root_bel);
        assert_eq!(nl.cell(kid).bel, kid_bel);
        assert_eq!(nl.cell(root).strength, Strength::Locked);
        assert_eq!(nl.cell(kid).strength, Strength::Locked);
        assert!(!sink.has_errors());
    }

    #[test]
    fn chain_is_relocated_when_offset_leaves_the_grid() {
        let Chain { dev, mut nl, ty } = grid_fixture(8, 8);
        let root = nl.add_cell("root", ty);
        let kid = nl.add_cell("kid", ty);
        nl.set_constr_parent(kid, root);
        nl.cell_mut(kid).constr_x = Some(1);
        nl.cell_mut(kid).constr_y = Some(1);
        nl.cell_mut(kid).constr_z = Some(0);

        let mut ctx = PlaceContext::new(&dev, PlaceOptions::default());
        // The child's (+1, +1) offset from (7, 7) leaves the grid; the
        // root has to move.
        bind_weak(&mut ctx, &mut nl, root, Loc::new(7, 7, 0));
        bind_weak(&mut ctx, &mut nl, kid, Loc::new(0, 3, 0));

        let sink = DiagnosticSink::new();
        legalise_relative_constraints(&mut ctx, &mut nl, &sink).unwrap();

        // Diameter order tries x=7 first (children off-grid), then x=6;
        // within x=6, y=7 fails and y=6 is the first feasible root. The
        // child then takes the root's old bel at (7, 7).
        assert_eq!(loc_of(&ctx, &nl, root), Loc::new(6, 6, 0));
        assert_eq!(loc_of(&ctx, &nl, kid), Loc::new(7, 7, 0));
        assert_eq!(nl.cell(root).strength, Strength::Locked);
        assert_eq!(nl.cell(kid).strength, Strength::Locked);
        assert_eq!(constraints_distance(&ctx, &nl, root), 0);
    }

    #[test]
    fn four_deep_chain_finds_the_only_feasible_root() {
        let Chain { dev, mut nl, ty } = grid_fixture(4, 1);
        let names = ["a_root", "b_kid", "c_kid", "d_kid"];
        let cells: Vec<CellId> = names.iter().map(|n| nl.add_cell(*n, ty)).collect();
        for pair in cells.windows(2) {
            nl.set_constr_parent(pair[1], pair[0]);
            nl.cell_mut(pair[1]).constr_x = Some(1);
            nl.cell_mut(pair[1]).constr_y = Some(0);
            nl.cell_mut(pair[1]).constr_z = Some(0);
        }
        let mut ctx = PlaceContext::new(&dev, PlaceOptions::default());
        bind_weak(&mut ctx, &mut nl, cells[0], Loc::new(3, 0, 0));

        let sink = DiagnosticSink::new();
        legalise_relative_constraints(&mut ctx, &mut nl, &sink).unwrap();

        for (i, &cell) in cells.iter().enumerate() {
            assert_eq!(loc_of(&ctx, &nl, cell), Loc::new(i as i32, 0, 0));
            assert_eq!(nl.cell(cell).strength, Strength::Locked);
        }
    }

    #[test]
    fn backtracking_releases_used_locations() {
        // Root pinned at x=2 on a 3x1 grid. Its unconstrained child first
        // tries (1, 0), whose own (+1) grandchild would need the root's
        // location; that reservation must be withdrawn so the retry at
        // (0, 0) can give the grandchild (1, 0).
        let Chain { dev, mut nl, ty } = grid_fixture(3, 1);
        let root = nl.add_cell("root", ty);
        let kid = nl.add_cell("kid", ty);
        let grandkid = nl.add_cell("grandkid", ty);
        nl.set_constr_parent(kid, root);
        nl.set_constr_parent(grandkid, kid);
        nl.cell_mut(root).constr_x = Some(2);
        nl.cell_mut(grandkid).constr_x = Some(1);
        nl.cell_mut(grandkid).constr_y = Some(0);
        nl.cell_mut(grandkid).constr_z = Some(0);

        let mut ctx = PlaceContext::new(&dev, PlaceOptions::default());
        let sink = DiagnosticSink::new();
        legalise_relative_constraints(&mut ctx, &mut nl, &sink).unwrap();

        assert_eq!(loc_of(&ctx, &nl, root), Loc::new(2, 0, 0));
        assert_eq!(loc_of(&ctx, &nl, kid), Loc::new(0, 0, 0));
        assert_eq!(loc_of(&ctx, &nl, grandkid), Loc::new(1, 0, 0));
        assert_eq!(constraints_distance(&ctx, &nl, root), 0);
    }

    #[test]
    fn displaced_bystander_is_replaced() {
        let Chain { dev, mut nl, ty } = grid_fixture(6, 1);
        let root = nl.add_cell("root", ty);
        let kid = nl.add_cell("kid", ty);
        let bystander = nl.add_cell("w_bystander", ty);
        nl.set_constr_parent(kid, root);
        nl.cell_mut(root).constr_x = Some(0);
        nl.cell_mut(kid).constr_x = Some(1);
        nl.cell_mut(kid).constr_y = Some(0);
        nl.cell_mut(kid).constr_z = Some(0);

        let mut ctx = PlaceContext::new(&dev, PlaceOptions::default());
        bind_weak(&mut ctx, &mut nl, root, Loc::new(0, 0, 0));
        bind_weak(&mut ctx, &mut nl, kid, Loc::new(3, 0, 0));
        bind_weak(&mut ctx, &mut nl, bystander, Loc::new(1, 0, 0));

        let sink = DiagnosticSink::new();
        legalise_relative_constraints(&mut ctx, &mut nl, &sink).unwrap();

        assert_eq!(loc_of(&ctx, &nl, root), Loc::new(0, 0, 0));
        assert_eq!(loc_of(&ctx, &nl, kid), Loc::new(1, 0, 0));
        // The bystander lost its bel to the chain and found a new one.
        let bystander_loc = loc_of(&ctx, &nl, bystander);
        assert!(bystander_loc != Loc::new(0, 0, 0) && bystander_loc != Loc::new(1, 0, 0));
        assert_eq!(constraints_distance(&ctx, &nl, root), 0);
    }

    #[test]
    fn strong_cells_block_chain_placement_sites() {
        let Chain { dev, mut nl, ty } = grid_fixture(3, 1);
        let root = nl.add_cell("root", ty);
        let kid = nl.add_cell("kid", ty);
        let fort = nl.add_cell("fort", ty);
        nl.set_constr_parent(kid, root);
        nl.cell_mut(root).constr_x = Some(0);
        nl.cell_mut(kid).constr_x = Some(1);
        nl.cell_mut(kid).constr_y = Some(0);
        nl.cell_mut(kid).constr_z = Some(0);

        let mut ctx = PlaceContext::new(&dev, PlaceOptions::default());
        let fort_bel = ctx.device().bel_at_location(Loc::new(1, 0, 0)).unwrap();
        ctx.bind_bel(&mut nl, fort_bel, fort, Strength::Strong);

        let sink = DiagnosticSink::new();
        // The child's only legal site is occupied by a strong cell, so
        // the chain cannot be placed.
        let err = legalise_relative_constraints(&mut ctx, &mut nl, &sink).unwrap_err();
        assert!(matches!(err, PnrError::UnsatisfiableChain { .. }));
        // The strong cell kept its bel.
        assert_eq!(nl.cell(fort).bel, Some(fort_bel));
    }

    #[test]
    fn unsatisfiable_chain_reports_and_dumps() {
        let Chain { dev, mut nl, ty } = grid_fixture(2, 1);
        let root = nl.add_cell("root", ty);
        let kid = nl.add_cell("kid", ty);
        let grandkid = nl.add_cell("grandkid", ty);
        nl.set_constr_parent(kid, root);
        nl.set_constr_parent(grandkid, kid);
        for &c in &[kid, grandkid] {
            nl.cell_mut(c).constr_x = Some(1);
            nl.cell_mut(c).constr_y = Some(0);
            nl.cell_mut(c).constr_z = Some(0);
        }
        let mut ctx = PlaceContext::new(&dev, PlaceOptions::default());
        bind_weak(&mut ctx, &mut nl, root, Loc::new(0, 0, 0));

        let sink = DiagnosticSink::new();
        let err = legalise_relative_constraints(&mut ctx, &mut nl, &sink).unwrap_err();
        match err {
            PnrError::UnsatisfiableChain { root } => assert_eq!(root, "root"),
            other => panic!("unexpected error {other}"),
        }
        assert!(sink.has_errors());
        let messages: Vec<String> = sink.diagnostics().into_iter().map(|d| d.message).collect();
        assert!(messages.iter().any(|m| m.contains("'grandkid'")));
        assert!(messages
            .iter()
            .any(|m| m.contains("failed to place chain starting at cell 'root'")));
    }

    #[test]
    fn unconstrained_placed_cells_are_locked_down() {
        let Chain { dev, mut nl, ty } = grid_fixture(4, 1);
        let a = nl.add_cell("a", ty);
        let b = nl.add_cell("b", ty);
        let mut ctx = PlaceContext::new(&dev, PlaceOptions::default());
        bind_weak(&mut ctx, &mut nl, a, Loc::new(0, 0, 0));
        bind_weak(&mut ctx, &mut nl, b, Loc::new(2, 0, 0));

        let sink = DiagnosticSink::new();
        legalise_relative_constraints(&mut ctx, &mut nl, &sink).unwrap();

        // A placed cell with no constraints is a trivially satisfied
        // chain of one; it stays put and is locked.
        assert_eq!(loc_of(&ctx, &nl, a), Loc::new(0, 0, 0));
        assert_eq!(loc_of(&ctx, &nl, b), Loc::new(2, 0, 0));
        assert_eq!(nl.cell(a).strength, Strength::Locked);
        assert_eq!(nl.cell(b).strength, Strength::Locked);
    }

    #[test]
    fn verbose_mode_traces_the_search() {
        let Chain { dev, mut nl, ty } = grid_fixture(4, 4);
        let root = nl.add_cell("root", ty);
        let kid = nl.add_cell("kid", ty);
        nl.set_constr_parent(kid, root);
        nl.cell_mut(kid).constr_x = Some(1);
        nl.cell_mut(kid).constr_y = Some(0);
        nl.cell_mut(kid).constr_z = Some(0);

        let opts = PlaceOptions {
            verbose: true,
            ..PlaceOptions::default()
        };
        let mut ctx = PlaceContext::new(&dev, opts);
        bind_weak(&mut ctx, &mut nl, root, Loc::new(3, 3, 0));

        let sink = DiagnosticSink::new();
        legalise_relative_constraints(&mut ctx, &mut nl, &sink).unwrap();

        let messages: Vec<String> = sink.diagnostics().into_iter().map(|d| d.message).collect();
        assert!(messages.iter().any(|m| m.starts_with("trying (")));
        assert!(messages.iter().any(|m| m.starts_with("checking 'kid'")));
        assert!(messages.iter().any(|m| m.starts_with("placing '")));
    }

    #[test]
    fn multi_slot_tiles_use_z_offsets() {
        let interner = Interner::new();
        let ty = interner.get_or_intern("SLICE");
        let mut dev = GridDevice::new(2, 2);
        dev.fill(ty, 2);
        let mut nl = Netlist::new();
        let root = nl.add_cell("root", ty);
        let kid = nl.add_cell("kid", ty);
        nl.set_constr_parent(kid, root);
        nl.cell_mut(kid).constr_x = Some(0);
        nl.cell_mut(kid).constr_y = Some(0);
        nl.cell_mut(kid).constr_z = Some(1);

        let mut ctx = PlaceContext::new(&dev, PlaceOptions::default());
        bind_weak(&mut ctx, &mut nl, root, Loc::new(1, 1, 0));
        bind_weak(&mut ctx, &mut nl, kid, Loc::new(0, 0, 0));

        let sink = DiagnosticSink::new();
        legalise_relative_constraints(&mut ctx, &mut nl, &sink).unwrap();

        assert_eq!(loc_of(&ctx, &nl, root), Loc::new(1, 1, 0));
        assert_eq!(loc_of(&ctx, &nl, kid), Loc::new(1, 1, 1));
        assert_eq!(constraints_distance(&ctx, &nl, root), 0);
    }
}
