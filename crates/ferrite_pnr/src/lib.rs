//! Placement core for the ferrite FPGA toolchain.
//!
//! This crate holds the placement primitives shared by every placement
//! strategy:
//!
//! 1. **Wirelength estimation** — half-perimeter bounding-box metrics for
//!    nets and cells, optionally weighted by predicted timing slack
//!    ([`net_metric`], [`cell_metric`], [`cell_metric_at`]).
//! 2. **Single-cell placement** — best-fit search over bels of a matching
//!    type with jittered tie-breaking and bounded ripup of weaker
//!    incumbents ([`place_single_cell`]).
//! 3. **Relative-constraint legalisation** — a backtracking search that
//!    moves whole constraint chains to locations satisfying their
//!    parent/child offsets, then re-places anything it displaced
//!    ([`legalise_relative_constraints`], [`constraints_distance`]).
//!
//! The device database is abstracted behind
//! [`ferrite_arch::Device`]; the netlist lives in [`Netlist`]. All bel
//! bindings flow through [`PlaceContext`], which owns the placement map
//! and enforces the binding invariants (at most one cell per bel, locked
//! bindings never removed).
//!
//! # Usage
//!
//! ```
//! use ferrite_arch::GridDevice;
//! use ferrite_common::Interner;
//! use ferrite_pnr::{place_single_cell, Netlist, PlaceContext, PlaceOptions};
//!
//! let interner = Interner::new();
//! let lut = interner.get_or_intern("LUT4");
//! let mut device = GridDevice::new(4, 4);
//! device.fill(lut, 1);
//!
//! let mut netlist = Netlist::new();
//! let cell = netlist.add_cell("lut_0", lut);
//!
//! let mut ctx = PlaceContext::new(&device, PlaceOptions::default());
//! place_single_cell(&mut ctx, &mut netlist, cell, true).unwrap();
//! assert!(netlist.cell(cell).bel.is_some());
//! ```

#![warn(missing_docs)]

pub mod context;
pub mod data;
pub mod error;
pub mod ids;
pub mod legalise;
pub mod place;
pub mod wirelength;

pub use context::{PlaceContext, PlaceOptions};
pub use data::{Cell, Net, NetUser, Netlist, Port, PortRef, Strength};
pub use error::PnrError;
pub use ids::{CellId, NetId};
pub use legalise::{constraints_distance, legalise_relative_constraints};
pub use place::place_single_cell;
pub use wirelength::{cell_metric, cell_metric_at, net_metric, MetricType, Wirelen};

#[cfg(test)]
mod tests {
    use super::*;
    use ferrite_arch::{Delay, Device, GridDevice, Loc};
    use ferrite_common::Interner;
    use ferrite_diagnostics::DiagnosticSink;

    /// End-to-end: place a small design cell by cell, then legalise a
    /// carry-style chain, and check the global invariants.
    #[test]
    fn place_then_legalise_small_design() {
        let interner = Interner::new();
        let lut = interner.get_or_intern("LUT4");
        let mut device = GridDevice::new(6, 6);
        device.fill(lut, 1);

        let mut nl = Netlist::new();
        let a = nl.add_cell("a", lut);
        let b = nl.add_cell("b", lut);
        let n = nl.add_net("n");
        nl.set_driver(n, a, "O");
        nl.add_user(n, b, "I0", Delay::from_ps(5_000));

        let chain0 = nl.add_cell("chain0", lut);
        let chain1 = nl.add_cell("chain1", lut);
        nl.set_constr_parent(chain1, chain0);
        nl.cell_mut(chain1).constr_x = Some(0);
        nl.cell_mut(chain1).constr_y = Some(1);
        nl.cell_mut(chain1).constr_z = Some(0);

        let mut ctx = PlaceContext::new(&device, PlaceOptions::default());
        for cell in [a, b, chain0, chain1] {
            place_single_cell(&mut ctx, &mut nl, cell, true).unwrap();
        }
        assert_eq!(nl.placed_count(), 4);

        let sink = DiagnosticSink::new();
        legalise_relative_constraints(&mut ctx, &mut nl, &sink).unwrap();
        assert!(!sink.has_errors());

        for cell in [a, b, chain0, chain1] {
            assert_eq!(constraints_distance(&ctx, &nl, cell), 0);
            assert!(nl.cell(cell).bel.is_some());
        }
        let c0 = device.bel_location(nl.cell(chain0).bel.unwrap());
        let c1 = device.bel_location(nl.cell(chain1).bel.unwrap());
        assert_eq!((c1.x - c0.x, c1.y - c0.y, c1.z - c0.z), (0, 1, 0));
        assert_eq!(nl.cell(chain0).strength, Strength::Locked);
        assert_eq!(nl.cell(chain1).strength, Strength::Locked);
    }

    /// Two identically seeded runs over the same design agree bel for
    /// bel, including the legalisation pass.
    #[test]
    fn whole_flow_is_deterministic() {
        let run = || -> Vec<Option<Loc>> {
            let interner = Interner::new();
            let lut = interner.get_or_intern("LUT4");
            let mut device = GridDevice::new(5, 5);
            device.fill(lut, 2);

            let mut nl = Netlist::new();
            let cells: Vec<CellId> = (0..6)
                .map(|i| nl.add_cell(format!("cell_{i}"), lut))
                .collect();
            let n = nl.add_net("net_0");
            nl.set_driver(n, cells[0], "O");
            for &c in &cells[1..] {
                nl.add_user(n, c, "I", Delay::ZERO);
            }
            nl.set_constr_parent(cells[5], cells[4]);
            nl.cell_mut(cells[5]).constr_x = Some(1);
            nl.cell_mut(cells[5]).constr_y = Some(0);

            let mut ctx = PlaceContext::new(&device, PlaceOptions::default());
            for &c in &cells {
                place_single_cell(&mut ctx, &mut nl, c, true).unwrap();
            }
            let sink = DiagnosticSink::new();
            legalise_relative_constraints(&mut ctx, &mut nl, &sink).unwrap();

            cells
                .iter()
                .map(|&c| nl.cell(c).bel.map(|b| device.bel_location(b)))
                .collect()
        };
        assert_eq!(run(), run());
    }
}
