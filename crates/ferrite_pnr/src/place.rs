//! Single-cell placement with bounded ripup.

use crate::context::PlaceContext;
use crate::data::{Netlist, Strength};
use crate::error::PnrError;
use crate::ids::CellId;
use crate::wirelength::{cell_metric_at, MetricType, Wirelen};
use ferrite_arch::{BelId, Device};

/// Initial ripup iteration budget.
const RIPUP_ITERS: i32 = 25;

/// Iterations during which random jitter is added to candidate costs.
/// The final few iterations run without jitter so a ripup chase settles.
const JITTER_MIN_ITERS: i32 = 4;

/// Maximum jitter added to a candidate's cost.
const JITTER_RANGE: i64 = 25;

/// Places one cell on the best available bel of matching type.
///
/// Scans every bel of the cell's type (skipping architecturally invalid
/// bels when `require_legality` is set) and binds the cell to the
/// cheapest one by [`Cost`](MetricType::Cost) metric. Equal-cost
/// candidates resolve to the later bel in device order, and a small
/// random jitter perturbs costs for most of the iteration budget to
/// escape ties and local minima.
///
/// When no free bel exists, the cheapest incumbent below
/// [`Strength::Strong`] is ripped up; the displaced cell then goes
/// through the same search, with a fixed budget of total displacements
/// before the run is declared a failure.
///
/// The cell being placed must not be [`Strength::Locked`].
pub fn place_single_cell(
    ctx: &mut PlaceContext,
    netlist: &mut Netlist,
    cell: CellId,
    require_legality: bool,
) -> Result<(), PnrError> {
    let mut cur = cell;
    let mut iters = RIPUP_ITERS;
    loop {
        let (cur_ty, cur_strength) = {
            let c = netlist.cell(cur);
            (c.ty, c.strength)
        };
        assert!(
            cur_strength < Strength::Locked,
            "cannot re-place locked cell '{}'",
            netlist.cell(cur).name
        );
        if let Some(bel) = netlist.cell(cur).bel {
            ctx.unbind_bel(netlist, bel);
        }

        let device = ctx.device();
        let target_ty = device.bel_type_for_cell(cur_ty);

        let mut best: Option<(BelId, Wirelen)> = None;
        let mut best_ripup: Option<(BelId, Wirelen, CellId)> = None;
        for &bel in device.bels() {
            if Some(device.bel_type(bel)) != target_ty {
                continue;
            }
            if require_legality && !device.is_valid_bel_for_cell(cur_ty, bel) {
                continue;
            }
            let mut cost = cell_metric_at(ctx, netlist, cur, bel, MetricType::Cost);
            if iters >= JITTER_MIN_ITERS {
                cost += ctx.rng(JITTER_RANGE);
            }
            if ctx.check_bel_avail(bel) {
                if best.map_or(true, |(_, best_cost)| cost <= best_cost) {
                    best = Some((bel, cost));
                }
            } else if best_ripup.map_or(true, |(_, best_cost, _)| cost <= best_cost) {
                let incumbent = ctx
                    .bound_bel_cell(bel)
                    .expect("occupied bel has a bound cell");
                if netlist.cell(incumbent).strength < Strength::Strong {
                    best_ripup = Some((bel, cost, incumbent));
                }
            }
        }

        let (chosen, displaced) = match best {
            Some((bel, _)) => (bel, None),
            None => {
                if iters == 0 {
                    return Err(PnrError::RipupLimitExceeded {
                        cell: netlist.cell(cur).name.clone(),
                    });
                }
                let (ripup_bel, _, victim) = match best_ripup {
                    Some(candidate) => candidate,
                    None => {
                        return Err(PnrError::UnplaceableCell {
                            cell: netlist.cell(cur).name.clone(),
                        })
                    }
                };
                iters -= 1;
                ctx.unbind_bel(netlist, ripup_bel);
                (ripup_bel, Some(victim))
            }
        };

        // Bind the current cell first; only then does the displaced cell
        // become the placement cursor.
        ctx.bind_bel(netlist, chosen, cur, Strength::Weak);
        match displaced {
            None => return Ok(()),
            Some(victim) => cur = victim,
        }
    }
}
