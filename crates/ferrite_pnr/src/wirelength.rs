//! Estimated-wirelength metrics for nets and cells.
//!
//! The metric is half-perimeter wirelength (HPWL) over a net's placed
//! terminals, optionally weighted by the worst predicted timing slack
//! when the context is timing-driven. These are the cost functions the
//! single-cell placer and the constraint legaliser minimise.

use crate::context::PlaceContext;
use crate::data::{Net, Netlist};
use crate::ids::{CellId, NetId};
use ferrite_arch::{BelId, Delay, Device};
use std::collections::BTreeMap;

/// Estimated wirelength, in grid units.
pub type Wirelen = i64;

/// Which flavour of metric to compute.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MetricType {
    /// Raw half-perimeter wirelength.
    Wirelength,
    /// Placement cost: HPWL, scaled by worst slack when timing-driven.
    Cost,
}

/// Resolves the bel a cell occupies for metric purposes, honouring a
/// hypothetical `(cell, bel)` override so evaluation never has to mutate
/// the netlist.
fn effective_bel(
    netlist: &Netlist,
    cell: CellId,
    override_bel: Option<(CellId, BelId)>,
) -> Option<BelId> {
    match override_bel {
        Some((c, bel)) if c == cell => Some(bel),
        _ => netlist.cell(cell).bel,
    }
}

fn net_metric_inner(
    ctx: &PlaceContext,
    netlist: &Netlist,
    net: &Net,
    ty: MetricType,
    tns: &mut f64,
    override_bel: Option<(CellId, BelId)>,
) -> Wirelen {
    let device = ctx.device();
    let driver_cell = match &net.driver {
        Some(driver) => match driver.cell {
            Some(cell) => cell,
            None => return 0,
        },
        None => return 0,
    };
    let driver_bel = match effective_bel(netlist, driver_cell, override_bel) {
        Some(bel) => bel,
        None => return 0,
    };
    if device.bel_global_buf(driver_bel) {
        return 0;
    }
    let driver_loc = device.bel_location(driver_bel);

    let mut negative_slack = Delay::ZERO;
    let mut worst_slack = Delay::MAX;
    let (mut xmin, mut xmax) = (driver_loc.x, driver_loc.x);
    let (mut ymin, mut ymax) = (driver_loc.y, driver_loc.y);
    for user in &net.users {
        let user_cell = match user.cell {
            Some(cell) => cell,
            None => continue,
        };
        let user_bel = match effective_bel(netlist, user_cell, override_bel) {
            Some(bel) => bel,
            None => continue,
        };
        let user_loc = device.bel_location(user_bel);
        if ctx.timing_driven && ty == MetricType::Cost {
            let delay = device.predict_delay(driver_loc, user_loc);
            let slack = user.budget - delay;
            if slack < Delay::ZERO {
                negative_slack = negative_slack + slack;
            }
            worst_slack = worst_slack.min(slack);
        }

        // Global buffers reach everywhere; they contribute to slack but
        // not to the bounding box.
        if device.bel_global_buf(user_bel) {
            continue;
        }
        xmin = xmin.min(user_loc.x);
        ymin = ymin.min(user_loc.y);
        xmax = xmax.max(user_loc.x);
        ymax = ymax.max(user_loc.y);
    }

    let bbox = ((xmax - xmin) + (ymax - ymin)) as Wirelen;
    let wirelength = if ctx.timing_driven && ty == MetricType::Cost {
        let scale = 5.0_f64.min(1.0 + (-device.delay_ns(worst_slack) / 5.0).exp());
        (bbox as f64 * scale) as Wirelen
    } else {
        bbox
    };

    *tns += device.delay_ns(negative_slack);
    wirelength
}

fn cell_metric_inner(
    ctx: &PlaceContext,
    netlist: &Netlist,
    cell: CellId,
    ty: MetricType,
    override_bel: Option<(CellId, BelId)>,
) -> Wirelen {
    // Deduplicate the cell's nets and visit them in name order so the
    // total is reproducible across platforms.
    let mut nets: BTreeMap<&str, NetId> = BTreeMap::new();
    for port in &netlist.cell(cell).ports {
        if let Some(net) = port.net {
            nets.insert(netlist.net(net).name.as_str(), net);
        }
    }
    let mut wirelength = 0;
    let mut tns = 0.0;
    for net in nets.values() {
        wirelength += net_metric_inner(ctx, netlist, netlist.net(*net), ty, &mut tns, override_bel);
    }
    wirelength
}

/// Returns the estimated wirelength of a net and accumulates the net's
/// total negative slack (in nanoseconds) into `tns`.
///
/// Undriven nets, nets with an unplaced driver, and nets driven from a
/// global buffer cost nothing.
pub fn net_metric(
    ctx: &PlaceContext,
    netlist: &Netlist,
    net: NetId,
    ty: MetricType,
    tns: &mut f64,
) -> Wirelen {
    net_metric_inner(ctx, netlist, netlist.net(net), ty, tns, None)
}

/// Returns the total estimated wirelength over the distinct nets touched
/// by a cell's ports.
pub fn cell_metric(ctx: &PlaceContext, netlist: &Netlist, cell: CellId, ty: MetricType) -> Wirelen {
    cell_metric_inner(ctx, netlist, cell, ty, None)
}

/// Returns [`cell_metric`] as it would be if `cell` were placed on `bel`.
///
/// Purely hypothetical: neither the cell's binding nor the placement map
/// is touched.
pub fn cell_metric_at(
    ctx: &PlaceContext,
    netlist: &Netlist,
    cell: CellId,
    bel: BelId,
    ty: MetricType,
) -> Wirelen {
    cell_metric_inner(ctx, netlist, cell, ty, Some((cell, bel)))
}
