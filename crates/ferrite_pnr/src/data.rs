//! The placement netlist: cells, nets, ports, and relative constraints.
//!
//! Cells and nets are owned by this container and referenced by
//! [`CellId`]/[`NetId`] arena indices. The placement core never creates
//! or destroys them; it only mutates a cell's bel binding and strength
//! through the placement context.

use crate::ids::{CellId, NetId};
use ferrite_arch::{BelId, Delay};
use ferrite_common::{FerriteResult, Ident, InternalError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How firmly a cell is bound to its bel.
///
/// Strengths are totally ordered: `None < Weak < Strong < Locked`.
/// Ripup during placement may displace bindings below `Strong`; `Locked`
/// bindings are never unbound.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Strength {
    /// Not bound, or bound with no claim at all.
    #[default]
    None,
    /// A provisional binding that any placement pass may displace.
    Weak,
    /// A deliberate binding that ripup must not displace.
    Strong,
    /// A binding that must never be removed (constraint chains, user locks).
    Locked,
}

/// A port on a cell, optionally connected to a net.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Port {
    /// Port name, unique within the cell (e.g. "I0", "Q").
    pub name: String,
    /// The net this port is connected to, if any.
    pub net: Option<NetId>,
}

/// The driver endpoint of a net.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PortRef {
    /// The driving cell; `None` for undriven nets.
    pub cell: Option<CellId>,
    /// The driving port name on that cell.
    pub port: String,
}

/// A sink endpoint of a net, with its timing budget.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetUser {
    /// The sink cell; `None` for dangling users.
    pub cell: Option<CellId>,
    /// The sink port name on that cell.
    pub port: String,
    /// The delay budget allotted to this net segment.
    pub budget: Delay,
}

/// A cell in the placement netlist.
///
/// The `constr_*` fields express relative placement constraints: a cell
/// may require a fixed axis value (roots) or a fixed offset from its
/// chain parent (non-roots). `None` means the axis is unconstrained.
/// `constr_parent`/`constr_children` link cells into chains; the parent
/// relation forms a forest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cell {
    /// The unique ID of this cell.
    pub id: CellId,
    /// Unique cell name.
    pub name: String,
    /// The cell's type tag.
    pub ty: Ident,
    /// The bel this cell is bound to (`None` = unplaced).
    pub bel: Option<BelId>,
    /// How firmly the current binding holds.
    pub strength: Strength,
    /// The cell's ports.
    pub ports: Vec<Port>,
    /// Required x, or offset from the parent's x (`None` = unconstrained).
    pub constr_x: Option<i32>,
    /// Required y, or offset from the parent's y (`None` = unconstrained).
    pub constr_y: Option<i32>,
    /// Required z, interpreted per `constr_abs_z` (`None` = unconstrained).
    pub constr_z: Option<i32>,
    /// When set, `constr_z` is an absolute slot index rather than an
    /// offset from the parent's z.
    pub constr_abs_z: bool,
    /// The chain parent, if this cell is a non-root chain member.
    pub constr_parent: Option<CellId>,
    /// Chain children, in insertion order.
    pub constr_children: Vec<CellId>,
}

/// A net in the placement netlist: one driver plus an ordered list of
/// sink users.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Net {
    /// The unique ID of this net.
    pub id: NetId,
    /// Unique net name.
    pub name: String,
    /// The driver endpoint, if the net is driven.
    pub driver: Option<PortRef>,
    /// The sink endpoints.
    pub users: Vec<NetUser>,
}

/// The netlist container for placement.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Netlist {
    /// All cells, indexed by [`CellId`].
    pub cells: Vec<Cell>,
    /// All nets, indexed by [`NetId`].
    pub nets: Vec<Net>,
    /// Auxiliary index: cell name to ID (rebuilt on deserialization).
    #[serde(skip)]
    cell_by_name: HashMap<String, CellId>,
    /// Auxiliary index: net name to ID (rebuilt on deserialization).
    #[serde(skip)]
    net_by_name: HashMap<String, NetId>,
}

impl Netlist {
    /// Creates an empty netlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a cell with the given unique name and type tag.
    ///
    /// The cell starts unplaced, unconstrained, and portless.
    ///
    /// # Panics
    ///
    /// Panics if a cell with the same name already exists.
    pub fn add_cell(&mut self, name: impl Into<String>, ty: Ident) -> CellId {
        let name = name.into();
        let id = CellId::from_raw(self.cells.len() as u32);
        let prev = self.cell_by_name.insert(name.clone(), id);
        assert!(prev.is_none(), "duplicate cell name '{name}'");
        self.cells.push(Cell {
            id,
            name,
            ty,
            bel: None,
            strength: Strength::None,
            ports: Vec::new(),
            constr_x: None,
            constr_y: None,
            constr_z: None,
            constr_abs_z: false,
            constr_parent: None,
            constr_children: Vec::new(),
        });
        id
    }

    /// Adds a net with the given unique name.
    ///
    /// # Panics
    ///
    /// Panics if a net with the same name already exists.
    pub fn add_net(&mut self, name: impl Into<String>) -> NetId {
        let name = name.into();
        let id = NetId::from_raw(self.nets.len() as u32);
        let prev = self.net_by_name.insert(name.clone(), id);
        assert!(prev.is_none(), "duplicate net name '{name}'");
        self.nets.push(Net {
            id,
            name,
            driver: None,
            users: Vec::new(),
        });
        id
    }

    /// Sets the driver of a net and records the port on the driving cell.
    pub fn set_driver(&mut self, net: NetId, cell: CellId, port: impl Into<String>) {
        let port = port.into();
        self.nets[net.as_raw() as usize].driver = Some(PortRef {
            cell: Some(cell),
            port: port.clone(),
        });
        self.cells[cell.as_raw() as usize].ports.push(Port {
            name: port,
            net: Some(net),
        });
    }

    /// Adds a sink user to a net and records the port on the sink cell.
    pub fn add_user(&mut self, net: NetId, cell: CellId, port: impl Into<String>, budget: Delay) {
        let port = port.into();
        self.nets[net.as_raw() as usize].users.push(NetUser {
            cell: Some(cell),
            port: port.clone(),
            budget,
        });
        self.cells[cell.as_raw() as usize].ports.push(Port {
            name: port,
            net: Some(net),
        });
    }

    /// Links `child` under `parent` in a constraint chain.
    ///
    /// # Panics
    ///
    /// Panics if `child` already has a parent or equals `parent`.
    pub fn set_constr_parent(&mut self, child: CellId, parent: CellId) {
        assert_ne!(child, parent, "a cell cannot be its own chain parent");
        let c = &mut self.cells[child.as_raw() as usize];
        assert!(
            c.constr_parent.is_none(),
            "cell '{}' already has a chain parent",
            c.name
        );
        c.constr_parent = Some(parent);
        self.cells[parent.as_raw() as usize].constr_children.push(child);
    }

    /// Returns the cell with the given ID.
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.as_raw() as usize]
    }

    /// Returns a mutable reference to the cell with the given ID.
    pub fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        &mut self.cells[id.as_raw() as usize]
    }

    /// Returns the net with the given ID.
    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.as_raw() as usize]
    }

    /// Looks up a cell by name.
    pub fn cell_by_name(&self, name: &str) -> Option<CellId> {
        self.cell_by_name.get(name).copied()
    }

    /// Looks up a net by name.
    pub fn net_by_name(&self, name: &str) -> Option<NetId> {
        self.net_by_name.get(name).copied()
    }

    /// Returns all cell IDs ordered by cell name.
    ///
    /// Operations that must be reproducible across runs iterate cells in
    /// this order.
    pub fn cell_ids_sorted_by_name(&self) -> Vec<CellId> {
        let mut ids: Vec<CellId> = self.cells.iter().map(|c| c.id).collect();
        ids.sort_by(|a, b| self.cell(*a).name.cmp(&self.cell(*b).name));
        ids
    }

    /// Returns the number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Returns the number of nets.
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Returns the number of placed cells.
    pub fn placed_count(&self) -> usize {
        self.cells.iter().filter(|c| c.bel.is_some()).count()
    }

    /// Rebuilds the name indexes after deserialization.
    ///
    /// Name uniqueness is enforced at construction, so a duplicate here
    /// means the serialized netlist was corrupted.
    pub fn rebuild_indices(&mut self) -> FerriteResult<()> {
        self.cell_by_name.clear();
        for cell in &self.cells {
            if self.cell_by_name.insert(cell.name.clone(), cell.id).is_some() {
                return Err(InternalError::new(format!(
                    "duplicate cell name '{}' in netlist",
                    cell.name
                )));
            }
        }
        self.net_by_name.clear();
        for net in &self.nets {
            if self.net_by_name.insert(net.name.clone(), net.id).is_some() {
                return Err(InternalError::new(format!(
                    "duplicate net name '{}' in netlist",
                    net.name
                )));
            }
        }
        Ok(())
    }
}
