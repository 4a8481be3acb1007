//! Interned type tags shared by the device database and the netlist.
//!
//! Placement spends most of its time in one loop: for each cell, scan
//! every bel in the device and keep only those whose type matches the
//! cell's. With string tags that scan would hash or compare names per
//! bel per ripup iteration; interning turns the match into a single
//! `u32` compare. The device database (bel types) and the netlist (cell
//! types) must intern through the *same* [`Interner`], otherwise two
//! spellings of `"LUT4"` would never match and every cell would be
//! unplaceable.

use lasso::ThreadedRodeo;
use serde::{Deserialize, Serialize};

/// An interned type tag, as carried by bels and cells.
///
/// A thin `u32` key into an [`Interner`]. Equality is one integer
/// compare, which is what the placer's bel scan and the cell-type to
/// bel-type mapping rely on. Tags are also `Hash`, so device models can
/// key their type-mapping and validity tables by tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Ident(u32);

// SAFETY: `Ident` wraps a `u32`, which always fits in a `usize` on the
// platforms we support. `try_from_usize` rejects values wider than `u32`.
unsafe impl lasso::Key for Ident {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Ident)
    }
}

/// The session-wide tag interner, backed by [`lasso::ThreadedRodeo`].
///
/// One instance is created per toolchain session and handed to whatever
/// builds the device model and the netlist, so that a bel type and a
/// cell type spelled the same way resolve to the same [`Ident`].
/// Interning takes `&self`, so device construction and netlist
/// elaboration may intern from different threads.
pub struct Interner {
    rodeo: ThreadedRodeo<Ident>,
}

impl Interner {
    /// Creates a new empty interner.
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Interns a type name, returning its tag. Re-interning an already
    /// known name returns the existing tag without allocating.
    pub fn get_or_intern(&self, s: &str) -> Ident {
        self.rodeo.get_or_intern(s)
    }

    /// Resolves a tag back to the type name it was interned from, for
    /// diagnostics and debug output.
    ///
    /// # Panics
    ///
    /// Panics if the `Ident` was not created by this interner.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.rodeo.resolve(&ident)
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn device_and_netlist_sides_agree_on_a_tag() {
        let interner = Interner::new();
        // The device database registers its bel types...
        let bel_ty = interner.get_or_intern("LUT4");
        // ...and netlist elaboration later tags cells with the same name.
        let cell_ty = interner.get_or_intern("LUT4");
        assert_eq!(cell_ty, bel_ty);
        assert_eq!(interner.resolve(cell_ty), "LUT4");
    }

    #[test]
    fn distinct_type_names_never_match() {
        let interner = Interner::new();
        let lut = interner.get_or_intern("LUT4");
        let ff = interner.get_or_intern("DFF");
        let bram = interner.get_or_intern("BRAM");
        assert_ne!(lut, ff);
        assert_ne!(ff, bram);
    }

    #[test]
    fn bel_scan_matches_by_tag_equality() {
        // The shape of the placer's inner loop: filter a device's bel
        // types down to the one the cell needs.
        let interner = Interner::new();
        let lut = interner.get_or_intern("LUT4");
        let ff = interner.get_or_intern("DFF");
        let gb = interner.get_or_intern("GBUF");
        let bel_types = [lut, ff, lut, gb, lut, ff];
        let candidates = bel_types.iter().filter(|&&t| t == lut).count();
        assert_eq!(candidates, 3);
    }

    #[test]
    fn tags_key_a_cell_to_bel_type_map() {
        // Device models map cell types onto the bel types implementing
        // them, keyed by tag.
        let interner = Interner::new();
        let dff_cell = interner.get_or_intern("DFF");
        let ff_slot = interner.get_or_intern("FF_SLOT");
        let mut type_map: HashMap<Ident, Ident> = HashMap::new();
        type_map.insert(dff_cell, ff_slot);
        assert_eq!(type_map.get(&dff_cell), Some(&ff_slot));
        assert_eq!(type_map.get(&ff_slot), None);
    }

    #[test]
    fn tags_survive_serialization() {
        // Netlists carry cell-type tags through their serde round-trips.
        let interner = Interner::new();
        let tag = interner.get_or_intern("CARRY");
        let json = serde_json::to_string(&tag).unwrap();
        let back: Ident = serde_json::from_str(&json).unwrap();
        assert_eq!(tag, back);
        assert_eq!(interner.resolve(back), "CARRY");
    }
}
