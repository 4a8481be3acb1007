//! Opaque ID newtypes for netlist entities.
//!
//! [`CellId`] and [`NetId`] are thin `u32` wrappers used as arena indices
//! into the [`Netlist`](crate::data::Netlist).

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a cell in the netlist.
    CellId
);

define_id!(
    /// Opaque, copyable ID for a net in the netlist.
    NetId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn roundtrip() {
        assert_eq!(CellId::from_raw(42).as_raw(), 42);
        assert_eq!(NetId::from_raw(7).as_raw(), 7);
    }

    #[test]
    fn equality() {
        assert_eq!(CellId::from_raw(3), CellId::from_raw(3));
        assert_ne!(NetId::from_raw(3), NetId::from_raw(4));
    }

    #[test]
    fn hash_in_set() {
        let mut set = HashSet::new();
        set.insert(NetId::from_raw(1));
        set.insert(NetId::from_raw(1));
        set.insert(NetId::from_raw(2));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", CellId::from_raw(5)), "5");
    }

    #[test]
    fn serde_roundtrip() {
        let id = CellId::from_raw(55);
        let json = serde_json::to_string(&id).unwrap();
        let back: CellId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
