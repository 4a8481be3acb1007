//! Error types for placement operations.

use thiserror::Error;

/// A fatal placement failure.
///
/// There is no partial-success recovery: callers must treat the run as
/// failed, and the placement map is unspecified after an error.
#[derive(Debug, Error)]
pub enum PnrError {
    /// No bel of a matching type is free and no incumbent below
    /// [`Strength::Strong`](crate::Strength::Strong) can be ripped up.
    #[error("failed to place cell '{cell}'")]
    UnplaceableCell {
        /// The cell that could not be placed.
        cell: String,
    },

    /// The ripup iteration budget ran out while displaced cells were
    /// still chasing each other.
    #[error("failed to place cell '{cell}' (ripup iteration limit exceeded)")]
    RipupLimitExceeded {
        /// The cell being placed when the budget ran out.
        cell: String,
    },

    /// No root location admits a valid recursive assignment for a
    /// constraint chain.
    #[error("failed to place chain starting at cell '{root}'")]
    UnsatisfiableChain {
        /// The root cell of the unsatisfiable chain.
        root: String,
    },

    /// A cell displaced during constraint legalisation could not be
    /// re-placed afterwards.
    #[error("failed to place cell '{cell}' after relative constraint legalisation")]
    ChainCellUnplaceable {
        /// The displaced cell.
        cell: String,
        /// The underlying placement failure.
        #[source]
        source: Box<PnrError>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_cell() {
        let err = PnrError::UnplaceableCell {
            cell: "lut_0".into(),
        };
        assert_eq!(format!("{err}"), "failed to place cell 'lut_0'");

        let err = PnrError::RipupLimitExceeded {
            cell: "lut_1".into(),
        };
        assert!(format!("{err}").contains("ripup iteration limit exceeded"));

        let err = PnrError::UnsatisfiableChain {
            root: "carry_0".into(),
        };
        assert_eq!(
            format!("{err}"),
            "failed to place chain starting at cell 'carry_0'"
        );
    }

    #[test]
    fn chain_replace_failure_carries_source() {
        use std::error::Error;
        let err = PnrError::ChainCellUnplaceable {
            cell: "ff_3".into(),
            source: Box::new(PnrError::UnplaceableCell { cell: "ff_3".into() }),
        };
        assert!(err.source().is_some());
        assert!(format!("{err}").contains("after relative constraint legalisation"));
    }
}
