//! Seams between the network components.
//!
//! The orchestrator in [`crate::network`] only talks to its parts through
//! these traits, so alternative hierarchies or combination rules can be
//! swapped in without touching path enumeration.

use rtd_calib_core::{CalibrationSet, Offset, SensorId, SetId};

use crate::{BrokenChainError, ComposedChain, DerivationGapError, ParentLink, Path, RebasedOffset};

/// Read access to the set hierarchy.
pub trait ParentLookup {
    /// Set metadata by id.
    fn set(&self, id: SetId) -> Option<&CalibrationSet>;

    /// Parent links of `set`, in pivot order. Empty for the terminal set and orphans.
    fn parents_of(&self, set: SetId) -> &[ParentLink];

    /// The absolute-reference set.
    fn terminal(&self) -> SetId;

    /// The global anchor sensor inside the terminal set.
    fn anchor(&self) -> SensorId;

    fn is_terminal(&self, set: SetId) -> bool {
        set == self.terminal()
    }

    /// Parent of `set` reached by re-measuring `pivot` in the next round.
    fn parent_via(&self, set: SetId, pivot: SensorId) -> Option<SetId> {
        self.parents_of(set)
            .iter()
            .find(|link| link.pivots.contains(&pivot))
            .map(|link| link.parent)
    }
}

/// Source of single-set hops `sensor → pivot`.
pub trait OffsetSource {
    fn hop(
        &self,
        set: SetId,
        sensor: SensorId,
        pivot: SensorId,
    ) -> Result<RebasedOffset, DerivationGapError>;
}

/// Turns an enumerated path into a composed offset.
pub trait ChainComposer {
    fn compose<O: OffsetSource + ?Sized>(
        &self,
        path: &Path,
        offsets: &O,
    ) -> Result<ComposedChain, BrokenChainError>;
}

/// Merges independent chain estimates into a final constant.
pub trait Combiner {
    /// `None` when `chains` is empty.
    fn combine(&self, chains: &[Offset]) -> Option<Offset>;
}
