//! Multi-round calibration network for RTD temperature sensors.
//!
//! Sensors are calibrated in sets against local references. A few sensors of
//! each set are "raised" into a set of the next round, which links the sets
//! into a hierarchy that ends in a single terminal set holding the absolute
//! reference. This crate:
//!
//! - validates the hierarchy and resolves parent links ([`HierarchyIndex`]),
//! - rebases local offsets onto the raised pivots ([`RebasedOffsetStore`]),
//! - enumerates every path to the anchor ([`enumerate_paths`]),
//! - composes each path into a chain ([`QuadratureComposer`]),
//! - combines chains by inverse-variance weighting ([`InverseVarianceCombiner`]).
//!
//! [`CalibrationNetwork`] runs all of it for a [`rtd_calib_core::Campaign`].

pub mod combine;
pub mod compose;
pub mod error;
pub mod hierarchy;
pub mod network;
pub mod paths;
pub mod rebase;
pub mod traits;

pub use combine::{InverseVarianceCombiner, DEFAULT_EPSILON};
pub use compose::{compose, ComposedChain, QuadratureComposer};
pub use error::{
    BrokenChainError, ConfigurationError, DerivationGapError, Diagnostic, GapCause, OrphanSetError,
    PathExplosionError,
};
pub use hierarchy::{HierarchyIndex, ParentLink};
pub use network::{
    CalibrationNetwork, CalibrationResult, CalibrationStatus, NetworkConfig, UnreachableReason,
};
pub use paths::{enumerate_paths, Path, PathStep, Paths};
pub use rebase::{derive, derive_onto, HopKind, RebasedOffset, RebasedOffsetStore, SetRebase};
pub use traits::{ChainComposer, Combiner, OffsetSource, ParentLookup};
