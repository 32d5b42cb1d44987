//! Campaign data model.
//!
//! The measurement layer produces, per calibration set:
//!
//! 1. [`CalibrationSet`]: which sensors were measured, which are raised to the
//!    next round, which are discarded, and which act as local references.
//! 2. [`LocalOffset`] records: offset of each member against a local reference.
//!
//! A [`Campaign`] bundles both for every set of every round and is the input
//! document of the calibration network. Nothing here is mutated after
//! construction; derived quantities live in the network crate.

mod campaign;
mod offset;
mod set;

pub use campaign::*;
pub use offset::*;
pub use set::*;
