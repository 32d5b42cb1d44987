//! Core data model and uncertainty math for `rtd-calib`.
//!
//! This crate contains:
//! - identifiers ([`SensorId`], [`SetId`]) and the scalar alias [`Real`],
//! - the campaign data model ([`CalibrationSet`], [`LocalOffset`],
//!   [`LocalOffsetTable`], [`Campaign`]),
//! - the [`Offset`] value type with quadrature error propagation,
//! - a deterministic synthetic campaign generator for tests and examples.
//!
//! Sensor offsets are always relative: an offset belongs to the set that
//! measured it and is expressed against a reference sensor of that set.

/// Sensor and set identifiers.
pub mod ids;
/// Scalar alias and error propagation helpers.
pub mod math;
/// Sets, offsets and the campaign input document.
pub mod models;
pub mod synthetic;

pub use ids::*;
pub use math::*;
pub use models::*;
