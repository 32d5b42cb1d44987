//! High-level entry crate for multi-round RTD sensor calibration.
//!
//! Sensors are calibrated in sets against local references; a few sensors of
//! every set are re-measured in a set of the next round. This crate resolves
//! every sensor's constant against the single absolute reference at the top of
//! that hierarchy, combining all independent routes by inverse-variance
//! weighting.
//!
//! ## 1. One-shot pipeline
//!
//! ```
//! use rtd_calib::core::synthetic::{tiered_campaign, TieredLayout};
//! use rtd_calib::pipeline::{run_calibration, CalibrationConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let synth = tiered_campaign(&TieredLayout::default())?;
//! let report = run_calibration(&synth.campaign, &CalibrationConfig::default())?;
//!
//! assert_eq!(report.reference_sensor, synth.anchor);
//! println!("{}", serde_json::to_string_pretty(&report.summary)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## 2. Network API
//!
//! Use when you need to inspect the hierarchy, paths or individual chains:
//!
//! ```
//! use rtd_calib::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let campaign = Campaign::new()
//!     .with_set(
//!         CalibrationSet::new(1, 1, [1u64, 2, 3])
//!             .with_raised([2u64])
//!             .with_references([3u64]),
//!         vec![
//!             LocalOffset::new(1u64, 3u64, 0.5, 0.1),
//!             LocalOffset::new(2u64, 3u64, 0.3, 0.05),
//!         ],
//!     )
//!     .with_set(
//!         CalibrationSet::new(2, 2, [2u64, 4]).with_references([4u64]),
//!         vec![LocalOffset::new(2u64, 4u64, 0.2, 0.02)],
//!     );
//!
//! let network = CalibrationNetwork::build(&campaign, &NetworkConfig::default())?;
//! let sensor_1 = network.constants_for(SensorId(1)).unwrap();
//! assert!((sensor_1.final_offset.unwrap() - 0.4).abs() < 1e-12);
//!
//! for path in network.paths_for(SensorId(1), SetId(1)) {
//!     println!("{path}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - **[`core`]**: identifiers, sets, offsets, campaign document, synthetic generator
//! - **[`network`]**: hierarchy, rebasing, path enumeration, combination
//! - **[`pipeline`]**: configuration, reports, path details, raised audit
//! - **[`prelude`]**: convenient re-exports for common use cases
//!
//! ## Features
//!
//! - `rayon`: resolve sensors in parallel while keeping result order.

/// Data model and error propagation math.
pub mod core {
    pub use rtd_calib_core::*;
}

/// Calibration network: hierarchy, rebased offsets, paths and combination.
pub mod network {
    pub use rtd_calib_network::*;
}

/// JSON-facing workflow with reports, path details and raised audit.
pub mod pipeline {
    pub use rtd_calib_pipeline::*;
}

/// Convenient re-exports for common use cases.
///
/// Import with `use rtd_calib::prelude::*;` to get started quickly.
pub mod prelude {
    pub use crate::core::{
        CalibrationSet, Campaign, LocalOffset, LocalOffsetTable, Offset, Real, SensorId, SetId,
    };

    pub use crate::network::{
        CalibrationNetwork, CalibrationResult, CalibrationStatus, ConfigurationError, Diagnostic,
        NetworkConfig, ParentLookup, UnreachableReason,
    };

    pub use crate::pipeline::{run_calibration, CalibrationConfig, CalibrationReport};
}
