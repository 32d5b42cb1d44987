//! Deterministic synthetic campaign generation.
//!
//! This module provides small building blocks for constructing synthetic
//! calibration campaigns used in tests and examples:
//! - tiered set layouts converging on one terminal set,
//! - known per-sensor biases, so expected constants are available,
//! - deterministic pseudo-random noise on the local offsets.
//!
//! # Example
//!
//! ```
//! use rtd_calib_core::synthetic::{tiered_campaign, TieredLayout};
//!
//! let synth = tiered_campaign(&TieredLayout::default()).unwrap();
//! assert_eq!(synth.campaign.sets.len(), 7);
//! assert_eq!(synth.expected_constant(synth.anchor), Some(0.0));
//! ```

pub mod noise;
pub mod tiered;

pub use noise::UniformOffsetNoise;
pub use tiered::{tiered_campaign, SyntheticCampaign, TieredLayout};
