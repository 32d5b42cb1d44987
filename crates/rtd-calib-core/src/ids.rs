//! Stable identifiers for sensors and calibration sets.

use serde::{Deserialize, Serialize};

/// Physical sensor identifier (the serial number engraved on the probe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorId(pub u64);

impl SensorId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SensorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SensorId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Calibration set identifier, unique across all rounds of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetId(pub u32);

impl SetId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "set {}", self.0)
    }
}

impl From<u32> for SetId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}
