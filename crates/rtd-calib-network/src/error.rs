//! Error taxonomy of the calibration network.
//!
//! [`ConfigurationError`] is fatal and aborts [`CalibrationNetwork::build`].
//! The remaining errors are recoverable: they are logged, collected as
//! [`Diagnostic`]s and reflected in per-sensor results.
//!
//! [`CalibrationNetwork::build`]: crate::CalibrationNetwork::build

use rtd_calib_core::{OffsetTableError, SensorId, SetError, SetId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Structural problems in the campaign that make the hierarchy unusable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("campaign contains no calibration sets")]
    Empty,
    #[error(transparent)]
    InvalidSet(#[from] SetError),
    #[error(transparent)]
    InvalidOffsets(#[from] OffsetTableError),
    #[error("{0} is defined more than once")]
    DuplicateSet(SetId),
    #[error("sensor {sensor} is raised by both {first} and {second} in round {round}")]
    SharedRaised {
        sensor: SensorId,
        round: u32,
        first: SetId,
        second: SetId,
    },
    #[error("raised sensor {sensor} of {child} is a member of both {first} and {second} in round {round}")]
    AmbiguousParent {
        child: SetId,
        sensor: SensorId,
        round: u32,
        first: SetId,
        second: SetId,
    },
    #[error("terminal {0} is not part of the campaign")]
    UnknownTerminal(SetId),
    #[error("round {round} must hold exactly one set to act as absolute reference, found {sets:?}")]
    AmbiguousTerminal { round: u32, sets: Vec<SetId> },
    #[error("terminal {set} is in round {round} but the campaign reaches round {max_round}")]
    TerminalNotHighest {
        set: SetId,
        round: u32,
        max_round: u32,
    },
    #[error("terminal {0} must not raise sensors")]
    TerminalRaises(SetId),
    #[error("anchor sensor {sensor} of terminal {set} is discarded")]
    DiscardedAnchor { set: SetId, sensor: SensorId },
    #[error("{set} (round {round}) is not terminal but raises no sensors")]
    NoRaisedSensors { set: SetId, round: u32 },
    #[error("{set}: raised sensor {sensor} is not a member of any round-{round} set")]
    DanglingPivot {
        set: SetId,
        sensor: SensorId,
        round: u32,
    },
    #[error("invalid network parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// A non-terminal set none of whose raised sensors reappear in the next round.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{set_id} (round {round}) has no parent set; its sensors cannot be calibrated")]
pub struct OrphanSetError {
    pub set_id: SetId,
    pub round: u32,
}

/// Why a sensor has no rebased offset onto a pivot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapCause {
    /// Sensor and pivot share no measured local reference.
    #[default]
    NoCommonReference,
    /// A raised sensor of a child set is discarded in this set.
    DiscardedInSet,
    /// Nothing was derived for the pair.
    NotDerived,
}

impl fmt::Display for GapCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GapCause::NoCommonReference => "no common reference measured",
            GapCause::DiscardedInSet => "sensor is discarded here",
            GapCause::NotDerived => "not derived",
        })
    }
}

/// A sensor of a set that cannot be rebased onto one of its pivots.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{set_id}: no offset of sensor {sensor} onto pivot {pivot} ({cause})")]
pub struct DerivationGapError {
    pub set_id: SetId,
    pub sensor: SensorId,
    pub pivot: SensorId,
    #[serde(default)]
    pub cause: GapCause,
}

/// A calibration path with a hop that has no rebased offset.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("chain of sensor {sensor} from {origin} broken at {set_id} hop {from}->{to}")]
pub struct BrokenChainError {
    pub sensor: SensorId,
    pub origin: SetId,
    pub set_id: SetId,
    pub from: SensorId,
    pub to: SensorId,
}

/// More calibration paths than the configured limit.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("sensor {sensor} in {set_id} has more than {limit} calibration paths")]
pub struct PathExplosionError {
    pub sensor: SensorId,
    pub set_id: SetId,
    pub limit: usize,
}

/// Recoverable problem recorded while building the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    OrphanSet(OrphanSetError),
    DerivationGap(DerivationGapError),
    BrokenChain(BrokenChainError),
    PathExplosion(PathExplosionError),
}

impl Diagnostic {
    /// Set the diagnostic refers to.
    pub fn set_id(&self) -> SetId {
        match self {
            Diagnostic::OrphanSet(e) => e.set_id,
            Diagnostic::DerivationGap(e) => e.set_id,
            Diagnostic::BrokenChain(e) => e.set_id,
            Diagnostic::PathExplosion(e) => e.set_id,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::OrphanSet(e) => e.fmt(f),
            Diagnostic::DerivationGap(e) => e.fmt(f),
            Diagnostic::BrokenChain(e) => e.fmt(f),
            Diagnostic::PathExplosion(e) => e.fmt(f),
        }
    }
}

impl From<OrphanSetError> for Diagnostic {
    fn from(e: OrphanSetError) -> Self {
        Diagnostic::OrphanSet(e)
    }
}

impl From<DerivationGapError> for Diagnostic {
    fn from(e: DerivationGapError) -> Self {
        Diagnostic::DerivationGap(e)
    }
}

impl From<BrokenChainError> for Diagnostic {
    fn from(e: BrokenChainError) -> Self {
        Diagnostic::BrokenChain(e)
    }
}

impl From<PathExplosionError> for Diagnostic {
    fn from(e: PathExplosionError) -> Self {
        Diagnostic::PathExplosion(e)
    }
}
