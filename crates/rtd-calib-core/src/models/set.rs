//! Calibration set metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::{SensorId, SetId};

/// Errors raised by [`CalibrationSet::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetError {
    #[error("{set} has round 0; rounds start at 1")]
    ZeroRound { set: SetId },
    #[error("{set} has no member sensors")]
    EmptyMembers { set: SetId },
    #[error("{set} lists sensor {sensor} more than once in its {list} list")]
    DuplicateSensor {
        set: SetId,
        sensor: SensorId,
        list: &'static str,
    },
    #[error("{set}: {list} sensor {sensor} is not a member of the set")]
    NotAMember {
        set: SetId,
        sensor: SensorId,
        list: &'static str,
    },
    #[error("{set}: sensor {sensor} is both raised and discarded")]
    RaisedAndDiscarded { set: SetId, sensor: SensorId },
    #[error("{set} declares no reference sensor")]
    NoReference { set: SetId },
}

/// One group of sensors measured together against shared local references.
///
/// A set belongs to exactly one round. Its `raised` sensors are re-measured in
/// the next round and act as pivots linking this set to its parents.
/// The terminal (absolute-reference) set has no raised sensors; its first
/// reference is the global anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationSet {
    pub set_id: SetId,
    /// Round number, 1 = base round, increasing toward the absolute reference.
    pub round: u32,
    /// Member sensors in channel order.
    pub members: Vec<SensorId>,
    /// Sensors re-measured in the next round.
    #[serde(default)]
    pub raised: Vec<SensorId>,
    /// Sensors excluded from every calibration chain.
    #[serde(default)]
    pub discarded: Vec<SensorId>,
    /// Local references the offsets of this set were measured against, by preference.
    pub references: Vec<SensorId>,
}

impl CalibrationSet {
    /// Create a set with the given members and no raised, discarded or reference sensors.
    pub fn new<I, S>(set_id: impl Into<SetId>, round: u32, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SensorId>,
    {
        Self {
            set_id: set_id.into(),
            round,
            members: members.into_iter().map(Into::into).collect(),
            raised: Vec::new(),
            discarded: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn with_raised<I, S>(mut self, raised: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SensorId>,
    {
        self.raised = raised.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_discarded<I, S>(mut self, discarded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SensorId>,
    {
        self.discarded = discarded.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_references<I, S>(mut self, references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SensorId>,
    {
        self.references = references.into_iter().map(Into::into).collect();
        self
    }

    pub fn contains(&self, sensor: SensorId) -> bool {
        self.members.contains(&sensor)
    }

    pub fn is_raised(&self, sensor: SensorId) -> bool {
        self.raised.contains(&sensor)
    }

    pub fn is_discarded(&self, sensor: SensorId) -> bool {
        self.discarded.contains(&sensor)
    }

    pub fn is_reference(&self, sensor: SensorId) -> bool {
        self.references.contains(&sensor)
    }

    /// The preferred local reference, if any is declared.
    pub fn primary_reference(&self) -> Option<SensorId> {
        self.references.first().copied()
    }

    /// Members that take part in calibration chains.
    pub fn active_members(&self) -> impl Iterator<Item = SensorId> + '_ {
        self.members
            .iter()
            .copied()
            .filter(move |s| !self.is_discarded(*s))
    }

    /// Check the structural invariants of a single set.
    ///
    /// Cross-set rules (round links, terminal uniqueness) are checked when the
    /// hierarchy is built.
    pub fn validate(&self) -> Result<(), SetError> {
        let set = self.set_id;
        if self.round == 0 {
            return Err(SetError::ZeroRound { set });
        }
        if self.members.is_empty() {
            return Err(SetError::EmptyMembers { set });
        }
        if self.references.is_empty() {
            return Err(SetError::NoReference { set });
        }

        for (list, sensors) in [
            ("member", &self.members),
            ("raised", &self.raised),
            ("discarded", &self.discarded),
            ("reference", &self.references),
        ] {
            if let Some(sensor) = first_duplicate(sensors) {
                return Err(SetError::DuplicateSensor { set, sensor, list });
            }
        }

        for (list, sensors) in [
            ("raised", &self.raised),
            ("discarded", &self.discarded),
            ("reference", &self.references),
        ] {
            if let Some(&sensor) = sensors.iter().find(|s| !self.contains(**s)) {
                return Err(SetError::NotAMember { set, sensor, list });
            }
        }

        if let Some(&sensor) = self.raised.iter().find(|s| self.is_discarded(**s)) {
            return Err(SetError::RaisedAndDiscarded { set, sensor });
        }

        Ok(())
    }
}

fn first_duplicate(sensors: &[SensorId]) -> Option<SensorId> {
    let mut seen = BTreeSet::new();
    sensors.iter().copied().find(|s| !seen.insert(*s))
}
