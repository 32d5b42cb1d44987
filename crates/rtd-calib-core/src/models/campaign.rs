//! Input document for a full calibration campaign.

use serde::{Deserialize, Serialize};

use crate::{CalibrationSet, LocalOffset, SensorId, SetId};

/// One calibration set together with the local offsets measured in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
    pub set: CalibrationSet,
    #[serde(default)]
    pub offsets: Vec<LocalOffset>,
}

/// Every set of every round, as produced by the measurement layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub sets: Vec<SetRecord>,
}

impl Campaign {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a set and its local offsets.
    pub fn push(&mut self, set: CalibrationSet, offsets: Vec<LocalOffset>) {
        self.sets.push(SetRecord { set, offsets });
    }

    /// Builder-style variant of [`Campaign::push`].
    pub fn with_set(mut self, set: CalibrationSet, offsets: Vec<LocalOffset>) -> Self {
        self.push(set, offsets);
        self
    }

    pub fn find(&self, set_id: SetId) -> Option<&SetRecord> {
        self.sets.iter().find(|r| r.set.set_id == set_id)
    }

    /// Remove a set (and its offsets) from the campaign, returning it.
    pub fn remove(&mut self, set_id: SetId) -> Option<SetRecord> {
        let idx = self.sets.iter().position(|r| r.set.set_id == set_id)?;
        Some(self.sets.remove(idx))
    }

    /// Highest round present, if any.
    pub fn max_round(&self) -> Option<u32> {
        self.sets.iter().map(|r| r.set.round).max()
    }

    /// Sets containing `sensor`, in input order.
    pub fn sets_containing(&self, sensor: SensorId) -> impl Iterator<Item = &CalibrationSet> + '_ {
        self.sets
            .iter()
            .map(|r| &r.set)
            .filter(move |s| s.contains(sensor))
    }
}
