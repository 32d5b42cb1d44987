//! Cross-check of declared raised sensors against set membership.
//!
//! A sensor is *detected* as raised when it is a member of a set and also of
//! some set in the next round. The audit runs on the raw campaign, so it also
//! helps diagnose campaigns the network refuses to build.

use log::warn;
use rtd_calib_core::{Campaign, CalibrationSet, SensorId, SetId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaisedAuditStatus {
    /// Declared and detected sensors agree.
    Consistent,
    /// Nothing declared although members reappear in the next round.
    Undeclared,
    /// Both lists are non-empty but differ.
    Mismatched,
    /// Sensors are declared but none reappears in the next round.
    Invalid,
    /// Nothing declared and nothing detected.
    Disconnected,
}

/// Audit of one non-terminal set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaisedAuditEntry {
    pub set_id: SetId,
    pub round: u32,
    pub declared: Vec<SensorId>,
    pub detected: Vec<SensorId>,
    /// Detected but not declared.
    pub missing: Vec<SensorId>,
    /// Declared but not detected.
    pub invalid: Vec<SensorId>,
    pub status: RaisedAuditStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaisedAudit {
    pub exclude_references: bool,
    pub entries: Vec<RaisedAuditEntry>,
}

impl RaisedAudit {
    pub fn is_consistent(&self) -> bool {
        self.entries
            .iter()
            .all(|e| e.status == RaisedAuditStatus::Consistent)
    }

    /// Entries that need attention.
    pub fn findings(&self) -> impl Iterator<Item = &RaisedAuditEntry> + '_ {
        self.entries
            .iter()
            .filter(|e| e.status != RaisedAuditStatus::Consistent)
    }
}

/// Audit every set below the highest round, in ascending `(round, set)` order.
///
/// With `exclude_references`, the local references of the audited set are
/// ignored. Reference probes are often shared between sets without being part
/// of the calibration tree. A raised sensor that serves as a reference in the
/// next round is still detected.
pub fn audit_raised(campaign: &Campaign, exclude_references: bool) -> RaisedAudit {
    let Some(max_round) = campaign.max_round() else {
        return RaisedAudit {
            exclude_references,
            entries: Vec::new(),
        };
    };

    let mut sets: Vec<&CalibrationSet> = campaign.sets.iter().map(|r| &r.set).collect();
    sets.sort_by_key(|s| (s.round, s.set_id));

    let mut entries = Vec::new();
    for set in sets.iter().filter(|s| s.round < max_round) {
        let own: BTreeSet<SensorId> = set
            .members
            .iter()
            .copied()
            .filter(|m| !(exclude_references && set.is_reference(*m)))
            .collect();
        let mut detected = BTreeSet::new();
        for next in sets.iter().filter(|s| s.round == set.round + 1) {
            detected.extend(own.iter().copied().filter(|m| next.contains(*m)));
        }

        let declared: BTreeSet<SensorId> = set.raised.iter().copied().collect();
        let missing: Vec<SensorId> = detected.difference(&declared).copied().collect();
        let invalid: Vec<SensorId> = declared.difference(&detected).copied().collect();

        let status = match (declared.is_empty(), detected.is_empty()) {
            (true, true) => RaisedAuditStatus::Disconnected,
            (true, false) => RaisedAuditStatus::Undeclared,
            (false, true) => RaisedAuditStatus::Invalid,
            (false, false) if missing.is_empty() && invalid.is_empty() => {
                RaisedAuditStatus::Consistent
            }
            (false, false) => RaisedAuditStatus::Mismatched,
        };
        if status != RaisedAuditStatus::Consistent {
            warn!(
                "raised audit {} (round {}): {:?}, missing {:?}, invalid {:?}",
                set.set_id, set.round, status, missing, invalid
            );
        }

        entries.push(RaisedAuditEntry {
            set_id: set.set_id,
            round: set.round,
            declared: set.raised.clone(),
            detected: detected.into_iter().collect(),
            missing,
            invalid,
            status,
        });
    }

    RaisedAudit {
        exclude_references,
        entries,
    }
}
