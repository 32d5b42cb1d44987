//! Aggregate statistics of a network build.

use rtd_calib_core::{Real, SensorId, SetId};
use rtd_calib_network::{CalibrationNetwork, CalibrationStatus, Diagnostic};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathCountStats {
    pub mean: Real,
    pub min: usize,
    pub max: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticCounts {
    pub orphan_sets: usize,
    pub derivation_gaps: usize,
    pub broken_chains: usize,
    pub path_explosions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSummary {
    pub reference_set: SetId,
    pub reference_sensor: SensorId,
    pub sets: usize,
    pub rounds: usize,
    /// Number of (sensor, set) results.
    pub results: usize,
    pub computed: usize,
    pub discarded: usize,
    pub unreachable: usize,
    /// Over computed results only; `None` when nothing was computed.
    pub path_count: Option<PathCountStats>,
    pub diagnostics: DiagnosticCounts,
}

pub fn summarize(network: &CalibrationNetwork) -> CalibrationSummary {
    let results = network.all_results();
    let count = |status: CalibrationStatus| results.iter().filter(|r| r.status == status).count();

    let counts: Vec<usize> = results
        .iter()
        .filter(|r| r.is_computed())
        .map(|r| r.path_count)
        .collect();
    let path_count = match (counts.iter().min(), counts.iter().max()) {
        (Some(&min), Some(&max)) => Some(PathCountStats {
            mean: counts.iter().sum::<usize>() as Real / counts.len() as Real,
            min,
            max,
        }),
        _ => None,
    };

    let mut diagnostics = DiagnosticCounts::default();
    for d in network.diagnostics() {
        match d {
            Diagnostic::OrphanSet(_) => diagnostics.orphan_sets += 1,
            Diagnostic::DerivationGap(_) => diagnostics.derivation_gaps += 1,
            Diagnostic::BrokenChain(_) => diagnostics.broken_chains += 1,
            Diagnostic::PathExplosion(_) => diagnostics.path_explosions += 1,
        }
    }

    CalibrationSummary {
        reference_set: network.reference_set(),
        reference_sensor: network.reference_sensor(),
        sets: network.hierarchy().len(),
        rounds: network.hierarchy().rounds().count(),
        results: results.len(),
        computed: count(CalibrationStatus::Computed),
        discarded: count(CalibrationStatus::Discarded),
        unreachable: count(CalibrationStatus::Unreachable),
        path_count,
        diagnostics,
    }
}
