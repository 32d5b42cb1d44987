//! Orchestration: from a campaign to one calibration constant per sensor and set.

use log::{debug, info, warn};
use rtd_calib_core::{Campaign, LocalOffsetTable, Offset, Real, SensorId, SetId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{
    enumerate_paths, BrokenChainError, ChainComposer, Combiner, ComposedChain,
    ConfigurationError, Diagnostic, HierarchyIndex, InverseVarianceCombiner, ParentLookup, Path,
    PathExplosionError, Paths, QuadratureComposer, RebasedOffsetStore, DEFAULT_EPSILON,
};

/// Tunables of the network build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// A sensor with more paths than this is reported unreachable.
    pub max_paths_per_sensor: usize,
    /// Variance regulariser of the inverse-variance weights.
    pub epsilon: Real,
    /// Absolute-reference set; `None` picks the single set of the highest round.
    pub terminal_set: Option<SetId>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_paths_per_sensor: 10_000,
            epsilon: DEFAULT_EPSILON,
            terminal_set: None,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_paths_per_sensor == 0 {
            return Err(ConfigurationError::InvalidParameter {
                name: "max_paths_per_sensor",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(ConfigurationError::InvalidParameter {
                name: "epsilon",
                reason: format!("must be finite and > 0, got {}", self.epsilon),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    Computed,
    Discarded,
    Unreachable,
}

/// Why a sensor ended up unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachableReason {
    /// No route from the origin set to the terminal set.
    NoPath,
    /// Every route had a hop without a rebased offset.
    AllChainsBroken,
    /// More routes than `max_paths_per_sensor`.
    PathExplosion,
}

/// Calibration constant of one sensor as seen from one origin set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub sensor_id: SensorId,
    pub origin_set_id: SetId,
    pub origin_round: u32,
    pub final_offset: Option<Real>,
    pub final_error: Option<Real>,
    /// Number of enumerated paths.
    pub path_count: usize,
    /// Paths that composed into a usable chain.
    pub chains_used: usize,
    pub status: CalibrationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<UnreachableReason>,
}

impl CalibrationResult {
    pub fn is_computed(&self) -> bool {
        self.status == CalibrationStatus::Computed
    }

    /// Final constant with its error, for computed results.
    pub fn constant(&self) -> Option<Offset> {
        Some(Offset::new(self.final_offset?, self.final_error?))
    }
}

/// Per-sensor progress while resolving its constant.
enum SensorState {
    Pending,
    Enumerated(Vec<Path>),
    Combined {
        constant: Offset,
        path_count: usize,
        chains_used: usize,
    },
    Discarded,
    Unreachable {
        reason: UnreachableReason,
        path_count: usize,
    },
}

struct Resolution {
    result: CalibrationResult,
    diagnostics: Vec<Diagnostic>,
}

/// Borrowed view used to resolve sensors independently of each other.
struct Resolver<'a> {
    hierarchy: &'a HierarchyIndex,
    offsets: &'a RebasedOffsetStore,
    combiner: InverseVarianceCombiner,
    limit: usize,
}

impl Resolver<'_> {
    fn resolve(&self, set_id: SetId, round: u32, sensor: SensorId, discarded: bool) -> Resolution {
        let mut diagnostics = Vec::new();
        let mut state = if discarded {
            SensorState::Discarded
        } else {
            SensorState::Pending
        };

        loop {
            state = match state {
                SensorState::Pending => {
                    let paths: Vec<Path> = enumerate_paths(sensor, set_id, self.hierarchy)
                        .take(self.limit.saturating_add(1))
                        .collect();
                    if paths.len() > self.limit {
                        let err = PathExplosionError {
                            sensor,
                            set_id,
                            limit: self.limit,
                        };
                        warn!("{err}");
                        diagnostics.push(err.into());
                        SensorState::Unreachable {
                            reason: UnreachableReason::PathExplosion,
                            path_count: paths.len(),
                        }
                    } else if paths.is_empty() {
                        SensorState::Unreachable {
                            reason: UnreachableReason::NoPath,
                            path_count: 0,
                        }
                    } else {
                        SensorState::Enumerated(paths)
                    }
                }
                SensorState::Enumerated(paths) => {
                    let mut totals = Vec::with_capacity(paths.len());
                    for path in &paths {
                        match QuadratureComposer.compose(path, self.offsets) {
                            Ok(chain) => totals.push(chain.total),
                            Err(err) => {
                                debug!("{err}");
                                diagnostics.push(err.into());
                            }
                        }
                    }
                    match self.combiner.combine(&totals) {
                        Some(constant) => SensorState::Combined {
                            constant,
                            path_count: paths.len(),
                            chains_used: totals.len(),
                        },
                        None => SensorState::Unreachable {
                            reason: UnreachableReason::AllChainsBroken,
                            path_count: paths.len(),
                        },
                    }
                }
                SensorState::Combined {
                    constant,
                    path_count,
                    chains_used,
                } => {
                    debug!(
                        "sensor {sensor} in {set_id}: {:+.5} ± {:.5} K from {chains_used}/{path_count} chains",
                        constant.value, constant.error
                    );
                    return Resolution {
                        result: CalibrationResult {
                            sensor_id: sensor,
                            origin_set_id: set_id,
                            origin_round: round,
                            final_offset: Some(constant.value),
                            final_error: Some(constant.error),
                            path_count,
                            chains_used,
                            status: CalibrationStatus::Computed,
                            reason: None,
                        },
                        diagnostics,
                    };
                }
                SensorState::Discarded => {
                    return Resolution {
                        result: CalibrationResult {
                            sensor_id: sensor,
                            origin_set_id: set_id,
                            origin_round: round,
                            final_offset: None,
                            final_error: None,
                            path_count: 0,
                            chains_used: 0,
                            status: CalibrationStatus::Discarded,
                            reason: None,
                        },
                        diagnostics,
                    };
                }
                SensorState::Unreachable { reason, path_count } => {
                    return Resolution {
                        result: CalibrationResult {
                            sensor_id: sensor,
                            origin_set_id: set_id,
                            origin_round: round,
                            final_offset: None,
                            final_error: None,
                            path_count,
                            chains_used: 0,
                            status: CalibrationStatus::Unreachable,
                            reason: Some(reason),
                        },
                        diagnostics,
                    };
                }
            };
        }
    }
}

/// Fully resolved calibration network of a campaign.
#[derive(Debug, Clone)]
pub struct CalibrationNetwork {
    config: NetworkConfig,
    hierarchy: HierarchyIndex,
    offsets: RebasedOffsetStore,
    results: Vec<CalibrationResult>,
    diagnostics: Vec<Diagnostic>,
}

impl CalibrationNetwork {
    /// Validate `campaign`, rebase every set and resolve every (sensor, set) pair.
    ///
    /// Only structural problems fail the build; gaps, broken chains and orphan
    /// sets are reported through [`CalibrationNetwork::diagnostics`].
    pub fn build(campaign: &Campaign, config: &NetworkConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let hierarchy = HierarchyIndex::build(
            campaign.sets.iter().map(|r| r.set.clone()),
            config.terminal_set,
        )?;

        let mut tables = BTreeMap::new();
        for record in &campaign.sets {
            let table = LocalOffsetTable::new(&record.set, &record.offsets)?;
            tables.insert(record.set.set_id, table);
        }

        let offsets = RebasedOffsetStore::build(&hierarchy, &tables);

        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        diagnostics.extend(hierarchy.orphans().iter().cloned().map(Diagnostic::from));
        diagnostics.extend(offsets.gaps().iter().cloned().map(Diagnostic::from));

        let mut work = Vec::new();
        for round in hierarchy.rounds() {
            for &set_id in hierarchy.sets_in_round(round) {
                let Some(set) = hierarchy.set(set_id) else {
                    continue;
                };
                let mut members = set.members.clone();
                members.sort();
                for sensor in members {
                    work.push((set_id, round, sensor, set.is_discarded(sensor)));
                }
            }
        }

        let resolver = Resolver {
            hierarchy: &hierarchy,
            offsets: &offsets,
            combiner: InverseVarianceCombiner::new(config.epsilon),
            limit: config.max_paths_per_sensor,
        };

        #[cfg(feature = "rayon")]
        let resolutions: Vec<Resolution> = work
            .par_iter()
            .map(|&(set_id, round, sensor, discarded)| resolver.resolve(set_id, round, sensor, discarded))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let resolutions: Vec<Resolution> = work
            .iter()
            .map(|&(set_id, round, sensor, discarded)| resolver.resolve(set_id, round, sensor, discarded))
            .collect();

        let mut results = Vec::with_capacity(resolutions.len());
        for resolution in resolutions {
            diagnostics.extend(resolution.diagnostics);
            results.push(resolution.result);
        }

        let computed = results.iter().filter(|r| r.is_computed()).count();
        info!(
            "calibrated {computed}/{} (sensor, set) pairs; {} diagnostics",
            results.len(),
            diagnostics.len()
        );

        Ok(Self {
            config: config.clone(),
            hierarchy,
            offsets,
            results,
            diagnostics,
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn hierarchy(&self) -> &HierarchyIndex {
        &self.hierarchy
    }

    pub fn offsets(&self) -> &RebasedOffsetStore {
        &self.offsets
    }

    /// Every result, ordered by round, then set id, then sensor id.
    pub fn all_results(&self) -> &[CalibrationResult] {
        &self.results
    }

    /// Results of `sensor` in every set it belongs to, lowest round first.
    pub fn results_for(&self, sensor: SensorId) -> impl Iterator<Item = &CalibrationResult> + '_ {
        self.results.iter().filter(move |r| r.sensor_id == sensor)
    }

    /// The constant of `sensor` from its lowest-round set, lowest set id first
    /// when the sensor is shared within that round.
    pub fn constants_for(&self, sensor: SensorId) -> Option<&CalibrationResult> {
        self.results_for(sensor).next()
    }

    pub fn result_in(&self, sensor: SensorId, set: SetId) -> Option<&CalibrationResult> {
        self.results
            .iter()
            .find(|r| r.sensor_id == sensor && r.origin_set_id == set)
    }

    /// Restartable path enumeration for `sensor` in `set`.
    pub fn paths_for(&self, sensor: SensorId, set: SetId) -> Paths<'_, HierarchyIndex> {
        enumerate_paths(sensor, set, &self.hierarchy)
    }

    /// Composed chains of `sensor` in `set`, with the chains that broke.
    ///
    /// Enumeration stops at the configured path limit.
    pub fn chains_for(
        &self,
        sensor: SensorId,
        set: SetId,
    ) -> (Vec<ComposedChain>, Vec<BrokenChainError>) {
        let mut chains = Vec::new();
        let mut broken = Vec::new();
        for path in self.paths_for(sensor, set).take(self.config.max_paths_per_sensor) {
            match QuadratureComposer.compose(&path, &self.offsets) {
                Ok(chain) => chains.push(chain),
                Err(err) => broken.push(err),
            }
        }
        (chains, broken)
    }

    pub fn combiner(&self) -> InverseVarianceCombiner {
        InverseVarianceCombiner::new(self.config.epsilon)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The absolute-reference set.
    pub fn reference_set(&self) -> SetId {
        self.hierarchy.terminal()
    }

    /// The sensor every constant is expressed against.
    pub fn reference_sensor(&self) -> SensorId {
        self.hierarchy.anchor()
    }
}
