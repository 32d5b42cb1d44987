//! Round-ordered registry of calibration sets and their parent links.

use log::{debug, info, warn};
use rtd_calib_core::{CalibrationSet, SensorId, SetError, SetId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ConfigurationError, OrphanSetError, ParentLookup};

/// `child` reaches `parent` by re-measuring each of `pivots` in `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    pub child: SetId,
    pub parent: SetId,
    pub pivots: Vec<SensorId>,
}

/// Validated hierarchy of all sets of a campaign.
///
/// Every link goes from round `r` to round `r + 1`, so the hierarchy is a
/// layered DAG and cannot contain cycles.
#[derive(Debug, Clone)]
pub struct HierarchyIndex {
    sets: BTreeMap<SetId, CalibrationSet>,
    rounds: BTreeMap<u32, Vec<SetId>>,
    parents: BTreeMap<SetId, Vec<ParentLink>>,
    children: BTreeMap<SetId, Vec<SetId>>,
    terminal: SetId,
    anchor: SensorId,
    orphans: Vec<OrphanSetError>,
}

impl HierarchyIndex {
    /// Validate `sets` and resolve the parent links between consecutive rounds.
    ///
    /// With `terminal == None` the single set of the highest round becomes the
    /// absolute reference.
    pub fn build<I>(sets: I, terminal: Option<SetId>) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = CalibrationSet>,
    {
        let mut registry = BTreeMap::new();
        for set in sets {
            set.validate()?;
            let id = set.set_id;
            if registry.insert(id, set).is_some() {
                return Err(ConfigurationError::DuplicateSet(id));
            }
        }
        if registry.is_empty() {
            return Err(ConfigurationError::Empty);
        }

        let mut rounds: BTreeMap<u32, Vec<SetId>> = BTreeMap::new();
        for set in registry.values() {
            rounds.entry(set.round).or_default().push(set.set_id);
        }

        let membership = index_membership(&registry)?;
        let terminal = resolve_terminal(&registry, &rounds, terminal)?;
        let anchor = {
            let set = &registry[&terminal];
            let anchor = set
                .primary_reference()
                .ok_or(SetError::NoReference { set: terminal })?;
            if set.is_discarded(anchor) {
                return Err(ConfigurationError::DiscardedAnchor {
                    set: terminal,
                    sensor: anchor,
                });
            }
            anchor
        };

        let mut parents: BTreeMap<SetId, Vec<ParentLink>> = BTreeMap::new();
        let mut children: BTreeMap<SetId, Vec<SetId>> = BTreeMap::new();
        let mut orphans = Vec::new();

        for set in registry.values() {
            if set.set_id == terminal {
                continue;
            }
            if set.raised.is_empty() {
                return Err(ConfigurationError::NoRaisedSensors {
                    set: set.set_id,
                    round: set.round,
                });
            }

            let next_round = set.round + 1;
            let mut links: Vec<ParentLink> = Vec::new();
            let mut dangling = None;
            for &pivot in &set.raised {
                let parent = match membership.get(&(next_round, pivot)).map(Vec::as_slice) {
                    Some(&[parent]) => parent,
                    Some(&[first, second, ..]) => {
                        return Err(ConfigurationError::AmbiguousParent {
                            child: set.set_id,
                            sensor: pivot,
                            round: next_round,
                            first,
                            second,
                        })
                    }
                    _ => {
                        dangling = dangling.or(Some(pivot));
                        continue;
                    }
                };
                match links.iter_mut().find(|l| l.parent == parent) {
                    Some(link) => link.pivots.push(pivot),
                    None => links.push(ParentLink {
                        child: set.set_id,
                        parent,
                        pivots: vec![pivot],
                    }),
                }
            }

            if links.is_empty() {
                let orphan = OrphanSetError {
                    set_id: set.set_id,
                    round: set.round,
                };
                warn!("{orphan}");
                orphans.push(orphan);
                continue;
            }
            if let Some(sensor) = dangling {
                return Err(ConfigurationError::DanglingPivot {
                    set: set.set_id,
                    sensor,
                    round: next_round,
                });
            }

            for link in &links {
                children.entry(link.parent).or_default().push(set.set_id);
            }
            debug!(
                "{} links to {:?}",
                set.set_id,
                links.iter().map(|l| l.parent.raw()).collect::<Vec<_>>()
            );
            parents.insert(set.set_id, links);
        }

        info!(
            "hierarchy: {} sets over {} rounds, terminal {}, anchor {}",
            registry.len(),
            rounds.len(),
            terminal,
            anchor
        );

        Ok(Self {
            sets: registry,
            rounds,
            parents,
            children,
            terminal,
            anchor,
            orphans,
        })
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// All sets in ascending id order.
    pub fn sets(&self) -> impl Iterator<Item = &CalibrationSet> + '_ {
        self.sets.values()
    }

    /// Set ids of one round, ascending. Empty for unknown rounds.
    pub fn sets_in_round(&self, round: u32) -> &[SetId] {
        self.rounds.get(&round).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rounds present in the campaign, ascending.
    pub fn rounds(&self) -> impl Iterator<Item = u32> + '_ {
        self.rounds.keys().copied()
    }

    /// Sets of the previous round that link to `set`.
    pub fn children_of(&self, set: SetId) -> &[SetId] {
        self.children.get(&set).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Non-terminal sets without any parent link.
    pub fn orphans(&self) -> &[OrphanSetError] {
        &self.orphans
    }

    pub fn is_orphan(&self, set: SetId) -> bool {
        self.orphans.iter().any(|o| o.set_id == set)
    }
}

impl ParentLookup for HierarchyIndex {
    fn set(&self, id: SetId) -> Option<&CalibrationSet> {
        self.sets.get(&id)
    }

    fn parents_of(&self, set: SetId) -> &[ParentLink] {
        self.parents.get(&set).map(Vec::as_slice).unwrap_or(&[])
    }

    fn terminal(&self) -> SetId {
        self.terminal
    }

    fn anchor(&self) -> SensorId {
        self.anchor
    }
}

/// `(round, sensor) → sets` for every member.
///
/// Members may be shared between sets of one round (reference probes usually
/// are); only raised sensors must be unique per round.
fn index_membership(
    registry: &BTreeMap<SetId, CalibrationSet>,
) -> Result<BTreeMap<(u32, SensorId), Vec<SetId>>, ConfigurationError> {
    let mut raised_by: BTreeMap<(u32, SensorId), SetId> = BTreeMap::new();
    for set in registry.values() {
        for &sensor in &set.raised {
            if let Some(&first) = raised_by.get(&(set.round, sensor)) {
                return Err(ConfigurationError::SharedRaised {
                    sensor,
                    round: set.round,
                    first,
                    second: set.set_id,
                });
            }
            raised_by.insert((set.round, sensor), set.set_id);
        }
    }

    let mut membership: BTreeMap<(u32, SensorId), Vec<SetId>> = BTreeMap::new();
    for set in registry.values() {
        for &sensor in &set.members {
            membership
                .entry((set.round, sensor))
                .or_default()
                .push(set.set_id);
        }
    }
    Ok(membership)
}

fn resolve_terminal(
    registry: &BTreeMap<SetId, CalibrationSet>,
    rounds: &BTreeMap<u32, Vec<SetId>>,
    requested: Option<SetId>,
) -> Result<SetId, ConfigurationError> {
    let (&max_round, top) = rounds.iter().next_back().ok_or(ConfigurationError::Empty)?;

    let terminal = match requested {
        Some(id) => {
            let set = registry
                .get(&id)
                .ok_or(ConfigurationError::UnknownTerminal(id))?;
            if set.round != max_round {
                return Err(ConfigurationError::TerminalNotHighest {
                    set: id,
                    round: set.round,
                    max_round,
                });
            }
            id
        }
        None => match top.as_slice() {
            [only] => *only,
            sets => {
                return Err(ConfigurationError::AmbiguousTerminal {
                    round: max_round,
                    sets: sets.to_vec(),
                })
            }
        },
    };

    if !registry[&terminal].raised.is_empty() {
        return Err(ConfigurationError::TerminalRaises(terminal));
    }
    Ok(terminal)
}
