//! Rebasing local offsets onto the pivot sensors of each set.
//!
//! Local offsets are measured against a set's references. Chains hop from a
//! sensor to a raised pivot instead, so each set re-expresses its members
//! relative to every pivot:
//!
//! `offset(s → p) = offset(s → r) − offset(p → r)`, errors in quadrature,
//!
//! where `r` is the first declared reference measured for both `s` and `p`.

use log::{debug, warn};
use rtd_calib_core::{CalibrationSet, LocalOffsetTable, Offset, SensorId, SetId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{DerivationGapError, GapCause, HierarchyIndex, OffsetSource, ParentLookup};

/// How a rebased offset was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HopKind {
    /// The sensor is the pivot itself; exactly `0 ± 0`.
    Identity,
    /// Base change through the given local reference.
    Via(SensorId),
}

/// Offset of `sensor` relative to `pivot` inside one set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RebasedOffset {
    pub set_id: SetId,
    pub sensor: SensorId,
    pub pivot: SensorId,
    pub offset: Offset,
    pub kind: HopKind,
}

impl RebasedOffset {
    pub fn is_identity(&self) -> bool {
        matches!(self.kind, HopKind::Identity)
    }

    /// Undo the base change: `offset(s → p) + offset(p → r) = offset(s → r)`.
    pub fn restore(&self, pivot_to_reference: Offset) -> Offset {
        self.offset.then(pivot_to_reference)
    }
}

/// Rebased offsets of one set and the pairs that could not be derived.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetRebase {
    pub offsets: Vec<RebasedOffset>,
    pub gaps: Vec<DerivationGapError>,
}

/// Rebase every active member of `set` onto each of its raised sensors.
pub fn derive(set: &CalibrationSet, table: &LocalOffsetTable) -> SetRebase {
    derive_onto(set, table, &set.raised)
}

/// Rebase every active member of `set` onto each of `pivots`.
///
/// Discarded members are skipped; a missing common reference is reported as
/// a gap rather than an error.
pub fn derive_onto(set: &CalibrationSet, table: &LocalOffsetTable, pivots: &[SensorId]) -> SetRebase {
    let mut out = SetRebase::default();

    for &pivot in pivots {
        for sensor in set.active_members() {
            if sensor == pivot {
                out.offsets.push(RebasedOffset {
                    set_id: set.set_id,
                    sensor,
                    pivot,
                    offset: Offset::ZERO,
                    kind: HopKind::Identity,
                });
                continue;
            }

            let via = set.references.iter().find_map(|&reference| {
                let s = table.against(sensor, reference)?;
                let p = table.against(pivot, reference)?;
                Some((reference, s.relative_to(p)))
            });

            match via {
                Some((reference, offset)) => out.offsets.push(RebasedOffset {
                    set_id: set.set_id,
                    sensor,
                    pivot,
                    offset,
                    kind: HopKind::Via(reference),
                }),
                None => out.gaps.push(DerivationGapError {
                    set_id: set.set_id,
                    sensor,
                    pivot,
                    cause: GapCause::NoCommonReference,
                }),
            }
        }
    }

    out
}

/// Rebased offsets of every linked set, keyed by `(set, pivot, sensor)`.
///
/// The terminal set is rebased onto the anchor. Orphan sets are skipped since
/// no chain can pass through them.
#[derive(Debug, Clone, Default)]
pub struct RebasedOffsetStore {
    offsets: BTreeMap<(SetId, SensorId, SensorId), RebasedOffset>,
    gaps: Vec<DerivationGapError>,
}

impl RebasedOffsetStore {
    pub fn build(hierarchy: &HierarchyIndex, tables: &BTreeMap<SetId, LocalOffsetTable>) -> Self {
        let mut store = Self::default();
        let anchor = [hierarchy.anchor()];

        for set in hierarchy.sets() {
            if hierarchy.is_orphan(set.set_id) {
                continue;
            }
            let Some(table) = tables.get(&set.set_id) else {
                warn!("{} has no local offset table", set.set_id);
                continue;
            };
            let pivots: &[SensorId] = if hierarchy.is_terminal(set.set_id) {
                &anchor
            } else {
                &set.raised
            };

            let mut rebase = derive_onto(set, table, pivots);
            for entering in entering_sensors(hierarchy, set.set_id) {
                if set.is_discarded(entering) {
                    rebase.gaps.extend(pivots.iter().map(|&pivot| DerivationGapError {
                        set_id: set.set_id,
                        sensor: entering,
                        pivot,
                        cause: GapCause::DiscardedInSet,
                    }));
                }
            }
            debug!(
                "{}: {} rebased offsets, {} gaps",
                set.set_id,
                rebase.offsets.len(),
                rebase.gaps.len()
            );
            for gap in &rebase.gaps {
                warn!("{gap}");
            }
            store.insert(rebase);
        }
        store
    }

    fn insert(&mut self, rebase: SetRebase) {
        for ro in rebase.offsets {
            self.offsets.insert((ro.set_id, ro.pivot, ro.sensor), ro);
        }
        self.gaps.extend(rebase.gaps);
    }

    pub fn get(&self, set: SetId, sensor: SensorId, pivot: SensorId) -> Option<&RebasedOffset> {
        self.offsets.get(&(set, pivot, sensor))
    }

    /// Rebased offsets of one set, ordered by pivot then sensor.
    pub fn in_set(&self, set: SetId) -> impl Iterator<Item = &RebasedOffset> + '_ {
        self.offsets
            .range((set, SensorId(0), SensorId(0))..=(set, SensorId(u64::MAX), SensorId(u64::MAX)))
            .map(|(_, ro)| ro)
    }

    pub fn gaps(&self) -> &[DerivationGapError] {
        &self.gaps
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Raised sensors of child sets that enter `set` as pivots.
fn entering_sensors(hierarchy: &HierarchyIndex, set: SetId) -> Vec<SensorId> {
    let mut entering: Vec<SensorId> = hierarchy
        .children_of(set)
        .iter()
        .flat_map(|&child| hierarchy.parents_of(child))
        .filter(|link| link.parent == set)
        .flat_map(|link| link.pivots.iter().copied())
        .collect();
    entering.sort_unstable();
    entering.dedup();
    entering
}

impl OffsetSource for RebasedOffsetStore {
    fn hop(
        &self,
        set: SetId,
        sensor: SensorId,
        pivot: SensorId,
    ) -> Result<RebasedOffset, DerivationGapError> {
        match self.get(set, sensor, pivot) {
            Some(ro) => Ok(*ro),
            None => Err(self
                .gaps
                .iter()
                .find(|g| g.set_id == set && g.sensor == sensor && g.pivot == pivot)
                .cloned()
                .unwrap_or(DerivationGapError {
                    set_id: set,
                    sensor,
                    pivot,
                    cause: GapCause::NotDerived,
                })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtd_calib_core::LocalOffset;

    fn set_a() -> (CalibrationSet, LocalOffsetTable) {
        let set = CalibrationSet::new(1, 1, [1u64, 2, 3])
            .with_raised([2u64])
            .with_references([3u64]);
        let table = LocalOffsetTable::new(
            &set,
            &[
                LocalOffset::new(1u64, 3u64, 0.5, 0.1),
                LocalOffset::new(2u64, 3u64, 0.3, 0.05),
            ],
        )
        .unwrap();
        (set, table)
    }

    #[test]
    fn members_are_rebased_onto_pivot() {
        let (set, table) = set_a();
        let rebase = derive(&set, &table);
        assert!(rebase.gaps.is_empty());
        assert_eq!(rebase.offsets.len(), 3);

        let s1 = rebase.offsets.iter().find(|r| r.sensor == SensorId(1)).unwrap();
        assert!((s1.offset.value - 0.2).abs() < 1e-12);
        assert!((s1.offset.error - (0.1f64.powi(2) + 0.05f64.powi(2)).sqrt()).abs() < 1e-12);
        assert_eq!(s1.kind, HopKind::Via(SensorId(3)));

        let pivot = rebase.offsets.iter().find(|r| r.sensor == SensorId(2)).unwrap();
        assert!(pivot.is_identity());
        assert_eq!(pivot.offset, Offset::ZERO);

        let reference = rebase.offsets.iter().find(|r| r.sensor == SensorId(3)).unwrap();
        assert!((reference.offset.value + 0.3).abs() < 1e-12);
    }

    #[test]
    fn restore_recovers_original_offset() {
        let (set, table) = set_a();
        let rebase = derive(&set, &table);
        let s1 = rebase.offsets.iter().find(|r| r.sensor == SensorId(1)).unwrap();
        let p_ref = table.against(SensorId(2), SensorId(3)).unwrap();
        let back = s1.restore(p_ref);
        assert!((back.value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn missing_measurement_becomes_gap() {
        let set = CalibrationSet::new(1, 1, [1u64, 2, 3, 4])
            .with_raised([2u64])
            .with_references([3u64]);
        let table =
            LocalOffsetTable::new(&set, &[LocalOffset::new(2u64, 3u64, 0.3, 0.05)]).unwrap();
        let rebase = derive(&set, &table);
        let gap_sensors: Vec<_> = rebase.gaps.iter().map(|g| g.sensor).collect();
        assert_eq!(gap_sensors, vec![SensorId(1), SensorId(4)]);
    }

    #[test]
    fn second_reference_is_used_when_first_is_missing() {
        let set = CalibrationSet::new(1, 1, [1u64, 2, 3, 4])
            .with_raised([2u64])
            .with_references([3u64, 4]);
        let table = LocalOffsetTable::new(
            &set,
            &[
                LocalOffset::new(1u64, 4u64, 0.7, 0.01),
                LocalOffset::new(2u64, 3u64, 0.3, 0.01),
                LocalOffset::new(2u64, 4u64, 0.1, 0.01),
            ],
        )
        .unwrap();
        let rebase = derive(&set, &table);
        let s1 = rebase.offsets.iter().find(|r| r.sensor == SensorId(1)).unwrap();
        assert_eq!(s1.kind, HopKind::Via(SensorId(4)));
        assert!((s1.offset.value - 0.6).abs() < 1e-12);
    }

    #[test]
    fn discarded_members_are_skipped() {
        let (set, table) = set_a();
        let set = set.with_discarded([1u64]);
        let rebase = derive(&set, &table);
        assert!(rebase.offsets.iter().all(|r| r.sensor != SensorId(1)));
    }
}
