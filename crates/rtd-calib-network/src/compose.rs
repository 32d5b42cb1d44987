//! Composition of a path into a single offset.

use rtd_calib_core::{quadrature, Offset};
use serde::{Deserialize, Serialize};

use crate::{BrokenChainError, ChainComposer, OffsetSource, Path, RebasedOffset};

/// A path with the rebased offset of each hop and their sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedChain {
    pub path: Path,
    pub hops: Vec<RebasedOffset>,
    pub total: Offset,
}

/// Sums hop values and adds hop errors in quadrature.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuadratureComposer;

impl ChainComposer for QuadratureComposer {
    fn compose<O: OffsetSource + ?Sized>(
        &self,
        path: &Path,
        offsets: &O,
    ) -> Result<ComposedChain, BrokenChainError> {
        let mut hops = Vec::with_capacity(path.steps.len());
        for step in &path.steps {
            let hop = offsets
                .hop(step.set_id, step.from, step.to)
                .map_err(|gap| BrokenChainError {
                    sensor: path.sensor,
                    origin: path.origin,
                    set_id: gap.set_id,
                    from: step.from,
                    to: step.to,
                })?;
            hops.push(hop);
        }

        let total = Offset::new(
            hops.iter().map(|h| h.offset.value).sum(),
            quadrature(hops.iter().map(|h| h.offset.error)),
        );
        Ok(ComposedChain {
            path: path.clone(),
            hops,
            total,
        })
    }
}

/// Compose `path` with the default composer.
pub fn compose<O: OffsetSource + ?Sized>(path: &Path, offsets: &O) -> Result<ComposedChain, BrokenChainError> {
    QuadratureComposer.compose(path, offsets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DerivationGapError, GapCause, HopKind, PathStep};
    use rtd_calib_core::{SensorId, SetId};
    use std::collections::BTreeMap;

    struct Fixed(BTreeMap<(u32, u64, u64), Offset>);

    impl OffsetSource for Fixed {
        fn hop(
            &self,
            set: SetId,
            sensor: SensorId,
            pivot: SensorId,
        ) -> Result<RebasedOffset, DerivationGapError> {
            self.0
                .get(&(set.raw(), sensor.raw(), pivot.raw()))
                .map(|&offset| RebasedOffset {
                    set_id: set,
                    sensor,
                    pivot,
                    offset,
                    kind: HopKind::Via(pivot),
                })
                .ok_or(DerivationGapError {
                    set_id: set,
                    sensor,
                    pivot,
                    cause: GapCause::NotDerived,
                })
        }
    }

    fn step(set: u32, from: u64, to: u64) -> PathStep {
        PathStep {
            set_id: SetId(set),
            from: SensorId(from),
            to: SensorId(to),
        }
    }

    #[test]
    fn hops_sum_with_quadrature_errors() {
        let source = Fixed(BTreeMap::from([
            ((1, 1, 2), Offset::new(0.2, 0.03)),
            ((2, 2, 4), Offset::new(0.1, 0.04)),
        ]));
        let path = Path {
            sensor: SensorId(1),
            origin: SetId(1),
            steps: vec![step(1, 1, 2), step(2, 2, 4)],
        };
        let chain = compose(&path, &source).unwrap();
        assert!((chain.total.value - 0.3).abs() < 1e-12);
        assert!((chain.total.error - 0.05).abs() < 1e-12);
        assert_eq!(chain.hops.len(), 2);
    }

    #[test]
    fn missing_hop_breaks_chain() {
        let source = Fixed(BTreeMap::from([((1, 1, 2), Offset::new(0.2, 0.03))]));
        let path = Path {
            sensor: SensorId(1),
            origin: SetId(1),
            steps: vec![step(1, 1, 2), step(2, 2, 4)],
        };
        let err = compose(&path, &source).unwrap_err();
        assert_eq!(err.set_id, SetId(2));
        assert_eq!(err.from, SensorId(2));
    }

    #[test]
    fn empty_path_is_exact_zero() {
        let source = Fixed(BTreeMap::new());
        let path = Path {
            sensor: SensorId(7),
            origin: SetId(9),
            steps: Vec::new(),
        };
        assert_eq!(compose(&path, &source).unwrap().total, Offset::ZERO);
    }
}
