//! Offsets with uncertainties and the per-set local offset table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::{math::quadrature, CalibrationSet, Real, SensorId, SetId};

/// A temperature offset (kelvin) with its standard uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub value: Real,
    pub error: Real,
}

impl Offset {
    /// Exact zero offset, used for a sensor measured against itself.
    pub const ZERO: Offset = Offset {
        value: 0.0,
        error: 0.0,
    };

    pub fn new(value: Real, error: Real) -> Self {
        Self { value, error }
    }

    pub fn variance(&self) -> Real {
        self.error * self.error
    }

    /// Concatenate two hops `a → b` and `b → c` into `a → c`.
    ///
    /// Values add; independent errors add in quadrature.
    pub fn then(self, next: Offset) -> Offset {
        Offset {
            value: self.value + next.value,
            error: quadrature([self.error, next.error]),
        }
    }

    /// Base change: given `a → r` (self) and `b → r`, return `a → b`.
    pub fn relative_to(self, pivot: Offset) -> Offset {
        Offset {
            value: self.value - pivot.value,
            error: quadrature([self.error, pivot.error]),
        }
    }
}

/// One externally measured offset of `sensor` against a local `reference`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalOffset {
    pub sensor: SensorId,
    pub reference: SensorId,
    pub value: Real,
    pub error: Real,
}

impl LocalOffset {
    pub fn new(
        sensor: impl Into<SensorId>,
        reference: impl Into<SensorId>,
        value: Real,
        error: Real,
    ) -> Self {
        Self {
            sensor: sensor.into(),
            reference: reference.into(),
            value,
            error,
        }
    }

    pub fn offset(&self) -> Offset {
        Offset::new(self.value, self.error)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OffsetTableError {
    #[error("{set}: offset given for sensor {sensor}, which is not a member")]
    UnknownSensor { set: SetId, sensor: SensorId },
    #[error("{set}: sensor {sensor} measured against {reference}, which is not a declared reference")]
    NotAReference {
        set: SetId,
        sensor: SensorId,
        reference: SensorId,
    },
    #[error("{set}: explicit offset of sensor {sensor} against itself ({value} K); self offsets are implicit")]
    SelfReference {
        set: SetId,
        sensor: SensorId,
        value: Real,
    },
    #[error("{set}: offset {sensor}→{reference} has non-finite value {value}")]
    InvalidValue {
        set: SetId,
        sensor: SensorId,
        reference: SensorId,
        value: Real,
    },
    #[error("{set}: offset {sensor}→{reference} has invalid error {error} (must be finite and >= 0)")]
    InvalidError {
        set: SetId,
        sensor: SensorId,
        reference: SensorId,
        error: Real,
    },
    #[error("{set}: offset {sensor}→{reference} given more than once")]
    Duplicate {
        set: SetId,
        sensor: SensorId,
        reference: SensorId,
    },
}

/// Validated, immutable `(sensor, reference) → offset` table of one set.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalOffsetTable {
    set_id: SetId,
    entries: BTreeMap<(SensorId, SensorId), Offset>,
}

impl LocalOffsetTable {
    /// Validate `offsets` against the metadata of `set` and index them.
    pub fn new(set: &CalibrationSet, offsets: &[LocalOffset]) -> Result<Self, OffsetTableError> {
        let set_id = set.set_id;
        let mut entries = BTreeMap::new();

        for lo in offsets {
            let (sensor, reference) = (lo.sensor, lo.reference);
            if !set.contains(sensor) {
                return Err(OffsetTableError::UnknownSensor { set: set_id, sensor });
            }
            if sensor == reference {
                return Err(OffsetTableError::SelfReference {
                    set: set_id,
                    sensor,
                    value: lo.value,
                });
            }
            if !set.is_reference(reference) {
                return Err(OffsetTableError::NotAReference {
                    set: set_id,
                    sensor,
                    reference,
                });
            }
            if !lo.value.is_finite() {
                return Err(OffsetTableError::InvalidValue {
                    set: set_id,
                    sensor,
                    reference,
                    value: lo.value,
                });
            }
            if !lo.error.is_finite() || lo.error < 0.0 {
                return Err(OffsetTableError::InvalidError {
                    set: set_id,
                    sensor,
                    reference,
                    error: lo.error,
                });
            }
            if entries.insert((sensor, reference), lo.offset()).is_some() {
                return Err(OffsetTableError::Duplicate {
                    set: set_id,
                    sensor,
                    reference,
                });
            }
        }

        Ok(Self { set_id, entries })
    }

    pub fn set_id(&self) -> SetId {
        self.set_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offset of `sensor` against `reference`.
    ///
    /// A sensor is exactly `0 ± 0` against itself; any other pair must have
    /// been measured.
    pub fn against(&self, sensor: SensorId, reference: SensorId) -> Option<Offset> {
        if sensor == reference {
            return Some(Offset::ZERO);
        }
        self.entries.get(&(sensor, reference)).copied()
    }

    /// Measured entries only, in `(sensor, reference)` order.
    pub fn iter(&self) -> impl Iterator<Item = LocalOffset> + '_ {
        self.entries
            .iter()
            .map(|(&(sensor, reference), o)| LocalOffset {
                sensor,
                reference,
                value: o.value,
                error: o.error,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> CalibrationSet {
        CalibrationSet::new(1, 1, [1u64, 2, 3])
            .with_raised([2u64])
            .with_references([3u64])
    }

    #[test]
    fn then_adds_values_and_errors_in_quadrature() {
        let total = Offset::new(0.2, 0.03).then(Offset::new(-0.5, 0.04));
        assert!((total.value + 0.3).abs() < 1e-12);
        assert!((total.error - 0.05).abs() < 1e-12);
    }

    #[test]
    fn relative_to_is_a_base_change() {
        let s_ref = Offset::new(0.5, 0.1);
        let p_ref = Offset::new(0.3, 0.05);
        let s_p = s_ref.relative_to(p_ref);
        assert!((s_p.value - 0.2).abs() < 1e-12);
        assert!((s_p.then(p_ref).value - s_ref.value).abs() < 1e-12);
    }

    #[test]
    fn reference_is_implicitly_zero_against_itself() {
        let table = LocalOffsetTable::new(&set(), &[LocalOffset::new(1u64, 3u64, 0.5, 0.1)]).unwrap();
        assert_eq!(table.against(SensorId(3), SensorId(3)), Some(Offset::ZERO));
        assert_eq!(table.against(SensorId(1), SensorId(3)), Some(Offset::new(0.5, 0.1)));
        assert_eq!(table.against(SensorId(2), SensorId(3)), None);
    }

    #[test]
    fn explicit_self_offset_is_rejected() {
        let err = LocalOffsetTable::new(&set(), &[LocalOffset::new(3u64, 3u64, 0.0, 0.0)]).unwrap_err();
        assert!(matches!(err, OffsetTableError::SelfReference { .. }));
    }

    #[test]
    fn negative_error_is_rejected() {
        let err = LocalOffsetTable::new(&set(), &[LocalOffset::new(1u64, 3u64, 0.5, -0.1)]).unwrap_err();
        assert!(matches!(err, OffsetTableError::InvalidError { .. }));
    }

    #[test]
    fn unknown_reference_and_duplicates_are_rejected() {
        let err = LocalOffsetTable::new(&set(), &[LocalOffset::new(1u64, 2u64, 0.5, 0.1)]).unwrap_err();
        assert!(matches!(err, OffsetTableError::NotAReference { .. }));

        let lo = LocalOffset::new(1u64, 3u64, 0.5, 0.1);
        let err = LocalOffsetTable::new(&set(), &[lo, lo]).unwrap_err();
        assert!(matches!(err, OffsetTableError::Duplicate { .. }));
    }
}
