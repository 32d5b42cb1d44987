//! Inverse-variance combination of independent chain estimates.

use rtd_calib_core::{Offset, Real};
use serde::{Deserialize, Serialize};

use crate::Combiner;

/// Regulariser added to every variance so exact chains keep a finite weight.
pub const DEFAULT_EPSILON: Real = 1e-10;

/// `w_i = 1 / (e_i² + ε)`, `value = Σ w_i x_i / Σ w_i`, `error = 1 / √Σ w_i`.
///
/// A single chain is passed through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InverseVarianceCombiner {
    pub epsilon: Real,
}

impl Default for InverseVarianceCombiner {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl InverseVarianceCombiner {
    pub fn new(epsilon: Real) -> Self {
        Self { epsilon }
    }

    pub fn weight(&self, chain: &Offset) -> Real {
        1.0 / (chain.variance() + self.epsilon)
    }

    /// Weights normalised to sum to one, in input order.
    pub fn normalized_weights(&self, chains: &[Offset]) -> Vec<Real> {
        let raw: Vec<Real> = chains.iter().map(|c| self.weight(c)).collect();
        let total: Real = raw.iter().sum();
        raw.into_iter().map(|w| w / total).collect()
    }
}

impl Combiner for InverseVarianceCombiner {
    fn combine(&self, chains: &[Offset]) -> Option<Offset> {
        match chains {
            [] => None,
            [single] => Some(*single),
            _ => {
                let (sum_w, sum_wx) = chains.iter().fold((0.0, 0.0), |(sw, swx), c| {
                    let w = self.weight(c);
                    (sw + w, swx + w * c.value)
                });
                Some(Offset::new(sum_wx / sum_w, 1.0 / sum_w.sqrt()))
            }
        }
    }
}
