//! Tiered campaign layouts with known sensor biases.
//!
//! Round 1 holds `base_sets` sets of fresh sensors. Each following round
//! groups `children_per_parent` sets of the previous round into one set whose
//! members are exactly the raised sensors of those children. The construction
//! stops when a round contains a single set, which becomes the terminal set.

use anyhow::{ensure, Result};
use std::collections::BTreeMap;

use super::noise::{unit_for, UniformOffsetNoise};
use crate::{Campaign, CalibrationSet, LocalOffset, Real, SensorId, SetId};

const BIAS_STREAM: u64 = 0x5EED_B1A5_0000_0001;

/// Shape and measurement model of a synthetic campaign.
#[derive(Debug, Clone)]
pub struct TieredLayout {
    /// Number of round-1 sets.
    pub base_sets: usize,
    /// Members per round-1 set.
    pub set_size: usize,
    /// Raised sensors per non-terminal set (taken from the end of the member list).
    pub raised_per_set: usize,
    /// Number of child sets merged into one parent set.
    pub children_per_parent: usize,
    /// Local references per set (taken from the start of the member list).
    pub references_per_set: usize,
    /// Id of the first generated sensor; subsequent ids are consecutive.
    pub first_sensor_id: u64,
    /// Id of the first generated set; subsequent ids are consecutive.
    pub first_set_id: u32,
    /// True sensor biases are uniform in `[-bias_range, +bias_range]`.
    pub bias_range: Real,
    /// Error reported for every local offset.
    pub measurement_error: Real,
    /// Noise added to every local offset value.
    pub noise: UniformOffsetNoise,
}

impl Default for TieredLayout {
    fn default() -> Self {
        Self {
            base_sets: 4,
            set_size: 12,
            raised_per_set: 2,
            children_per_parent: 2,
            references_per_set: 2,
            first_sensor_id: 48_000,
            first_set_id: 1,
            bias_range: 0.5,
            measurement_error: 0.002,
            noise: UniformOffsetNoise {
                seed: 7,
                max_abs: 0.0,
            },
        }
    }
}

/// A generated campaign with its ground truth.
#[derive(Debug, Clone)]
pub struct SyntheticCampaign {
    pub campaign: Campaign,
    /// True bias of every generated sensor (kelvin).
    pub true_bias: BTreeMap<SensorId, Real>,
    pub terminal_set: SetId,
    pub anchor: SensorId,
}

impl SyntheticCampaign {
    /// Noise-free calibration constant of `sensor` relative to the anchor.
    pub fn expected_constant(&self, sensor: SensorId) -> Option<Real> {
        let bias = self.true_bias.get(&sensor)?;
        let anchor = self.true_bias.get(&self.anchor)?;
        Some(bias - anchor)
    }
}

/// Generate a tiered campaign from `layout`.
pub fn tiered_campaign(layout: &TieredLayout) -> Result<SyntheticCampaign> {
    ensure!(layout.base_sets >= 1, "need at least one base set");
    ensure!(layout.set_size >= 2, "sets need at least 2 members, got {}", layout.set_size);
    ensure!(
        layout.raised_per_set >= 1 && layout.raised_per_set <= layout.set_size,
        "raised_per_set must be in 1..={}, got {}",
        layout.set_size,
        layout.raised_per_set
    );
    ensure!(
        layout.base_sets == 1 || layout.children_per_parent >= 2,
        "children_per_parent must be >= 2 to converge on a single terminal set"
    );
    ensure!(layout.references_per_set >= 1, "need at least one reference per set");
    ensure!(
        layout.measurement_error >= 0.0,
        "measurement_error must be non-negative"
    );

    let mut next_sensor = layout.first_sensor_id;
    let mut level: Vec<Vec<SensorId>> = (0..layout.base_sets)
        .map(|_| {
            (0..layout.set_size)
                .map(|_| {
                    let id = SensorId(next_sensor);
                    next_sensor += 1;
                    id
                })
                .collect()
        })
        .collect();

    let true_bias: BTreeMap<SensorId, Real> = (layout.first_sensor_id..next_sensor)
        .map(|raw| {
            let u = unit_for(layout.noise.seed ^ BIAS_STREAM, raw, 0);
            (SensorId(raw), (u - 0.5) * 2.0 * layout.bias_range)
        })
        .collect();

    let mut campaign = Campaign::new();
    let mut next_set = layout.first_set_id;
    let mut round = 1u32;

    loop {
        let terminal = level.len() == 1;
        let mut parents_members = Vec::new();

        for chunk in level.chunks(layout.children_per_parent.max(1)) {
            let mut merged = Vec::new();
            for members in chunk {
                let set_id = SetId(next_set);
                next_set += 1;

                let n_refs = layout.references_per_set.min(members.len());
                let mut set = CalibrationSet::new(set_id, round, members.iter().copied())
                    .with_references(members[..n_refs].iter().copied());
                if !terminal {
                    let n_raised = layout.raised_per_set.min(members.len());
                    let raised = &members[members.len() - n_raised..];
                    set = set.with_raised(raised.iter().copied());
                    merged.extend_from_slice(raised);
                }

                let offsets = measure(&set, &true_bias, layout);
                campaign.push(set, offsets);
            }
            parents_members.push(merged);
        }

        if terminal {
            let last = &campaign.sets[campaign.sets.len() - 1].set;
            let terminal_set = last.set_id;
            let anchor = last.references[0];
            return Ok(SyntheticCampaign {
                campaign,
                true_bias,
                terminal_set,
                anchor,
            });
        }

        level = parents_members;
        round += 1;
    }
}

fn measure(
    set: &CalibrationSet,
    true_bias: &BTreeMap<SensorId, Real>,
    layout: &TieredLayout,
) -> Vec<LocalOffset> {
    let mut offsets = Vec::new();
    for &reference in &set.references {
        for &sensor in &set.members {
            if sensor == reference {
                continue;
            }
            let truth = true_bias[&sensor] - true_bias[&reference];
            let value = layout.noise.apply(set.set_id, sensor, reference, truth);
            offsets.push(LocalOffset::new(
                sensor,
                reference,
                value,
                layout.measurement_error,
            ));
        }
    }
    offsets
}
