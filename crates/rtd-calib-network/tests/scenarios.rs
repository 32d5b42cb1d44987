//! Hand-built campaigns with known outcomes.

use rtd_calib_core::{CalibrationSet, Campaign, LocalOffset, SensorId, SetId};
use rtd_calib_network::{
    CalibrationNetwork, CalibrationStatus, ConfigurationError, Diagnostic, GapCause,
    NetworkConfig, UnreachableReason,
};

fn net(campaign: &Campaign) -> CalibrationNetwork {
    CalibrationNetwork::build(campaign, &NetworkConfig::default()).unwrap()
}

fn abc(b: CalibrationSet, b_offsets: Vec<LocalOffset>) -> Campaign {
    Campaign::new()
        .with_set(
            CalibrationSet::new(1, 1, [1u64, 2, 3])
                .with_raised([2u64])
                .with_references([3u64]),
            vec![
                LocalOffset::new(1u64, 3u64, 0.5, 0.1),
                LocalOffset::new(2u64, 3u64, 0.3, 0.05),
            ],
        )
        .with_set(b, b_offsets)
        .with_set(CalibrationSet::new(3, 3, [4u64]).with_references([4u64]), vec![])
}

#[test]
fn pivot_as_reference_cancels_by_base_change() {
    // B is measured against the pivot 2, so the hop 2 -> 4 is -offset(4 -> 2)
    // and (0.5 - 0.3) - 0.2 leaves exactly zero.
    let campaign = abc(
        CalibrationSet::new(2, 2, [2u64, 4])
            .with_raised([4u64])
            .with_references([2u64]),
        vec![LocalOffset::new(4u64, 2u64, 0.2, 0.02)],
    );
    let net = net(&campaign);
    let r = net.constants_for(SensorId(1)).unwrap();

    let expected_error = (0.1f64.powi(2) + 0.05f64.powi(2) + 0.02f64.powi(2)).sqrt();
    assert_eq!(r.status, CalibrationStatus::Computed);
    assert_eq!(r.path_count, 1);
    assert_eq!(r.origin_round, 1);
    assert!(r.final_offset.unwrap().abs() < 1e-12);
    assert!((r.final_error.unwrap() - expected_error).abs() < 1e-12);
}

#[test]
fn three_round_chain_with_raised_sensor_as_reference() {
    let campaign = abc(
        CalibrationSet::new(2, 2, [2u64, 4])
            .with_raised([4u64])
            .with_references([4u64]),
        vec![LocalOffset::new(2u64, 4u64, 0.2, 0.02)],
    );
    let net = net(&campaign);
    let r = net.constants_for(SensorId(1)).unwrap();

    assert_eq!(r.path_count, 1);
    assert_eq!(r.chains_used, 1);
    assert!((r.final_offset.unwrap() - 0.4).abs() < 1e-12);
    assert!((r.final_error.unwrap() - 0.113_578).abs() < 1e-6);

    let (chains, broken) = net.chains_for(SensorId(1), SetId(1));
    assert!(broken.is_empty());
    assert_eq!(chains.len(), 1);
    let sets: Vec<_> = chains[0].path.sets().collect();
    assert_eq!(sets, vec![SetId(1), SetId(2), SetId(3)]);
    assert!(chains[0].hops[2].is_identity());
}

#[test]
fn absolute_reference_is_exact_zero() {
    let campaign = abc(
        CalibrationSet::new(2, 2, [2u64, 4])
            .with_raised([4u64])
            .with_references([4u64]),
        vec![LocalOffset::new(2u64, 4u64, 0.2, 0.02)],
    );
    let net = net(&campaign);
    let anchor = net.result_in(SensorId(4), SetId(3)).unwrap();
    assert_eq!(anchor.status, CalibrationStatus::Computed);
    assert_eq!(anchor.final_offset, Some(0.0));
    assert_eq!(anchor.final_error, Some(0.0));
    assert_eq!(anchor.path_count, 1);
}

fn fan_out() -> Campaign {
    // Two raised sensors in the base set give two independent chains.
    Campaign::new()
        .with_set(
            CalibrationSet::new(1, 1, [1u64, 2, 5, 3])
                .with_raised([2u64, 5])
                .with_references([3u64]),
            vec![
                LocalOffset::new(1u64, 3u64, 0.50, 0.01),
                LocalOffset::new(2u64, 3u64, 0.30, 0.01),
                LocalOffset::new(5u64, 3u64, 0.10, 0.01),
            ],
        )
        .with_set(
            CalibrationSet::new(2, 2, [2u64, 5, 4]).with_references([4u64]),
            vec![
                LocalOffset::new(2u64, 4u64, 0.20, 0.01),
                LocalOffset::new(5u64, 4u64, 0.00, 0.01),
            ],
        )
}

#[test]
fn independent_chains_reduce_the_error() {
    let net = net(&fan_out());
    let r = net.constants_for(SensorId(1)).unwrap();
    assert_eq!(r.path_count, 2);
    assert_eq!(r.chains_used, 2);
    // Both chains agree on 0.4.
    assert!((r.final_offset.unwrap() - 0.4).abs() < 1e-9);

    let (chains, _) = net.chains_for(SensorId(1), SetId(1));
    let best = chains
        .iter()
        .map(|c| c.total.error)
        .fold(f64::INFINITY, f64::min);
    assert!(r.final_error.unwrap() < best);
}

#[test]
fn discarded_sensor_is_never_computed() {
    let mut campaign = fan_out();
    campaign.sets[0].set.discarded.push(SensorId(1));
    let net = net(&campaign);
    let r = net.constants_for(SensorId(1)).unwrap();
    assert_eq!(r.status, CalibrationStatus::Discarded);
    assert!(r.final_offset.is_none());
}

#[test]
fn missing_measurement_breaks_every_chain() {
    let mut campaign = fan_out();
    campaign.sets[0].set.members.push(SensorId(6));
    let net = net(&campaign);

    let r = net.constants_for(SensorId(6)).unwrap();
    assert_eq!(r.status, CalibrationStatus::Unreachable);
    assert_eq!(r.reason, Some(UnreachableReason::AllChainsBroken));
    assert_eq!(r.path_count, 2);
    assert_eq!(r.final_offset, None);

    assert!(net.diagnostics().iter().any(|d| matches!(
        d,
        Diagnostic::DerivationGap(g) if g.sensor == SensorId(6)
    )));
    assert!(net.diagnostics().iter().any(|d| matches!(
        d,
        Diagnostic::BrokenChain(b) if b.sensor == SensorId(6)
    )));
}

fn two_branches() -> Campaign {
    Campaign::new()
        .with_set(
            CalibrationSet::new(1, 1, [1u64, 2])
                .with_raised([2u64])
                .with_references([1u64]),
            vec![LocalOffset::new(2u64, 1u64, 0.1, 0.01)],
        )
        .with_set(
            CalibrationSet::new(2, 1, [11u64, 12])
                .with_raised([12u64])
                .with_references([11u64]),
            vec![LocalOffset::new(12u64, 11u64, 0.1, 0.01)],
        )
        .with_set(
            CalibrationSet::new(10, 2, [2u64, 20])
                .with_raised([20u64])
                .with_references([20u64]),
            vec![LocalOffset::new(2u64, 20u64, 0.1, 0.01)],
        )
        .with_set(
            CalibrationSet::new(11, 2, [12u64, 21])
                .with_raised([21u64])
                .with_references([21u64]),
            vec![LocalOffset::new(12u64, 21u64, 0.1, 0.01)],
        )
        .with_set(
            CalibrationSet::new(20, 3, [20u64, 21, 30]).with_references([30u64]),
            vec![
                LocalOffset::new(20u64, 30u64, 0.1, 0.01),
                LocalOffset::new(21u64, 30u64, 0.1, 0.01),
            ],
        )
}

#[test]
fn removing_a_parent_link_makes_the_branch_unreachable() {
    let mut campaign = two_branches();
    let terminal = &mut campaign.sets[4];
    terminal.set.members.retain(|s| *s != SensorId(21));
    terminal.offsets.retain(|o| o.sensor != SensorId(21));

    let net = net(&campaign);
    assert!(net.diagnostics().iter().any(|d| matches!(
        d,
        Diagnostic::OrphanSet(o) if o.set_id == SetId(11)
    )));

    for sensor in [11u64, 12] {
        let r = net.constants_for(SensorId(sensor)).unwrap();
        assert_eq!(r.status, CalibrationStatus::Unreachable, "sensor {sensor}");
        assert_eq!(r.reason, Some(UnreachableReason::NoPath));
        assert_eq!(r.final_offset, None);
    }
    for sensor in [1u64, 2] {
        assert!(net.constants_for(SensorId(sensor)).unwrap().is_computed());
    }
}

#[test]
fn too_many_paths_are_reported_not_enumerated() {
    let mut campaign = Campaign::new().with_set(
        CalibrationSet::new(1, 1, [1u64, 2, 3, 4])
            .with_raised([2u64, 3, 4])
            .with_references([1u64]),
        [2u64, 3, 4]
            .iter()
            .map(|&s| LocalOffset::new(s, 1u64, 0.1, 0.01))
            .collect(),
    );
    campaign.push(
        CalibrationSet::new(2, 2, [2u64, 3, 4, 10]).with_references([10u64]),
        [2u64, 3, 4]
            .iter()
            .map(|&s| LocalOffset::new(s, 10u64, 0.1, 0.01))
            .collect(),
    );
    let config = NetworkConfig {
        max_paths_per_sensor: 2,
        ..Default::default()
    };
    let net = CalibrationNetwork::build(&campaign, &config).unwrap();

    let r = net.constants_for(SensorId(1)).unwrap();
    assert_eq!(r.status, CalibrationStatus::Unreachable);
    assert_eq!(r.reason, Some(UnreachableReason::PathExplosion));
    assert!(net
        .diagnostics()
        .iter()
        .any(|d| matches!(d, Diagnostic::PathExplosion(p) if p.limit == 2)));

    // Members of the terminal set only have one path.
    assert!(net.result_in(SensorId(2), SetId(2)).unwrap().is_computed());
}

#[test]
fn structural_errors_abort_the_build() {
    let mut campaign = two_branches();
    campaign.sets[1].set.raised.clear();
    let err = CalibrationNetwork::build(&campaign, &NetworkConfig::default()).unwrap_err();
    assert!(matches!(err, ConfigurationError::NoRaisedSensors { .. }));

    // Raised sensor 2 would enter two round-2 sets.
    let mut campaign = two_branches();
    campaign.sets[3].set.members.push(SensorId(2));
    let err = CalibrationNetwork::build(&campaign, &NetworkConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::AmbiguousParent { sensor, round: 2, .. } if sensor == SensorId(2)
    ));

    let mut campaign = two_branches();
    campaign.sets[0]
        .offsets
        .push(LocalOffset::new(1u64, 1u64, 0.0, 0.0));
    let err = CalibrationNetwork::build(&campaign, &NetworkConfig::default()).unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidOffsets(_)));
}

#[test]
fn lowest_round_result_is_the_constant() {
    let net = net(&two_branches());
    let results: Vec<_> = net.results_for(SensorId(20)).collect();
    assert_eq!(results.len(), 2);
    assert_eq!(net.constants_for(SensorId(20)).unwrap().origin_round, 2);
    assert_eq!(net.reference_set(), SetId(20));
}

fn shared_reference() -> Campaign {
    // Both base sets are measured against probe 100.
    Campaign::new()
        .with_set(
            CalibrationSet::new(1, 1, [100u64, 1, 2])
                .with_raised([2u64])
                .with_references([100u64]),
            vec![
                LocalOffset::new(1u64, 100u64, 0.5, 0.01),
                LocalOffset::new(2u64, 100u64, 0.2, 0.01),
            ],
        )
        .with_set(
            CalibrationSet::new(2, 1, [100u64, 11, 12])
                .with_raised([12u64])
                .with_references([100u64]),
            vec![
                LocalOffset::new(11u64, 100u64, 0.4, 0.01),
                LocalOffset::new(12u64, 100u64, 0.1, 0.01),
            ],
        )
        .with_set(
            CalibrationSet::new(3, 2, [2u64, 12, 200]).with_references([200u64]),
            vec![
                LocalOffset::new(2u64, 200u64, 0.3, 0.01),
                LocalOffset::new(12u64, 200u64, 0.05, 0.01),
            ],
        )
}

#[test]
fn reference_probe_shared_between_sets() {
    let net = net(&shared_reference());

    let s1 = net.constants_for(SensorId(1)).unwrap();
    assert!((s1.final_offset.unwrap() - 0.6).abs() < 1e-12);
    let s11 = net.constants_for(SensorId(11)).unwrap();
    assert!((s11.final_offset.unwrap() - 0.35).abs() < 1e-12);

    // The probe gets one constant per set it served in.
    let probe: Vec<_> = net.results_for(SensorId(100)).collect();
    assert_eq!(probe.len(), 2);
    assert!(probe.iter().all(|r| r.is_computed()));
    assert!((probe[0].final_offset.unwrap() - 0.1).abs() < 1e-12);
    assert!((probe[1].final_offset.unwrap() + 0.05).abs() < 1e-12);
    assert_eq!(net.constants_for(SensorId(100)).unwrap().origin_set_id, SetId(1));
}

#[test]
fn raised_sensor_discarded_upstream_is_a_gap() {
    let mut campaign = shared_reference();
    campaign.sets[2].set.discarded.push(SensorId(2));
    let net = net(&campaign);

    let r = net.constants_for(SensorId(1)).unwrap();
    assert_eq!(r.status, CalibrationStatus::Unreachable);
    assert_eq!(r.reason, Some(UnreachableReason::AllChainsBroken));
    assert!(net.diagnostics().iter().any(|d| matches!(
        d,
        Diagnostic::DerivationGap(g)
            if g.set_id == SetId(3)
                && g.sensor == SensorId(2)
                && g.cause == GapCause::DiscardedInSet
    )));

    // The other branch is untouched.
    assert!(net.constants_for(SensorId(11)).unwrap().is_computed());
}
