//! Per-path breakdown of computed constants.

use rtd_calib_core::{Real, SensorId, SetId};
use rtd_calib_network::{
    BrokenChainError, CalibrationNetwork, CalibrationResult, ComposedChain, HopKind,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopDetail {
    pub set_id: SetId,
    pub from: SensorId,
    pub to: SensorId,
    pub offset: Real,
    pub error: Real,
    pub kind: HopKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainDetail {
    pub hops: Vec<HopDetail>,
    pub total_offset: Real,
    pub total_error: Real,
    /// Normalised inverse-variance weight in the final constant.
    pub weight: Real,
}

impl ChainDetail {
    fn from_chain(chain: &ComposedChain, weight: Real) -> Self {
        Self {
            hops: chain
                .hops
                .iter()
                .map(|h| HopDetail {
                    set_id: h.set_id,
                    from: h.sensor,
                    to: h.pivot,
                    offset: h.offset.value,
                    error: h.offset.error,
                    kind: h.kind,
                })
                .collect(),
            total_offset: chain.total.value,
            total_error: chain.total.error,
            weight,
        }
    }
}

/// Every chain behind one computed constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorPathDetails {
    pub sensor_id: SensorId,
    pub origin_set_id: SetId,
    pub final_offset: Real,
    pub final_error: Real,
    pub chains: Vec<ChainDetail>,
    /// Index into `chains` of the lowest-error chain. Informational only; the
    /// weighted constant stays authoritative.
    pub best_chain: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub broken: Vec<BrokenChainError>,
}

impl SensorPathDetails {
    pub fn best(&self) -> Option<&ChainDetail> {
        self.chains.get(self.best_chain?)
    }
}

/// Details for one result; `None` unless it was computed.
pub fn sensor_path_details(
    network: &CalibrationNetwork,
    result: &CalibrationResult,
) -> Option<SensorPathDetails> {
    let constant = result.constant()?;
    let (chains, broken) = network.chains_for(result.sensor_id, result.origin_set_id);

    let totals: Vec<_> = chains.iter().map(|c| c.total).collect();
    let weights = network.combiner().normalized_weights(&totals);
    let best_chain = totals
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.error.total_cmp(&b.error))
        .map(|(i, _)| i);

    Some(SensorPathDetails {
        sensor_id: result.sensor_id,
        origin_set_id: result.origin_set_id,
        final_offset: constant.value,
        final_error: constant.error,
        chains: chains
            .iter()
            .zip(weights)
            .map(|(c, w)| ChainDetail::from_chain(c, w))
            .collect(),
        best_chain,
        broken,
    })
}

/// Details for every computed result, in result order.
pub fn path_details(network: &CalibrationNetwork) -> Vec<SensorPathDetails> {
    network
        .all_results()
        .iter()
        .filter_map(|r| sensor_path_details(network, r))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtd_calib_core::{CalibrationSet, Campaign, LocalOffset};
    use rtd_calib_network::NetworkConfig;

    fn network() -> CalibrationNetwork {
        let campaign = Campaign::new()
            .with_set(
                CalibrationSet::new(1, 1, [1u64, 2, 5, 3])
                    .with_raised([2u64, 5])
                    .with_references([3u64]),
                vec![
                    LocalOffset::new(1u64, 3u64, 0.50, 0.01),
                    LocalOffset::new(2u64, 3u64, 0.30, 0.01),
                    LocalOffset::new(5u64, 3u64, 0.10, 0.05),
                ],
            )
            .with_set(
                CalibrationSet::new(2, 2, [2u64, 5, 4]).with_references([4u64]),
                vec![
                    LocalOffset::new(2u64, 4u64, 0.20, 0.01),
                    LocalOffset::new(5u64, 4u64, 0.00, 0.01),
                ],
            );
        CalibrationNetwork::build(&campaign, &NetworkConfig::default()).unwrap()
    }

    #[test]
    fn weights_sum_to_one_and_best_chain_has_lowest_error() {
        let net = network();
        let result = net.constants_for(SensorId(1)).unwrap();
        let details = sensor_path_details(&net, result).unwrap();

        assert_eq!(details.chains.len(), 2);
        let total: Real = details.chains.iter().map(|c| c.weight).sum();
        assert!((total - 1.0).abs() < 1e-12);

        // The chain through sensor 2 avoids the noisy 5 -> 3 measurement.
        assert_eq!(details.best_chain, Some(0));
        let best = details.best().unwrap();
        assert_eq!(best.hops[0].to, SensorId(2));
        assert!(details.chains[0].weight > details.chains[1].weight);

        let weighted: Real = details
            .chains
            .iter()
            .map(|c| c.weight * c.total_offset)
            .sum();
        assert!((weighted - details.final_offset).abs() < 1e-9);
    }

    #[test]
    fn every_computed_result_gets_details() {
        let net = network();
        let details = path_details(&net);
        let computed = net.all_results().iter().filter(|r| r.is_computed()).count();
        assert_eq!(details.len(), computed);
    }
}
