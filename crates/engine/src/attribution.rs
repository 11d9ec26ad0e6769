use std::collections::{BTreeMap, BTreeSet};

use crate::cluster::Cluster;
use crate::ledger::ReconResult;

/// Where expected per-order costs come from. The backing data (order
/// exports, a maintained sheet, …) is a collaborator concern; unknown
/// orders cost 0.
pub trait ExpectedCostLookup {
    fn expected_cost(&self, order_id: &str) -> f64;
}

impl ExpectedCostLookup for BTreeMap<String, f64> {
    fn expected_cost(&self, order_id: &str) -> f64 {
        self.get(order_id).copied().unwrap_or(0.0)
    }
}

/// Set every cluster's expected cost to the sum of the expected costs
/// of its orders. A pure fold; orders nobody knows contribute zero.
pub fn fill_expected_costs(clusters: &mut [Cluster], lookup: &dyn ExpectedCostLookup) {
    for cluster in clusters.iter_mut() {
        cluster.expected_cost = cluster
            .orders
            .iter()
            .map(|order| lookup.expected_cost(order))
            .sum();
    }
}

/// Fold a run's reconciliation result into the clusters: a ledger entry
/// whose tracking set touches a cluster adds its cost to that cluster's
/// tracked cost, and trackings no ledger key covers are flagged as
/// non-reimbursed.
///
/// The ledger is rebuilt from full upstream reports every run, so both
/// fields are recomputed rather than accumulated, and only for
/// clusters whose group is in `fetched_groups`, so a group with no
/// automated cost source never has its trackings flagged.
pub fn apply_tracked_costs(
    clusters: &mut [Cluster],
    result: &ReconResult,
    fetched_groups: &BTreeSet<String>,
) {
    for cluster in clusters.iter_mut() {
        if !cluster_group_fetched(cluster, fetched_groups) {
            continue;
        }

        let mut tracked = 0.0;
        let mut covered: BTreeSet<&str> = BTreeSet::new();
        for (key, entry) in result.ledger.iter() {
            if key
                .trackings()
                .iter()
                .any(|t| cluster.trackings.contains(t))
            {
                tracked += entry.cost;
                covered.extend(key.trackings().iter().map(String::as_str));
            }
        }

        cluster.tracked_cost = tracked;
        cluster.non_reimbursed_trackings = cluster
            .trackings
            .iter()
            .filter(|t| !covered.contains(t.as_str()))
            .cloned()
            .collect();
    }
}

/// Merged clusters carry comma-joined group labels; the cluster counts
/// as fetched if any of its labels was.
fn cluster_group_fetched(cluster: &Cluster, fetched_groups: &BTreeSet<String>) -> bool {
    cluster
        .group
        .split(',')
        .any(|label| fetched_groups.contains(label.trim()))
}
