use std::collections::HashMap;

use crate::cluster::Cluster;

/// Coalesce clusters that share a (purchase order, group) pair or an
/// email id, repeating whole passes until no pass shrinks the list.
///
/// A single pass is not enough: merging A into C can give C an email id
/// that B (already placed earlier in the same pass) also carries, and
/// that link only becomes visible on the next pass. Each pass strictly
/// reduces the count or stops, so at most (n − 1) passes run.
pub fn consolidate(mut clusters: Vec<Cluster>) -> Vec<Cluster> {
    loop {
        let before = clusters.len();
        clusters = merge_pass(clusters);
        if clusters.len() == before {
            return clusters;
        }
    }
}

/// One merge pass. Lookup tables are built fresh here and die here;
/// no merge state outlives the pass.
fn merge_pass(clusters: Vec<Cluster>) -> Vec<Cluster> {
    let mut result: Vec<Cluster> = Vec::with_capacity(clusters.len());
    let mut by_po_group: HashMap<(String, String), usize> = HashMap::new();
    let mut by_email: HashMap<String, usize> = HashMap::new();

    for cluster in clusters {
        match find_by_shared_attr(&cluster, &by_po_group, &by_email) {
            Some(idx) => {
                result[idx].merge_with(cluster);
                fill_lookup_maps(&result[idx], idx, &mut by_po_group, &mut by_email);
            }
            None => {
                let idx = result.len();
                fill_lookup_maps(&cluster, idx, &mut by_po_group, &mut by_email);
                result.push(cluster);
            }
        }
    }
    result
}

/// The documented tie-break: purchase-order/group matches are checked
/// before email matches, and within each the first key in (sorted) set
/// order wins. The ordering is load-bearing for reproducibility, not a
/// happenstance of map iteration.
fn find_by_shared_attr(
    cluster: &Cluster,
    by_po_group: &HashMap<(String, String), usize>,
    by_email: &HashMap<String, usize>,
) -> Option<usize> {
    for po in &cluster.purchase_orders {
        if let Some(&idx) = by_po_group.get(&(po.clone(), cluster.group.clone())) {
            return Some(idx);
        }
    }
    for email in &cluster.email_ids {
        if let Some(&idx) = by_email.get(email) {
            return Some(idx);
        }
    }
    None
}

fn fill_lookup_maps(
    cluster: &Cluster,
    idx: usize,
    by_po_group: &mut HashMap<(String, String), usize>,
    by_email: &mut HashMap<String, usize>,
) {
    for po in &cluster.purchase_orders {
        by_po_group.insert((po.clone(), cluster.group.clone()), idx);
    }
    for email in &cluster.email_ids {
        by_email.insert(email.clone(), idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(group: &str, orders: &[&str], pos: &[&str], emails: &[&str]) -> Cluster {
        let mut c = Cluster::new(group);
        c.orders = orders.iter().map(|s| s.to_string()).collect();
        c.purchase_orders = pos.iter().map(|s| s.to_string()).collect();
        c.email_ids = emails.iter().map(|s| s.to_string()).collect();
        c
    }

    #[test]
    fn shared_po_same_group_merges() {
        let result = consolidate(vec![
            cluster("g", &["O1"], &["P1"], &[]),
            cluster("g", &["O2"], &["P1"], &[]),
        ]);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].orders.len(), 2);
        assert!(result[0].orders.contains("O1"));
        assert!(result[0].orders.contains("O2"));
        assert_eq!(result[0].purchase_orders.len(), 1);
    }

    #[test]
    fn shared_po_different_group_does_not_merge() {
        let result = consolidate(vec![
            cluster("g1", &["O1"], &["P1"], &[]),
            cluster("g2", &["O2"], &["P1"], &[]),
        ]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn shared_email_merges_across_groups() {
        let result = consolidate(vec![
            cluster("g1", &["O1"], &[], &["msg1"]),
            cluster("g2", &["O2"], &[], &["msg1"]),
        ]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].group, "g1, g2");
    }

    #[test]
    fn unrelated_clusters_survive() {
        let result = consolidate(vec![
            cluster("g", &["O1"], &["P1"], &[]),
            cluster("g", &["O2"], &["P2"], &[]),
        ]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn transitive_link_needs_a_second_pass() {
        // B shares nothing with A until A absorbs C; the A+C merge
        // happens after B was already placed, so only the next pass
        // can fold B in.
        let a = cluster("g", &["O1"], &["P1"], &[]);
        let b = cluster("g", &["O2"], &[], &["msg-b"]);
        let c = cluster("g", &["O3"], &["P1"], &["msg-b"]);

        let result = consolidate(vec![a, b, c]);
        assert_eq!(result.len(), 1);
        assert!(result[0].orders.contains("O1"));
        assert!(result[0].orders.contains("O2"));
        assert!(result[0].orders.contains("O3"));
    }

    #[test]
    fn consolidate_is_idempotent() {
        let input = vec![
            cluster("g", &["O1"], &["P1"], &["m1"]),
            cluster("g", &["O2"], &["P1"], &[]),
            cluster("h", &["O3"], &["P9"], &["m1"]),
            cluster("g", &["O4"], &["P4"], &[]),
        ];
        let once = consolidate(input);
        let count = once.len();
        let orders_once: Vec<_> = once.iter().map(|c| c.orders.clone()).collect();

        let twice = consolidate(once);
        assert_eq!(twice.len(), count);
        let orders_twice: Vec<_> = twice.iter().map(|c| c.orders.clone()).collect();
        assert_eq!(orders_once, orders_twice);
    }

    #[test]
    fn po_match_wins_over_email_match() {
        // The current cluster shares a PO with the first representative
        // and an email with the second; the PO match must win.
        let a = cluster("g", &["O1"], &["P1"], &[]);
        let b = cluster("g", &["O2"], &[], &["m1"]);
        let c = cluster("g", &["O3"], &["P1"], &["m1"]);

        let result = consolidate(vec![a, b, c]);
        // c merges into a via P1, which hands a+c the email m1; the
        // next pass folds b into the same cluster.
        assert_eq!(result.len(), 1);
    }
}
