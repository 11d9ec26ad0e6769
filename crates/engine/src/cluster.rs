use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::tracking::Tracking;

fn zero_date() -> String {
    "0".to_string()
}

/// One consolidated real-world purchase: every order and tracking that
/// belongs to the same buy, plus the money reconciled against it.
///
/// Clusters are created on first sight of an unseen order, mutated on
/// every later run that touches them, and never deleted: a cluster's
/// presence in the store is the system's notion of "this purchase
/// exists". All set-valued fields are `BTreeSet` so iteration order
/// (and therefore merge tie-breaks) is reproducible across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Cluster {
    pub orders: BTreeSet<String>,
    pub trackings: BTreeSet<String>,
    pub group: String,
    pub expected_cost: f64,
    pub tracked_cost: f64,
    #[serde(default = "zero_date")]
    pub last_ship_date: String,
    #[serde(default = "zero_date")]
    pub last_delivery_date: String,
    pub purchase_orders: BTreeSet<String>,
    pub email_ids: BTreeSet<String>,
    pub adjustment: f64,
    pub to_email: String,
    pub notes: String,
    pub manual_override: bool,
    pub non_reimbursed_trackings: BTreeSet<String>,
    pub cancelled_items: Vec<String>,
}

impl Cluster {
    /// A fresh cluster for `group`. Every call allocates new empty
    /// containers; clusters never share storage.
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            last_ship_date: zero_date(),
            last_delivery_date: zero_date(),
            ..Self::default()
        }
    }

    /// Fold `other` into `self`.
    ///
    /// Membership sets union; costs and the manual adjustment sum;
    /// dates take the max; free-text fields concatenate. Any merge
    /// unconditionally drops manual override; merged membership is by
    /// definition changed membership.
    pub fn merge_with(&mut self, other: Cluster) {
        self.orders.extend(other.orders);
        self.trackings.extend(other.trackings);
        if self.group.trim() != other.group.trim() {
            self.group = format!("{}, {}", self.group, other.group.trim());
        }
        self.expected_cost += other.expected_cost;
        self.tracked_cost += other.tracked_cost;
        if other.last_ship_date > self.last_ship_date {
            self.last_ship_date = other.last_ship_date;
        }
        if other.last_delivery_date > self.last_delivery_date {
            self.last_delivery_date = other.last_delivery_date;
        }
        self.purchase_orders.extend(other.purchase_orders);
        self.email_ids.extend(other.email_ids);
        self.adjustment += other.adjustment;
        if !other.notes.is_empty() {
            if self.notes.is_empty() {
                self.notes = other.notes;
            } else {
                self.notes = format!("{}, {}", self.notes, other.notes);
            }
        }
        if self.manual_override || other.manual_override {
            eprintln!(
                "merged cluster {:?} manual override unset",
                self.orders
            );
            self.manual_override = false;
        }
        self.non_reimbursed_trackings
            .extend(other.non_reimbursed_trackings);
        self.cancelled_items.extend(other.cancelled_items);
    }
}

/// Assign newly observed trackings onto the existing cluster list,
/// creating clusters for orders nobody has claimed yet.
///
/// The order-id working map is rebuilt from scratch on every call by
/// scanning the existing clusters once, then kept current as trackings
/// land. A tracking whose order ids already span two clusters attaches
/// to the first match in order-id iteration order; reconciling such
/// splits is [`crate::merge::consolidate`]'s job, not assignment's.
pub fn update_clusters(all_clusters: &mut Vec<Cluster>, trackings: &[Tracking]) {
    let mut order_to_cluster: HashMap<String, usize> = HashMap::new();
    for (idx, cluster) in all_clusters.iter().enumerate() {
        for order in &cluster.orders {
            order_to_cluster.insert(order.clone(), idx);
        }
    }

    for tracking in trackings {
        if tracking.order_ids.is_empty() {
            eprintln!(
                "warning: tracking {} has no order ids, leaving it for manual reprocessing",
                tracking.tracking_number
            );
            continue;
        }

        let idx = match find_cluster(&order_to_cluster, tracking) {
            Some(idx) => idx,
            None => {
                all_clusters.push(Cluster::new(&tracking.group));
                all_clusters.len() - 1
            }
        };

        for order in &tracking.order_ids {
            order_to_cluster.insert(order.clone(), idx);
        }

        let cluster = &mut all_clusters[idx];
        let adds_membership = !tracking.order_ids.is_subset(&cluster.orders)
            || !cluster.trackings.contains(&tracking.tracking_number);
        if adds_membership && cluster.manual_override {
            eprintln!(
                "cluster {:?} manual override unset by newly added trackings or orders",
                cluster.orders
            );
        }
        if adds_membership {
            cluster.manual_override = false;
        }

        cluster.orders.extend(tracking.order_ids.iter().cloned());
        cluster.trackings.insert(tracking.tracking_number.clone());
        if tracking.ship_date > cluster.last_ship_date {
            cluster.last_ship_date = tracking.ship_date.clone();
        }
        if tracking.delivery_date > cluster.last_delivery_date {
            cluster.last_delivery_date = tracking.delivery_date.clone();
        }
        cluster.to_email = tracking.to_email.clone();
    }
}

fn find_cluster(order_to_cluster: &HashMap<String, usize>, tracking: &Tracking) -> Option<usize> {
    tracking
        .order_ids
        .iter()
        .find_map(|order| order_to_cluster.get(order).copied())
}
