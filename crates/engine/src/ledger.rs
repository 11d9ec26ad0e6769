use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The ordered set of tracking numbers a single cost record covers.
///
/// Most sources report cost per tracking, but portal receipts report
/// one cost per shipment batch, so the key is one-or-more numbers in
/// report order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackingKey(Vec<String>);

impl TrackingKey {
    pub fn new(trackings: impl IntoIterator<Item = String>) -> Self {
        Self(trackings.into_iter().collect())
    }

    pub fn single(tracking: impl Into<String>) -> Self {
        Self(vec![tracking.into()])
    }

    pub fn trackings(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Accumulated cost for one tracking key: which source reported it,
/// how much in total, and the latest report date seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub group: String,
    pub cost: f64,
    pub date: String,
}

/// The canonical tracking-keyed cost map for one reconciliation run.
///
/// Accumulation is additive, never lossy: a key observed twice holds
/// the sum of both observations. Sources report partial payments and
/// multi-line cost rows, so replacing would silently drop money.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostLedger(BTreeMap<TrackingKey, LedgerEntry>);

// JSON map keys must be strings, and a `TrackingKey` serializes as an
// array, so the ledger serializes as a sequence of key/value pairs.
impl Serialize for CostLedger {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

impl<'de> Deserialize<'de> for CostLedger {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pairs: Vec<(TrackingKey, LedgerEntry)> = Vec::deserialize(deserializer)?;
        Ok(Self(pairs.into_iter().collect()))
    }
}

impl CostLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one cost observation. A void/unverified row should be
    /// added with `cost == 0.0` so the key still exists in the ledger.
    pub fn add(&mut self, key: TrackingKey, group: &str, cost: f64, date: &str) {
        let entry = self.0.entry(key).or_insert_with(|| LedgerEntry {
            group: group.to_string(),
            cost: 0.0,
            date: date.to_string(),
        });
        entry.cost += cost;
        entry.group = group.to_string();
        entry.date = date.to_string();
    }

    /// Map union with `other`; on key collision the later entry wins.
    /// Used to splice archived sub-group ledgers into a live one;
    /// key sets are disjoint across sub-groups in practice.
    pub fn merge(&mut self, other: CostLedger) {
        self.0.extend(other.0);
    }

    pub fn get(&self, key: &TrackingKey) -> Option<&LedgerEntry> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TrackingKey, &LedgerEntry)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What reconciling one group's cost reports produces: the
/// tracking-keyed ledger plus the purchase-order cost map kept as a
/// secondary source, independent of tracking keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconResult {
    pub ledger: CostLedger,
    pub po_costs: BTreeMap<String, f64>,
}

impl ReconResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate a cost against a purchase order, additively.
    pub fn add_po_cost(&mut self, po: &str, cost: f64) {
        *self.po_costs.entry(po.to_string()).or_insert(0.0) += cost;
    }

    /// Union both maps with `other`; later entries win on collision.
    pub fn merge(&mut self, other: ReconResult) {
        self.ledger.merge(other.ledger);
        self.po_costs.extend(other.po_costs);
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty() && self.po_costs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_accumulate() {
        let mut ledger = CostLedger::new();
        let key = TrackingKey::single("1Z999");
        ledger.add(key.clone(), "usa", 10.0, "2026-01-01");
        ledger.add(key.clone(), "usa", 15.0, "2026-01-02");

        let entry = ledger.get(&key).unwrap();
        assert_eq!(entry.cost, 25.0);
        assert_eq!(entry.date, "2026-01-02");
    }

    #[test]
    fn void_rows_record_a_zero_entry() {
        let mut ledger = CostLedger::new();
        let key = TrackingKey::single("1Z999");
        ledger.add(key.clone(), "usa", 0.0, "");

        let entry = ledger.get(&key).unwrap();
        assert_eq!(entry.cost, 0.0);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn batch_keys_are_distinct_from_single_keys() {
        let mut ledger = CostLedger::new();
        ledger.add(TrackingKey::single("1Z1"), "g", 5.0, "");
        ledger.add(
            TrackingKey::new(["1Z1".to_string(), "1Z2".to_string()]),
            "g",
            7.0,
            "",
        );

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get(&TrackingKey::single("1Z1")).unwrap().cost, 5.0);
    }

    #[test]
    fn merge_is_union_with_later_wins() {
        let mut a = CostLedger::new();
        a.add(TrackingKey::single("1Z1"), "g", 5.0, "");
        a.add(TrackingKey::single("1Z2"), "g", 6.0, "");

        let mut b = CostLedger::new();
        b.add(TrackingKey::single("1Z2"), "archive", 9.0, "");

        a.merge(b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.get(&TrackingKey::single("1Z2")).unwrap().cost, 9.0);
    }

    #[test]
    fn po_costs_accumulate() {
        let mut result = ReconResult::new();
        result.add_po_cost("PO-1", 100.0);
        result.add_po_cost("PO-1", 50.0);
        assert_eq!(result.po_costs["PO-1"], 150.0);
    }
}
