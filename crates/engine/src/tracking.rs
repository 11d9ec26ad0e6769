use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A single shipment observed upstream (mail scrape, manual CSV, …).
///
/// Immutable input record. One tracking may cover several orders when a
/// seller ships them together. Dates are ISO-ish strings compared
/// lexicographically; `"0"` is the "unknown / earliest" sentinel so a
/// real date always wins a `max` comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tracking {
    pub tracking_number: String,
    pub group: String,
    pub order_ids: BTreeSet<String>,
    pub ship_date: String,
    pub delivery_date: String,
    pub to_email: String,
}

impl Tracking {
    pub fn new(
        tracking_number: impl Into<String>,
        group: impl Into<String>,
        order_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            tracking_number: tracking_number.into(),
            group: group.into(),
            order_ids: order_ids.into_iter().collect(),
            ship_date: "0".to_string(),
            delivery_date: "0".to_string(),
            to_email: String::new(),
        }
    }
}
