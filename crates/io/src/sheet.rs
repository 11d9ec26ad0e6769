use std::collections::BTreeSet;
use std::io::{Read, Write};

use consigno_engine::Cluster;

use crate::error::IoError;

/// Export column order. Spreadsheet consumers key on these names, so
/// the order and spelling are fixed.
pub const SHEET_HEADER: [&str; 15] = [
    "Orders",
    "Trackings",
    "To Email",
    "Amount Billed",
    "Amount Reimbursed",
    "Non-Reimbursed Trackings",
    "Last Ship Date",
    "Last Delivery Date (Est.)",
    "POs",
    "Group",
    "Manual Cost Adjustment",
    "Manual Override",
    "Total Diff",
    "Notes",
    "Cancelled Items",
];

fn join_set(set: &BTreeSet<String>) -> String {
    set.iter().cloned().collect::<Vec<_>>().join(", ")
}

fn split_set(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Write `clusters` as a CSV sheet in the fixed column order.
///
/// Total Diff is derived at export time (billed minus reimbursed minus
/// the manual adjustment) and is never read back on import.
pub fn write_sheet<W: Write>(writer: W, clusters: &[Cluster]) -> Result<(), IoError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(SHEET_HEADER)
        .map_err(|e| IoError::Csv(e.to_string()))?;

    for cluster in clusters {
        let diff = cluster.expected_cost - cluster.tracked_cost - cluster.adjustment;
        out.write_record([
            join_set(&cluster.orders),
            join_set(&cluster.trackings),
            cluster.to_email.clone(),
            format!("{:.2}", cluster.expected_cost),
            format!("{:.2}", cluster.tracked_cost),
            join_set(&cluster.non_reimbursed_trackings),
            cluster.last_ship_date.clone(),
            cluster.last_delivery_date.clone(),
            join_set(&cluster.purchase_orders),
            cluster.group.clone(),
            format!("{:.2}", cluster.adjustment),
            if cluster.manual_override { "TRUE" } else { "FALSE" }.to_string(),
            format!("{:.2}", diff),
            cluster.notes.clone(),
            cluster.cancelled_items.join(", "),
        ])
        .map_err(|e| IoError::Csv(e.to_string()))?;
    }
    out.flush().map_err(|e| IoError::Csv(e.to_string()))
}

/// Read a cluster sheet back, tolerating hand-edited data.
///
/// Any subset of the known headers is accepted; missing columns take
/// their zero values (empty sets, 0.0, FALSE). Email ids are never on
/// the sheet and always come back empty. Total Diff is ignored.
pub fn read_sheet<R: Read>(reader: R) -> Result<Vec<Cluster>, IoError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| IoError::Csv(e.to_string()))?
        .clone();

    let col = |name: &str| headers.iter().position(|h| h.trim() == name);
    let idx_orders = col("Orders");
    let idx_trackings = col("Trackings");
    let idx_to_email = col("To Email");
    let idx_billed = col("Amount Billed");
    let idx_reimbursed = col("Amount Reimbursed");
    let idx_non_reimbursed = col("Non-Reimbursed Trackings");
    let idx_ship = col("Last Ship Date");
    let idx_delivery = col("Last Delivery Date (Est.)");
    let idx_pos = col("POs");
    let idx_group = col("Group");
    let idx_adjustment = col("Manual Cost Adjustment");
    let idx_override = col("Manual Override");
    let idx_notes = col("Notes");
    let idx_cancelled = col("Cancelled Items");

    let mut clusters = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| IoError::Csv(e.to_string()))?;
        let field = |idx: Option<usize>| -> &str {
            idx.and_then(|i| record.get(i)).unwrap_or("").trim()
        };
        let number = |idx: Option<usize>| -> f64 {
            let raw = field(idx);
            if raw.is_empty() {
                0.0
            } else {
                raw.parse().unwrap_or(0.0)
            }
        };

        let mut cluster = Cluster::new(field(idx_group));
        cluster.orders = split_set(field(idx_orders));
        cluster.trackings = split_set(field(idx_trackings));
        cluster.to_email = field(idx_to_email).to_string();
        cluster.expected_cost = number(idx_billed);
        cluster.tracked_cost = number(idx_reimbursed);
        cluster.non_reimbursed_trackings = split_set(field(idx_non_reimbursed));
        if !field(idx_ship).is_empty() {
            cluster.last_ship_date = field(idx_ship).to_string();
        }
        if !field(idx_delivery).is_empty() {
            cluster.last_delivery_date = field(idx_delivery).to_string();
        }
        cluster.purchase_orders = split_set(field(idx_pos));
        cluster.adjustment = number(idx_adjustment);
        cluster.manual_override = matches!(
            field(idx_override).to_ascii_uppercase().as_str(),
            "TRUE" | "1" | "YES"
        );
        cluster.notes = field(idx_notes).to_string();
        cluster.cancelled_items = field(idx_cancelled)
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        clusters.push(cluster);
    }
    Ok(clusters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Cluster {
        let mut c = Cluster::new("usa");
        c.orders.insert("O2".into());
        c.orders.insert("O1".into());
        c.trackings.insert("1Z1".into());
        c.to_email = "buyer@example.com".into();
        c.expected_cost = 120.0;
        c.tracked_cost = 100.0;
        c.adjustment = 5.0;
        c.last_ship_date = "2026-03-01".into();
        c.last_delivery_date = "2026-03-06".into();
        c.purchase_orders.insert("P1".into());
        c.manual_override = true;
        c.notes = "partial refund".into();
        c.cancelled_items.push("widget".into());
        c
    }

    #[test]
    fn export_then_import_round_trips() {
        let mut buf = Vec::new();
        write_sheet(&mut buf, &[sample()]).unwrap();

        let back = read_sheet(buf.as_slice()).unwrap();
        assert_eq!(back.len(), 1);
        let c = &back[0];
        assert_eq!(join_set(&c.orders), "O1, O2");
        assert!(c.trackings.contains("1Z1"));
        assert_eq!(c.to_email, "buyer@example.com");
        assert_eq!(c.expected_cost, 120.0);
        assert_eq!(c.tracked_cost, 100.0);
        assert_eq!(c.adjustment, 5.0);
        assert_eq!(c.group, "usa");
        assert!(c.manual_override);
        assert_eq!(c.notes, "partial refund");
        assert_eq!(c.cancelled_items, vec!["widget"]);
        assert!(c.email_ids.is_empty());
    }

    #[test]
    fn export_computes_total_diff() {
        let mut buf = Vec::new();
        write_sheet(&mut buf, &[sample()]).unwrap();

        let text = String::from_utf8(buf).unwrap();
        // 120 billed - 100 reimbursed - 5 adjustment
        assert!(text.contains("15.00"), "missing diff in: {text}");
    }

    #[test]
    fn blank_fields_take_zero_values() {
        let csv_text = "Orders,Group,Amount Billed,Manual Override\n\
                        \"O1, O2\",usa,,\n";
        let back = read_sheet(csv_text.as_bytes()).unwrap();

        assert_eq!(back.len(), 1);
        let c = &back[0];
        assert_eq!(c.orders.len(), 2);
        assert_eq!(c.expected_cost, 0.0);
        assert_eq!(c.tracked_cost, 0.0);
        assert!(!c.manual_override);
        assert!(c.trackings.is_empty());
        assert_eq!(c.last_ship_date, "0");
    }

    #[test]
    fn header_subset_is_accepted() {
        let csv_text = "Group,Trackings\nusa,\"1Z1, 1Z2\"\n";
        let back = read_sheet(csv_text.as_bytes()).unwrap();

        assert_eq!(back[0].group, "usa");
        assert_eq!(back[0].trackings.len(), 2);
        assert!(back[0].orders.is_empty());
    }

    #[test]
    fn override_parses_loosely() {
        let csv_text = "Group,Manual Override\nusa,true\nusa,1\nusa,no\n";
        let back = read_sheet(csv_text.as_bytes()).unwrap();
        assert!(back[0].manual_override);
        assert!(back[1].manual_override);
        assert!(!back[2].manual_override);
    }
}
