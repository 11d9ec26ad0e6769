//! Raw report rows to a [`ReconResult`], one normalizer per layout.
//!
//! Shared rules: duplicate tracking keys accumulate additively; a row
//! the source marks void or unverified still records its key with a
//! 0.0 cost; a missing required column means the upstream changed its
//! export and is a format error, raised without retry.

use chrono::NaiveDateTime;
use consigno_engine::{ReconResult, TrackingKey};

use crate::error::SourceError;
use crate::fetcher::CsvRow;

/// Uppercase and drop everything but digits, A-Z and the comma
/// separator. Portal exports wrap tracking numbers in quotes, spaces
/// and stray unicode.
pub fn clean_tracking(raw: &str) -> String {
    raw.to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_digit() || c.is_ascii_uppercase() || *c == ',')
        .collect()
}

fn require<'a>(row: &'a CsvRow, col: &str) -> Result<&'a str, SourceError> {
    row.get(col)
        .map(String::as_str)
        .ok_or_else(|| SourceError::Format(format!("missing column {col:?}")))
}

fn parse_amount(raw: &str, col: &str) -> Result<f64, SourceError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ','))
        .collect();
    if cleaned.is_empty() {
        return Ok(0.0);
    }
    cleaned
        .parse()
        .map_err(|_| SourceError::Format(format!("bad amount in {col:?}: {raw:?}")))
}

/// Portal receipts export. One row per receipt; the `TRACKING NUMBERS`
/// cell may carry a whole shipment batch, which becomes one multi-part
/// ledger key. Cost counts only when the receipt is verified and not
/// void; the PO map gets the raw total either way.
pub fn portal_receipts(group: &str, rows: &[CsvRow]) -> Result<ReconResult, SourceError> {
    let mut result = ReconResult::new();
    for row in rows {
        let void = require(row, "VOID")? == "1";
        let verified = require(row, "VERIFIED")? == "1";
        let po = require(row, "ID")?;
        let cost = parse_amount(require(row, "TOTAL")?, "TOTAL")?;
        let date_raw = require(row, "CREATED DATE")?;
        let date = NaiveDateTime::parse_from_str(date_raw, "%Y-%m-%d %H:%M:%S")
            .map_err(|_| SourceError::Format(format!("bad CREATED DATE: {date_raw:?}")))?
            .format("%Y-%m-%d")
            .to_string();

        let trackings: Vec<String> = clean_tracking(require(row, "TRACKING NUMBERS")?)
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        if !trackings.is_empty() && cost != 0.0 {
            let counted = if verified && !void { cost } else { 0.0 };
            result
                .ledger
                .add(TrackingKey::new(trackings), group, counted, &date);
        }
        if cost != 0.0 && !po.is_empty() {
            result.add_po_cost(po, cost);
        }
    }
    Ok(result)
}

/// Deals-site CSV export: one row per tracking with an `is_verified`
/// gate. Unverified rows record the key at 0.0.
pub fn deals_export(group: &str, rows: &[CsvRow]) -> Result<ReconResult, SourceError> {
    let mut result = ReconResult::new();
    for row in rows {
        let tracking = clean_tracking(require(row, "tracking")?);
        let verified = matches!(require(row, "is_verified")?, "True" | "true" | "1");
        let total_raw = require(row, "total")?;
        let cost = if verified {
            parse_amount(total_raw, "total")?
        } else {
            0.0
        };
        result
            .ledger
            .add(TrackingKey::single(tracking), group, cost, "");
    }
    Ok(result)
}

/// Commission-site export: reimbursement is the item price plus the
/// commission, summed per tracking. No dates in this layout.
pub fn commission_export(group: &str, rows: &[CsvRow]) -> Result<ReconResult, SourceError> {
    let mut result = ReconResult::new();
    for row in rows {
        let tracking = clean_tracking(require(row, "Tracking Number")?);
        let price = parse_amount(require(row, "Price Total")?, "Price Total")?;
        let commission = parse_amount(require(row, "Commission Total")?, "Commission Total")?;
        result.ledger.add(
            TrackingKey::single(tracking),
            group,
            price + commission,
            "unknown",
        );
    }
    Ok(result)
}

/// Hand-dropped CSV folder fallback: `Tracking Number` / `Total`, with
/// currency noise and sign stripped the way the folder files carry it.
pub fn csv_folder(group: &str, rows: &[CsvRow]) -> Result<ReconResult, SourceError> {
    let mut result = ReconResult::new();
    for row in rows {
        let tracking = clean_tracking(require(row, "Tracking Number")?);
        let total_raw: String = require(row, "Total")?
            .chars()
            .filter(|c| *c != '-')
            .collect();
        let total = parse_amount(&total_raw, "Total")?;
        result
            .ledger
            .add(TrackingKey::single(tracking), group, total, "");
    }
    Ok(result)
}
