//! `consigno-engine` — Cluster consolidation & cost reconciliation engine.
//!
//! Pure engine crate: raw tracking records go in, consolidated clusters
//! and per-tracking cost ledgers come out. No IO, no network; the
//! adapters that obtain raw data live in `consigno-sources` and the
//! persistence layer in `consigno-io`.

pub mod attribution;
pub mod cluster;
pub mod ledger;
pub mod merge;
pub mod tracking;

pub use attribution::{apply_tracked_costs, fill_expected_costs, ExpectedCostLookup};
pub use cluster::{update_clusters, Cluster};
pub use ledger::{CostLedger, LedgerEntry, ReconResult, TrackingKey};
pub use merge::consolidate;
pub use tracking::Tracking;
