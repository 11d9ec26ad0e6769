//! The `run` subcommand: one full reconciliation batch.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use consigno_engine::{
    apply_tracked_costs, consolidate, fill_expected_costs, update_clusters, ReconResult, Tracking,
};
use consigno_io::{write_sheet, ClusterStore, FileArchiveCache};
use consigno_sources::{fetch_group_costs, CsvFolderFetcher};

use crate::config::Config;
use crate::CliError;

pub fn cmd_run(
    config_path: PathBuf,
    trackings: Option<PathBuf>,
    export: Option<PathBuf>,
    groups: Vec<String>,
    skip_fetch: bool,
) -> Result<(), CliError> {
    let cfg = Config::load(&config_path)?;
    let store = ClusterStore::new(&cfg.store_path);
    let mut clusters = store.load().map_err(CliError::from_io)?;
    eprintln!(
        "loaded {} clusters from {}",
        clusters.len(),
        cfg.store_path.display()
    );

    if let Some(path) = trackings {
        let batch = read_trackings_csv(&path)?;
        eprintln!("ingesting {} trackings from {}", batch.len(), path.display());
        update_clusters(&mut clusters, &batch);
    }

    let mut clusters = consolidate(clusters);
    eprintln!("{} clusters after consolidation", clusters.len());

    if !skip_fetch {
        let fetch_groups: Vec<String> = if groups.is_empty() {
            cfg.sources.keys().cloned().collect()
        } else {
            groups
        };

        let fetcher = CsvFolderFetcher::new(&cfg.csv_folder);
        let cache = FileArchiveCache::new(&cfg.archive_dir);
        let mut combined = ReconResult::new();
        let mut fetched: BTreeSet<String> = BTreeSet::new();
        for group in &fetch_groups {
            eprintln!("fetching costs for {group}");
            let result = fetch_group_costs(group, &cfg.sources, &fetcher, &cache)
                .map_err(CliError::fetch)?;
            eprintln!(
                "  {} ledger entries, {} purchase orders",
                result.ledger.len(),
                result.po_costs.len()
            );
            combined.merge(result);
            fetched.insert(group.clone());
        }

        apply_tracked_costs(&mut clusters, &combined, &fetched);
        let po_total: f64 = combined.po_costs.values().sum();
        eprintln!(
            "{} purchase orders totalling {po_total:.2}",
            combined.po_costs.len()
        );
    }

    if let Some(path) = &cfg.expected_costs_file {
        let lookup = load_expected_costs(path)?;
        fill_expected_costs(&mut clusters, &lookup);
    }

    store.save(&clusters).map_err(CliError::from_io)?;
    eprintln!(
        "saved {} clusters to {}",
        clusters.len(),
        cfg.store_path.display()
    );

    if let Some(path) = export {
        let file = File::create(&path)
            .map_err(|e| CliError::io(format!("cannot create {}: {e}", path.display())))?;
        write_sheet(BufWriter::new(file), &clusters).map_err(CliError::from_io)?;
        eprintln!("exported sheet to {}", path.display());
    }
    Ok(())
}

/// Read a batch of new trackings from CSV.
///
/// Requires `Tracking Number`, `Group` and `Orders` columns; `Ship
/// Date`, `Delivery Date` and `To Email` are optional.
pub fn read_trackings_csv(path: &Path) -> Result<Vec<Tracking>, CliError> {
    let file = File::open(path)
        .map_err(|e| CliError::io(format!("cannot open {}: {e}", path.display())))?;
    let mut rdr = csv::Reader::from_reader(file);
    let headers = rdr
        .headers()
        .map_err(|e| CliError::parse(format!("{}: {e}", path.display())))?
        .clone();

    let col = |name: &str| headers.iter().position(|h| h.trim() == name);
    let required = |name: &str| {
        col(name).ok_or_else(|| {
            CliError::parse(format!("{}: missing column {name:?}", path.display()))
        })
    };
    let idx_number = required("Tracking Number")?;
    let idx_group = required("Group")?;
    let idx_orders = required("Orders")?;
    let idx_ship = col("Ship Date");
    let idx_delivery = col("Delivery Date");
    let idx_email = col("To Email");

    let mut trackings = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| CliError::parse(format!("{}: {e}", path.display())))?;
        let get = |idx: usize| record.get(idx).unwrap_or("").trim();
        let opt = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("").trim();

        let orders = get(idx_orders)
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string);
        let mut tracking = Tracking::new(get(idx_number), get(idx_group), orders);
        if !opt(idx_ship).is_empty() {
            tracking.ship_date = opt(idx_ship).to_string();
        }
        if !opt(idx_delivery).is_empty() {
            tracking.delivery_date = opt(idx_delivery).to_string();
        }
        tracking.to_email = opt(idx_email).to_string();
        trackings.push(tracking);
    }
    Ok(trackings)
}

/// Load the per-order expected-cost lookup: an `Order ID` / `Cost`
/// CSV maintained outside this system. Duplicate order ids sum.
pub fn load_expected_costs(path: &Path) -> Result<BTreeMap<String, f64>, CliError> {
    let file = File::open(path)
        .map_err(|e| CliError::io(format!("cannot open {}: {e}", path.display())))?;
    let mut rdr = csv::Reader::from_reader(file);
    let headers = rdr
        .headers()
        .map_err(|e| CliError::parse(format!("{}: {e}", path.display())))?
        .clone();

    let find = |name: &str| {
        headers.iter().position(|h| h.trim() == name).ok_or_else(|| {
            CliError::parse(format!("{}: missing column {name:?}", path.display()))
        })
    };
    let idx_order = find("Order ID")?;
    let idx_cost = find("Cost")?;

    let mut costs = BTreeMap::new();
    for record in rdr.records() {
        let record = record.map_err(|e| CliError::parse(format!("{}: {e}", path.display())))?;
        let order = record.get(idx_order).unwrap_or("").trim();
        if order.is_empty() {
            continue;
        }
        let raw = record.get(idx_cost).unwrap_or("").trim();
        let cost: f64 = if raw.is_empty() {
            0.0
        } else {
            raw.parse().map_err(|_| {
                CliError::parse(format!("{}: bad cost {raw:?} for {order}", path.display()))
            })?
        };
        *costs.entry(order.to_string()).or_insert(0.0) += cost;
    }
    Ok(costs)
}
