//! Group label to cost-source dispatch.

use std::collections::BTreeMap;

use consigno_engine::ReconResult;
use consigno_io::ArchiveCache;
use serde::{Deserialize, Serialize};

use crate::api::DealsApiClient;
use crate::error::SourceError;
use crate::fetcher::RowFetcher;
use crate::normalize;
use crate::retry::{with_retry, RetryError, COST_FETCH_ATTEMPTS};

/// The configuration-facing tag naming which adapter a group uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Portal,
    DealsApi,
    DealsExport,
    CommissionExport,
    CsvFolder,
}

/// A group's cost source with everything its adapter needs, built by
/// the caller after credential resolution. Credentials here are the
/// resolved values, never environment variable names.
#[derive(Debug, Clone)]
pub enum GroupSource {
    Portal { archives: Vec<String> },
    DealsApi { base_url: String, username: String, password: String },
    DealsExport,
    CommissionExport,
    CsvFolder,
}

impl GroupSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Portal { .. } => SourceKind::Portal,
            Self::DealsApi { .. } => SourceKind::DealsApi,
            Self::DealsExport => SourceKind::DealsExport,
            Self::CommissionExport => SourceKind::CommissionExport,
            Self::CsvFolder => SourceKind::CsvFolder,
        }
    }
}

fn fetch_once(
    label: &str,
    source: &GroupSource,
    fetcher: &dyn RowFetcher,
) -> Result<ReconResult, SourceError> {
    match source {
        GroupSource::Portal { .. } => {
            let rows = fetcher.fetch_rows(label)?;
            normalize::portal_receipts(label, &rows)
        }
        GroupSource::DealsApi { base_url, username, password } => {
            let client = DealsApiClient::new(base_url.clone())?;
            client.fetch_costs(label, username, password)
        }
        GroupSource::DealsExport => {
            let rows = fetcher.fetch_rows(label)?;
            normalize::deals_export(label, &rows)
        }
        GroupSource::CommissionExport => {
            let rows = fetcher.fetch_rows(label)?;
            normalize::commission_export(label, &rows)
        }
        GroupSource::CsvFolder => {
            let rows = fetcher.fetch_rows(label)?;
            normalize::csv_folder(label, &rows)
        }
    }
}

/// Fetch one group's reconciliation result.
///
/// A group nobody configured yields an empty result, not an error: the
/// run should reconcile what it can. Archived sub-groups are fetched
/// once through the cache and spliced into the live result. Every
/// upstream fetch runs under the retrying executor.
pub fn fetch_group_costs(
    group: &str,
    sources: &BTreeMap<String, GroupSource>,
    fetcher: &dyn RowFetcher,
    cache: &dyn ArchiveCache,
) -> Result<ReconResult, RetryError> {
    let Some(source) = sources.get(group) else {
        eprintln!("warning: no cost source configured for group {group}, skipping");
        return Ok(ReconResult::new());
    };

    let mut result = with_retry(
        &format!("cost fetch for {group}"),
        COST_FETCH_ATTEMPTS,
        || fetch_once(group, source, fetcher),
    )?;

    if let GroupSource::Portal { archives } = source {
        for archive in archives {
            if !cache.has(archive) {
                eprintln!("fetching archive {archive} for the first time");
                let fetched = with_retry(
                    &format!("archive fetch for {archive}"),
                    COST_FETCH_ATTEMPTS,
                    || fetch_once(archive, source, fetcher),
                )?;
                cache
                    .put(archive, &fetched)
                    .map_err(|e| cache_error(archive, e))?;
            }
            let archived = cache.get(archive).map_err(|e| cache_error(archive, e))?;
            result.merge(archived);
        }
    }
    Ok(result)
}

fn cache_error(archive: &str, e: consigno_io::IoError) -> RetryError {
    RetryError {
        op: format!("archive cache for {archive}"),
        attempts: 1,
        last: e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::CsvRow;
    use consigno_engine::TrackingKey;
    use consigno_io::FileArchiveCache;
    use std::cell::RefCell;

    /// Canned rows per label, with a call log.
    struct FakeFetcher {
        rows: BTreeMap<String, Vec<CsvRow>>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeFetcher {
        fn new(rows: BTreeMap<String, Vec<CsvRow>>) -> Self {
            Self { rows, calls: RefCell::new(Vec::new()) }
        }
    }

    impl RowFetcher for FakeFetcher {
        fn fetch_rows(&self, group: &str) -> Result<Vec<CsvRow>, SourceError> {
            self.calls.borrow_mut().push(group.to_string());
            self.rows
                .get(group)
                .cloned()
                .ok_or_else(|| SourceError::Upstream(format!("no rows for {group}")))
        }
    }

    fn portal_row(trackings: &str, total: &str) -> CsvRow {
        [
            ("VOID", "0"),
            ("VERIFIED", "1"),
            ("ID", "PO-1"),
            ("TOTAL", total),
            ("CREATED DATE", "2026-01-01 00:00:00"),
            ("TRACKING NUMBERS", trackings),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn unconfigured_group_yields_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileArchiveCache::new(dir.path());
        let fetcher = FakeFetcher::new(BTreeMap::new());

        let result = fetch_group_costs("mystery", &BTreeMap::new(), &fetcher, &cache).unwrap();
        assert!(result.is_empty());
        assert!(fetcher.calls.borrow().is_empty());
    }

    #[test]
    fn archives_are_fetched_once_then_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileArchiveCache::new(dir.path());

        let mut rows = BTreeMap::new();
        rows.insert("usa".to_string(), vec![portal_row("1Z1", "10")]);
        rows.insert("usa-2024".to_string(), vec![portal_row("1Z9", "7")]);
        let fetcher = FakeFetcher::new(rows);

        let mut sources = BTreeMap::new();
        sources.insert(
            "usa".to_string(),
            GroupSource::Portal { archives: vec!["usa-2024".to_string()] },
        );

        let first = fetch_group_costs("usa", &sources, &fetcher, &cache).unwrap();
        assert_eq!(first.ledger.get(&TrackingKey::single("1Z1")).unwrap().cost, 10.0);
        assert_eq!(first.ledger.get(&TrackingKey::single("1Z9")).unwrap().cost, 7.0);

        let second = fetch_group_costs("usa", &sources, &fetcher, &cache).unwrap();
        assert_eq!(second.ledger.len(), 2);

        let archive_fetches = fetcher
            .calls
            .borrow()
            .iter()
            .filter(|c| *c == "usa-2024")
            .count();
        assert_eq!(archive_fetches, 1, "archive must come from the cache on reruns");
    }

    #[test]
    fn transient_failures_exhaust_the_retry_budget() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileArchiveCache::new(dir.path());
        let fetcher = FakeFetcher::new(BTreeMap::new());

        let mut sources = BTreeMap::new();
        sources.insert("usa".to_string(), GroupSource::CsvFolder);

        let err = fetch_group_costs("usa", &sources, &fetcher, &cache).unwrap_err();
        assert_eq!(err.attempts, COST_FETCH_ATTEMPTS);
        assert_eq!(fetcher.calls.borrow().len(), COST_FETCH_ATTEMPTS as usize);
    }
}
