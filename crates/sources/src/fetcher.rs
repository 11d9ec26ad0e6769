use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;

use crate::error::SourceError;

/// One raw report row, column name to raw cell text. Reports come from
/// hand-maintained portals, so rows are kept stringly and normalizers
/// decide what each column means.
pub type CsvRow = HashMap<String, String>;

/// Obtains the raw report rows for a group. How the rows come to exist
/// (a download, a portal export dropped in a folder) is outside this
/// crate; the file-backed impl below is the only one shipped.
pub trait RowFetcher {
    fn fetch_rows(&self, group: &str) -> Result<Vec<CsvRow>, SourceError>;
}

/// Reads every `*.csv` under `<root>/<group>/` and concatenates the
/// rows, in filename order so reruns see the same sequence.
pub struct CsvFolderFetcher {
    root: PathBuf,
}

impl CsvFolderFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl RowFetcher for CsvFolderFetcher {
    fn fetch_rows(&self, group: &str) -> Result<Vec<CsvRow>, SourceError> {
        let dir = self.root.join(group);
        let entries = std::fs::read_dir(&dir)
            .map_err(|e| SourceError::Upstream(format!("cannot read {}: {e}", dir.display())))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
            .collect();
        paths.sort();

        let mut rows = Vec::new();
        for path in paths {
            let file = File::open(&path).map_err(|e| {
                SourceError::Upstream(format!("cannot open {}: {e}", path.display()))
            })?;
            rows.extend(read_rows(file)?);
        }
        Ok(rows)
    }
}

/// Parse a CSV stream into header-keyed rows.
pub fn read_rows<R: std::io::Read>(reader: R) -> Result<Vec<CsvRow>, SourceError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| SourceError::Upstream(e.to_string()))?
        .clone();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| SourceError::Upstream(e.to_string()))?;
        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect(),
        );
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_all_csvs_in_the_group_folder() {
        let dir = tempfile::tempdir().unwrap();
        let group_dir = dir.path().join("usa");
        std::fs::create_dir(&group_dir).unwrap();
        std::fs::write(
            group_dir.join("a.csv"),
            "Tracking Number,Total\n1Z1,$10.00\n",
        )
        .unwrap();
        std::fs::write(group_dir.join("b.csv"), "Tracking Number,Total\n1Z2,$5\n").unwrap();
        std::fs::write(group_dir.join("notes.txt"), "ignore me").unwrap();

        let fetcher = CsvFolderFetcher::new(dir.path());
        let rows = fetcher.fetch_rows("usa").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Tracking Number"], "1Z1");
        assert_eq!(rows[1]["Total"], "$5");
    }

    #[test]
    fn missing_group_folder_is_upstream() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = CsvFolderFetcher::new(dir.path());
        let err = fetcher.fetch_rows("nope").unwrap_err();
        assert!(matches!(err, SourceError::Upstream(_)));
    }
}
