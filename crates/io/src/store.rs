use std::fs;
use std::path::PathBuf;

use consigno_engine::Cluster;

use crate::error::IoError;

/// Durable, whole-collection cluster snapshot.
///
/// The store is read-modify-write at collection granularity: a run
/// loads everything, works in memory, and saves everything back at a
/// checkpoint after full aggregation. Save writes a sibling temp file
/// and renames it over the snapshot, so an externally killed run never
/// leaves a torn file behind.
pub struct ClusterStore {
    path: PathBuf,
}

impl ClusterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The default snapshot location under the platform data dir.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("consigno")
            .join("clusters.json")
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load the full cluster list. A missing snapshot is an empty
    /// collection, not an error: first runs start from nothing.
    pub fn load(&self) -> Result<Vec<Cluster>, IoError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(IoError::Io(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )))
            }
        };
        serde_json::from_str(&raw)
            .map_err(|e| IoError::Json(format!("cannot parse {}: {e}", self.path.display())))
    }

    /// Save the full cluster list, replacing the previous snapshot.
    pub fn save(&self, clusters: &[Cluster]) -> Result<(), IoError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| IoError::Io(format!("cannot create {}: {e}", parent.display())))?;
        }
        let json = serde_json::to_string_pretty(clusters)
            .map_err(|e| IoError::Json(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| IoError::Io(format!("cannot write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            IoError::Io(format!(
                "cannot rename {} to {}: {e}",
                tmp.display(),
                self.path.display()
            ))
        })
    }
}
