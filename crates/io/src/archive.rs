use std::fs;
use std::path::PathBuf;

use consigno_engine::ReconResult;

use crate::error::IoError;

/// Cache of reconciliation results for archived sub-groups.
///
/// An archived sub-group's report is frozen upstream, so its result is
/// fetched once, written through `put`, and read back on every later
/// run. `put` on a key that already exists is an error: an archive that
/// changed is a sign something upstream is wrong, not a reason to
/// overwrite.
pub trait ArchiveCache {
    fn has(&self, group: &str) -> bool;
    fn get(&self, group: &str) -> Result<ReconResult, IoError>;
    fn put(&self, group: &str, result: &ReconResult) -> Result<(), IoError>;
}

/// One JSON file per archived sub-group under a cache directory.
pub struct FileArchiveCache {
    dir: PathBuf,
}

impl FileArchiveCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The default cache location under the platform data dir.
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("consigno")
            .join("archives")
    }

    fn path_for(&self, group: &str) -> PathBuf {
        // Group labels are config keys, but sanitize anyway so a label
        // with a separator cannot escape the cache dir.
        let safe: String = group
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl ArchiveCache for FileArchiveCache {
    fn has(&self, group: &str) -> bool {
        self.path_for(group).is_file()
    }

    fn get(&self, group: &str) -> Result<ReconResult, IoError> {
        let path = self.path_for(group);
        let raw = fs::read_to_string(&path)
            .map_err(|e| IoError::Io(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| IoError::Json(format!("cannot parse {}: {e}", path.display())))
    }

    fn put(&self, group: &str, result: &ReconResult) -> Result<(), IoError> {
        let path = self.path_for(group);
        if path.exists() {
            return Err(IoError::Io(format!(
                "archive {} already cached, refusing to overwrite",
                path.display()
            )));
        }
        fs::create_dir_all(&self.dir)
            .map_err(|e| IoError::Io(format!("cannot create {}: {e}", self.dir.display())))?;
        let json =
            serde_json::to_string_pretty(result).map_err(|e| IoError::Json(e.to_string()))?;
        fs::write(&path, json)
            .map_err(|e| IoError::Io(format!("cannot write {}: {e}", path.display())))
    }
}
