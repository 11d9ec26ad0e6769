//! TOML configuration: which groups exist, where their costs come
//! from, and where local state lives.
//!
//! Credentials are never written in the config file. A group names the
//! environment variables that hold its username and password, and
//! loading resolves them, so a config file is safe to commit.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use consigno_io::{ClusterStore, FileArchiveCache};
use consigno_sources::{GroupSource, SourceKind};
use serde::Deserialize;

use crate::CliError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    store: StoreSection,
    #[serde(default)]
    expected_costs: ExpectedCostsSection,
    #[serde(default)]
    fetch: FetchSection,
    #[serde(default)]
    groups: BTreeMap<String, RawGroup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreSection {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExpectedCostsSection {
    file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FetchSection {
    csv_folder: Option<PathBuf>,
    archive_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGroup {
    kind: SourceKind,
    base_url: Option<String>,
    username_env: Option<String>,
    password_env: Option<String>,
    #[serde(default)]
    archives: Vec<String>,
}

/// Fully resolved runtime configuration.
#[derive(Debug)]
pub struct Config {
    pub store_path: PathBuf,
    pub expected_costs_file: Option<PathBuf>,
    pub csv_folder: PathBuf,
    pub archive_dir: PathBuf,
    pub sources: BTreeMap<String, GroupSource>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, CliError> {
        let raw: RawConfig = toml::from_str(text)
            .map_err(|e| CliError::config(format!("invalid config: {e}")))?;

        let mut sources = BTreeMap::new();
        for (name, group) in raw.groups {
            sources.insert(name.clone(), resolve_group(&name, group)?);
        }

        Ok(Self {
            store_path: raw
                .store
                .path
                .unwrap_or_else(ClusterStore::default_path),
            expected_costs_file: raw.expected_costs.file,
            csv_folder: raw
                .fetch
                .csv_folder
                .unwrap_or_else(|| PathBuf::from("reports")),
            archive_dir: raw
                .fetch
                .archive_dir
                .unwrap_or_else(FileArchiveCache::default_dir),
            sources,
        })
    }
}

fn resolve_group(name: &str, raw: RawGroup) -> Result<GroupSource, CliError> {
    if raw.kind != SourceKind::Portal && !raw.archives.is_empty() {
        return Err(CliError::config(format!(
            "group {name}: archives are only supported for portal sources"
        )));
    }

    match raw.kind {
        SourceKind::Portal => Ok(GroupSource::Portal {
            archives: raw.archives,
        }),
        SourceKind::DealsApi => {
            let base_url = raw.base_url.ok_or_else(|| {
                CliError::config(format!("group {name}: deals_api requires base_url"))
            })?;
            let username = resolve_env(name, "username_env", raw.username_env.as_deref())?;
            let password = resolve_env(name, "password_env", raw.password_env.as_deref())?;
            Ok(GroupSource::DealsApi {
                base_url,
                username,
                password,
            })
        }
        SourceKind::DealsExport => Ok(GroupSource::DealsExport),
        SourceKind::CommissionExport => Ok(GroupSource::CommissionExport),
        SourceKind::CsvFolder => Ok(GroupSource::CsvFolder),
    }
}

fn resolve_env(group: &str, field: &str, var: Option<&str>) -> Result<String, CliError> {
    let var = var.ok_or_else(|| {
        CliError::config(format!("group {group}: deals_api requires {field}"))
    })?;
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(CliError::config(format!(
            "group {group}: environment variable {var} is not set"
        ))
        .with_hint(format!("export {var}=... before running"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert!(cfg.sources.is_empty());
        assert!(cfg.expected_costs_file.is_none());
        assert_eq!(cfg.csv_folder, PathBuf::from("reports"));
    }

    #[test]
    fn portal_group_with_archives() {
        let cfg = Config::from_toml(
            r#"
            [store]
            path = "state/clusters.json"

            [groups.po]
            kind = "portal"
            archives = ["po-2024", "po-2023"]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.store_path, PathBuf::from("state/clusters.json"));
        match &cfg.sources["po"] {
            GroupSource::Portal { archives } => {
                assert_eq!(archives, &["po-2024".to_string(), "po-2023".to_string()]);
            }
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn deals_api_resolves_credentials_from_env() {
        std::env::set_var("CONSIGNO_TEST_USER", "buyer");
        std::env::set_var("CONSIGNO_TEST_PASS", "hunter2");
        let cfg = Config::from_toml(
            r#"
            [groups.usa]
            kind = "deals_api"
            base_url = "https://api.example.com/index.php"
            username_env = "CONSIGNO_TEST_USER"
            password_env = "CONSIGNO_TEST_PASS"
            "#,
        )
        .unwrap();

        match &cfg.sources["usa"] {
            GroupSource::DealsApi { username, password, .. } => {
                assert_eq!(username, "buyer");
                assert_eq!(password, "hunter2");
            }
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn deals_api_missing_env_is_a_config_error_with_hint() {
        std::env::remove_var("CONSIGNO_TEST_MISSING");
        let err = Config::from_toml(
            r#"
            [groups.usa]
            kind = "deals_api"
            base_url = "https://api.example.com"
            username_env = "CONSIGNO_TEST_MISSING"
            password_env = "CONSIGNO_TEST_MISSING"
            "#,
        )
        .unwrap_err();

        assert_eq!(err.code, crate::exit_codes::EXIT_CONFIG);
        assert!(err.hint.is_some());
    }

    #[test]
    fn deals_api_without_base_url_is_rejected() {
        let err = Config::from_toml(
            r#"
            [groups.usa]
            kind = "deals_api"
            "#,
        )
        .unwrap_err();
        assert!(err.message.contains("base_url"));
    }

    #[test]
    fn archives_on_non_portal_group_are_rejected() {
        let err = Config::from_toml(
            r#"
            [groups.local]
            kind = "csv_folder"
            archives = ["old"]
            "#,
        )
        .unwrap_err();
        assert!(err.message.contains("archives"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml(
            r#"
            [groups.local]
            kind = "csv_folder"
            pasword_env = "TYPO"
            "#,
        )
        .unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_CONFIG);
    }
}
