use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tally_ledger::LedgerConfig;
use tally_store::{FileStoreConfig, SyncMode};

/// Contents of the `--config` TOML file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    pub data_dir: PathBuf,
    pub sync_mode: SyncMode,
    pub ledger: LedgerConfig,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".tally"),
            sync_mode: SyncMode::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl TallyConfig {
    /// Load from `path`, or fall back to defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn store_config(&self) -> FileStoreConfig {
        FileStoreConfig {
            sync_mode: self.sync_mode,
            ..FileStoreConfig::in_dir(&self.data_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = TallyConfig::default();
        assert_eq!(c.data_dir, PathBuf::from(".tally"));
        assert_eq!(c.sync_mode, SyncMode::EveryWrite);
        assert_eq!(c.ledger, LedgerConfig::default());
        assert_eq!(c.store_config().path, PathBuf::from(".tally").join("ledger.log"));
    }

    #[test]
    fn no_file_means_defaults() {
        assert_eq!(TallyConfig::load(None).unwrap(), TallyConfig::default());
    }

    #[test]
    fn load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");
        std::fs::write(
            &path,
            "data_dir = \"/var/lib/tally\"\nsync_mode = \"os_default\"\n\n[ledger]\nsum_timeout_ms = 250\n",
        )
        .unwrap();

        let c = TallyConfig::load(Some(&path)).unwrap();
        assert_eq!(c.data_dir, PathBuf::from("/var/lib/tally"));
        assert_eq!(c.sync_mode, SyncMode::OsDefault);
        assert_eq!(c.ledger.sum_timeout_ms, 250);
        assert_eq!(c.ledger.insert_timeout_ms, 5_000);
        assert_eq!(c.store_config().sync_mode, SyncMode::OsDefault);
    }

    #[test]
    fn missing_or_bad_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TallyConfig::load(Some(&dir.path().join("absent.toml"))).is_err());

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "data_dir = [").unwrap();
        assert!(TallyConfig::load(Some(&path)).is_err());
    }
}
