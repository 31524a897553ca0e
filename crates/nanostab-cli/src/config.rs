use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_DATASET: &str = "all_data.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// JSON document to browse.
    pub dataset: Option<PathBuf>,
    /// Directory image paths from the dataset are relative to.
    pub asset_root: Option<PathBuf>,
    pub gate: GateConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    pub secret_dir: Option<PathBuf>,
    pub expected_digest: Option<String>,
}

impl Config {
    pub fn dataset_path(&self) -> PathBuf {
        self.dataset
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET))
    }

    /// Asset root, falling back to the dataset's own directory.
    pub fn asset_root(&self) -> PathBuf {
        if let Some(root) = &self.asset_root {
            return root.clone();
        }
        self.dataset_path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    // Relative paths in a config file are taken relative to that file.
    fn anchor(mut self, base: &Path) -> Self {
        let join = |path: Option<PathBuf>| path.map(|p| if p.is_relative() { base.join(p) } else { p });
        self.dataset = join(self.dataset.take());
        self.asset_root = join(self.asset_root.take());
        self.gate.secret_dir = join(self.gate.secret_dir.take());
        self
    }
}

pub fn parse_config(text: &str) -> Result<Config> {
    toml::from_str(text).context("parsing config")
}

pub fn read_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config =
        parse_config(&contents).with_context(|| format!("in config {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(config.anchor(base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_without_file() {
        let config = Config::default();
        assert_eq!(config.dataset_path(), PathBuf::from("all_data.json"));
        assert_eq!(config.asset_root(), PathBuf::from(""));
        assert!(config.gate.expected_digest.is_none());
    }

    #[test]
    fn relative_paths_follow_config_location() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nanostab.toml");
        fs::write(
            &path,
            "dataset = \"data/all_data.json\"\nasset_root = \"/srv/assets\"\n\n[gate]\nsecret_dir = \"gate\"\n",
        )
        .unwrap();
        let config = read_config(&path).unwrap();
        assert_eq!(config.dataset_path(), dir.path().join("data/all_data.json"));
        assert_eq!(config.asset_root(), PathBuf::from("/srv/assets"));
        assert_eq!(config.gate.secret_dir, Some(dir.path().join("gate")));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(parse_config("datasett = \"x.json\"").is_err());
    }
}
