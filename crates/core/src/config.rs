//! Tunables for a generation run, loadable from TOML.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a room treats a connector cell that does not carry a door.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorPolicy {
    /// Any entrance profile may face a non-door connector cell.
    #[default]
    Permissive,
    /// Non-door connector cells behave like the grid boundary.
    Sealed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// World units per grid step.
    pub cell_size: f32,
    /// Backtracking steps allowed per zone cell before placement gives up.
    pub backtrack_budget_per_cell: usize,
    pub connector_policy: ConnectorPolicy,
    /// Spawn rooms and doors as part of `generate_map`.
    pub auto_instantiate: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            cell_size: 10.0,
            backtrack_budget_per_cell: 256,
            connector_policy: ConnectorPolicy::Permissive,
            auto_instantiate: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("config is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cell_size must be a positive number, got {0}")]
    InvalidCellSize(f32),
    #[error("backtrack_budget_per_cell must be at least 1")]
    ZeroBudget,
}

impl GeneratorConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(ConfigError::InvalidCellSize(self.cell_size));
        }
        if self.backtrack_budget_per_cell == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = GeneratorConfig::from_toml_str("").expect("empty config is valid");
        assert_eq!(config, GeneratorConfig::default());
    }

    #[test]
    fn partial_toml_overrides_only_given_fields() {
        let config = GeneratorConfig::from_toml_str(
            "cell_size = 4.5\nconnector_policy = \"sealed\"\nauto_instantiate = false\n",
        )
        .expect("config should parse");
        assert_eq!(config.cell_size, 4.5);
        assert_eq!(config.connector_policy, ConnectorPolicy::Sealed);
        assert!(!config.auto_instantiate);
        assert_eq!(config.backtrack_budget_per_cell, 256);
    }

    #[test]
    fn non_positive_cell_size_is_rejected() {
        let err = GeneratorConfig::from_toml_str("cell_size = 0.0").expect_err("zero cell size");
        assert!(matches!(err, ConfigError::InvalidCellSize(_)));
    }

    #[test]
    fn zero_budget_is_rejected() {
        let err = GeneratorConfig::from_toml_str("backtrack_budget_per_cell = 0")
            .expect_err("zero budget");
        assert!(matches!(err, ConfigError::ZeroBudget));
    }

    #[test]
    fn load_reads_config_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("generator.toml");
        fs::write(&path, "backtrack_budget_per_cell = 12\n").unwrap();

        let config = GeneratorConfig::load(&path).unwrap();
        assert_eq!(config.backtrack_budget_per_cell, 12);

        let missing = GeneratorConfig::load(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
