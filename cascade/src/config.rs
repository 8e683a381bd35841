use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Where the local input extracts live and how they are read.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_path: String,
    /// Drop crosswalk rows flagged as outliers.
    pub exclude_outliers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_path: "inputs".into(),
            exclude_outliers: true,
        }
    }
}

impl Config {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Reads a config file, falling back to the defaults when it does not exist.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() -> anyhow::Result<()> {
        let config = Config::from_toml_str(r#"base_path = "/data/cascade""#)?;
        assert_eq!(config.base_path, "/data/cascade");
        assert!(config.exclude_outliers);
        Ok(())
    }

    #[test]
    fn missing_file_gives_default() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = Config::from_toml_file(dir.path().join("config.toml"))?;
        assert_eq!(config, Config::default());
        Ok(())
    }
}
