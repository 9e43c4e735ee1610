//! Config file location and loading.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::schema::EngineConfig;

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the cmdroute config directory.
/// Priority: `CMDROUTE_CONFIG_DIR` env > `~/.cmdroute/`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CMDROUTE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".cmdroute"),
        None => PathBuf::from(".cmdroute"),
    }
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Load and parse the config from disk.
///
/// Returns `Ok(Default::default())` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(EngineConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    // An empty file parses as YAML null.
    if raw.trim().is_empty() {
        return Ok(EngineConfig::default());
    }

    let config: EngineConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&config_file_path(dir.path())).unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn reads_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "registry: ./registry.json\nfuzzy: false").unwrap();
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.registry.as_deref(), Some("./registry.json"));
        assert_eq!(cfg.fuzzy, Some(false));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "categories: {{ not: [closed").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config YAML"));
    }
}
