//! Registry loading for the CLI: base registry plus extension registries,
//! installed as the process-wide registry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use cmdroute_commands::{global, MergeSummary, Registry};
use cmdroute_config::EngineConfig;
use tracing::{info, warn};

/// What `install` loaded, for `cmdroute check`.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub base: PathBuf,
    pub merged: Vec<(PathBuf, MergeSummary)>,
    pub skipped: Vec<(PathBuf, String)>,
}

/// The base registry path: `--registry` wins over the config file.
pub fn registry_path(config: &EngineConfig, cli_override: Option<&Path>) -> Result<PathBuf> {
    match cli_override.map(Path::to_path_buf).or_else(|| config.registry_path()) {
        Some(path) => Ok(path),
        None => bail!("No registry configured; set `registry` in config.yaml or pass --registry"),
    }
}

pub fn load_base(path: &Path, categories: &[String]) -> Result<Registry> {
    Registry::load(path, categories)
        .with_context(|| format!("Failed to load registry {}", path.display()))
}

/// Load the base registry, install it globally, and merge every loadable
/// extension over it. Broken extensions are skipped with a warning.
pub fn install(config: &EngineConfig, cli_override: Option<&Path>) -> Result<(Arc<Registry>, LoadReport)> {
    let categories = config.categories();
    let base = registry_path(config, cli_override)?;
    global::init(load_base(&base, &categories)?)?;

    let mut report = LoadReport {
        base,
        ..Default::default()
    };
    for path in config.extension_paths() {
        let merged = Registry::load(&path, &categories)
            .map_err(|e| e.to_string())
            .and_then(|ext| global::merge(ext).map_err(|e| e.to_string()));
        match merged {
            Ok(summary) => {
                info!(path = %path.display(), "Merged extension registry: {}", summary);
                report.merged.push((path, summary));
            }
            Err(reason) => {
                warn!(path = %path.display(), "Skipping extension registry: {}", reason);
                report.skipped.push((path, reason));
            }
        }
    }

    let registry = global::get().context("Registry was not installed")?;
    Ok((registry, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"{
        "tokens": ["os", "platform"],
        "show version": { "*": { "*": "generic.ShowVersion" } }
    }"#;

    const EXTENSION: &str = r#"{
        "tokens": ["os", "platform"],
        "show version": { "iosxe": { "*": "iosxe.ShowVersion" } },
        "show clock": { "*": { "*": "generic.ShowClock" } }
    }"#;

    fn config(dir: &Path, extensions: &[&str]) -> EngineConfig {
        std::fs::write(dir.join("base.json"), BASE).unwrap();
        std::fs::write(dir.join("site.json"), EXTENSION).unwrap();
        EngineConfig {
            registry: Some(dir.join("base.json").display().to_string()),
            extensions: extensions
                .iter()
                .map(|e| dir.join(e).display().to_string())
                .collect(),
            categories: Some(vec!["os".into(), "platform".into()]),
            ..Default::default()
        }
    }

    #[test]
    fn cli_registry_overrides_config() {
        let cfg = EngineConfig {
            registry: Some("from-config.json".into()),
            ..Default::default()
        };
        assert_eq!(registry_path(&cfg, None).unwrap(), PathBuf::from("from-config.json"));
        assert_eq!(
            registry_path(&cfg, Some(Path::new("cli.json"))).unwrap(),
            PathBuf::from("cli.json")
        );
        assert!(registry_path(&EngineConfig::default(), None).is_err());
    }

    #[test]
    fn installs_base_and_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), &["site.json", "missing.json"]);

        global::reset_for_tests();
        let (registry, report) = install(&cfg, None).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(report.merged.len(), 1);
        assert_eq!(report.merged[0].1.templates_added, 1);
        assert_eq!(report.skipped.len(), 1);
        global::reset_for_tests();
    }

    #[test]
    fn base_with_wrong_categories_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), &[]);
        cfg.categories = Some(vec!["os".into()]);
        let err = load_base(&cfg.registry_path().unwrap(), &cfg.categories()).unwrap_err();
        assert!(format!("{err:#}").contains("category order"));
    }
}
