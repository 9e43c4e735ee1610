//! cmdroute engine configuration schema.

use std::collections::HashSet;
use std::path::PathBuf;

use cmdroute_commands::matcher::{MatchOptions, DEFAULT_SINGLE_TOKEN_PARAMS};
use cmdroute_commands::registry::DEFAULT_CATEGORIES;
use serde::{Deserialize, Serialize};

/// Root configuration, read from `config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Base registry file (JSON interchange form)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    /// Extension registries merged over the base, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,

    /// Ordered context categories every registry must use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,

    /// Parameters that never span two query words
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_token_params: Option<Vec<String>>,

    /// Default matching mode for the CLI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzzy: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for daily-rotated JSON log files; console only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl EngineConfig {
    pub fn categories(&self) -> Vec<String> {
        match &self.categories {
            Some(categories) => categories.clone(),
            None => DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn registry_path(&self) -> Option<PathBuf> {
        self.registry.as_deref().map(PathBuf::from)
    }

    pub fn extension_paths(&self) -> Vec<PathBuf> {
        self.extensions.iter().map(PathBuf::from).collect()
    }

    /// Matcher options derived from this config.
    pub fn match_options(&self) -> MatchOptions {
        let single: HashSet<String> = match &self.single_token_params {
            Some(names) => names.iter().cloned().collect(),
            None => DEFAULT_SINGLE_TOKEN_PARAMS.iter().map(|s| s.to_string()).collect(),
        };
        MatchOptions::default()
            .fuzzy(self.fuzzy.unwrap_or(false))
            .with_single_token_params(single)
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or("info")
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.logging
            .as_ref()
            .and_then(|l| l.dir.as_deref())
            .map(PathBuf::from)
    }
}
