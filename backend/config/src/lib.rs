//! `cmdroute-config`: engine configuration for cmdroute.
//!
//! Provides:
//! - Typed config schema (registry paths, categories, matcher settings, logging)
//! - YAML loading from the config directory
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with errors and warnings

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{extension_paths_from_env, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config};
pub use schema::{EngineConfig, LoggingConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

/// Load, env-substitute, default and validate a config file.
///
/// This is the main entry point for loading a config at runtime.
pub fn load_and_prepare(path: &Path) -> Result<EngineConfig> {
    let raw = load_config(path)?;
    let env: HashMap<String, String> = std::env::vars().collect();
    let mut config = prepare(raw, &env)?;
    for extra in extension_paths_from_env() {
        let extra = extra.display().to_string();
        if !config.extensions.contains(&extra) {
            config.extensions.push(extra);
        }
    }
    check(&config)?;
    Ok(config)
}

/// Substitute env vars and apply defaults.
pub fn prepare(config: EngineConfig, env: &HashMap<String, String>) -> Result<EngineConfig> {
    let value: Value =
        serde_json::to_value(&config).context("Failed to serialize config for processing")?;
    let value = resolve_env_vars_with(&value, env).context("Failed to resolve env vars in config")?;
    let config: EngineConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;
    Ok(apply_all_defaults(config))
}

/// Log the validation report; fail when it holds errors.
pub fn check(config: &EngineConfig) -> Result<()> {
    let report = validate(config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        bail!("{}", report.errors[0]);
    }
    Ok(())
}
