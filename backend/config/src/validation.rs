//! Config validation: collects every problem in one pass.

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

use crate::schema::EngineConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &EngineConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_categories(config, &mut report);
    validate_single_token_params(config, &mut report);
    validate_registries(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_categories(config: &EngineConfig, report: &mut ValidationReport) {
    let Some(categories) = &config.categories else { return };
    if categories.is_empty() {
        report.error("categories", "At least one context category is required");
    }
    let mut seen = HashSet::new();
    for (i, category) in categories.iter().enumerate() {
        if category.trim().is_empty() {
            report.error(format!("categories[{i}]"), "Category name cannot be empty");
        } else if !seen.insert(category.as_str()) {
            report.error(format!("categories[{i}]"), format!("Duplicate category '{category}'"));
        }
    }
}

fn validate_single_token_params(config: &EngineConfig, report: &mut ValidationReport) {
    let Some(params) = &config.single_token_params else { return };
    for (i, name) in params.iter().enumerate() {
        if name.trim().is_empty() {
            report.error(format!("singleTokenParams[{i}]"), "Parameter name cannot be empty");
        }
    }
}

fn validate_registries(config: &EngineConfig, report: &mut ValidationReport) {
    match config.registry.as_deref() {
        None => report.warn("registry", "No registry configured; pass --registry to load one"),
        Some(path) if !Path::new(path).exists() => {
            report.error("registry", format!("Registry file not found: {path}"))
        }
        Some(_) => {}
    }
    for (i, path) in config.extensions.iter().enumerate() {
        if !Path::new(path).exists() {
            report.warn(
                format!("extensions[{i}]"),
                format!("Extension registry not found and will be skipped: {path}"),
            );
        }
    }
}

fn validate_logging(config: &EngineConfig, report: &mut ValidationReport) {
    let Some(level) = config.logging.as_ref().and_then(|l| l.level.as_deref()) else { return };
    if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        report.error(
            "logging.level",
            format!("Unknown log level '{level}'. Use one of: {}", LOG_LEVELS.join(", ")),
        );
    }
}
