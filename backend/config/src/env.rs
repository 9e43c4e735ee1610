//! Environment variable substitution for config values.
//!
//! Supports `${VAR_NAME}` syntax in string values, resolved at load time.
//! Only uppercase `[A-Z_][A-Z0-9_]*` variable names are matched.
//! `$${VAR}` escapes to a literal `${VAR}`.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

/// Extra extension registries, comma-separated.
pub const EXT_REGISTRIES_VAR: &str = "CMDROUTE_EXT_REGISTRIES";

/// A reference, optionally preceded by the `$` escape.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var pattern"));

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in a config value tree from the process
/// environment. Unset or empty variables are an error.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    Ok(substitute_value(value, env, "")?)
}

fn substitute_value(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }
    let mut missing = None;
    let replaced = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(value) if !value.is_empty() => value.clone(),
            _ => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(var_name) => Err(MissingEnvVarError {
            var_name,
            config_path: path.to_string(),
        }),
        None => Ok(replaced.into_owned()),
    }
}

/// Parse a comma-separated list of registry paths, skipping blanks.
pub fn parse_path_list(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Extension registries named by `CMDROUTE_EXT_REGISTRIES`.
pub fn extension_paths_from_env() -> Vec<PathBuf> {
    std::env::var(EXT_REGISTRIES_VAR)
        .map(|raw| parse_path_list(&raw))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_nested_values() {
        let v = json!({"registry": "${REG_DIR}/base.json", "extensions": ["${REG_DIR}/site.json"]});
        let result = resolve_env_vars_with(&v, &env(&[("REG_DIR", "/srv/cmdroute")])).unwrap();
        assert_eq!(result["registry"], "/srv/cmdroute/base.json");
        assert_eq!(result["extensions"][0], "/srv/cmdroute/site.json");
    }

    #[test]
    fn error_names_the_missing_var_and_path() {
        let v = json!({"logging": {"dir": "${LOG_HOME}"}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err().to_string();
        assert!(err.contains("LOG_HOME"));
        assert!(err.contains("logging.dir"));
    }

    #[test]
    fn escaped_reference_is_kept_literally() {
        let v = json!({"registry": "$${NOT_A_VAR}/x"});
        let result = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(result["registry"], "${NOT_A_VAR}/x");
    }

    #[test]
    fn lowercase_names_are_not_references() {
        let v = json!({"registry": "${home}/x", "fuzzy": true});
        let result = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(result, v);
    }

    #[test]
    fn parses_comma_separated_paths() {
        let paths = parse_path_list(" a.json, ,b.json ,");
        assert_eq!(paths, [PathBuf::from("a.json"), PathBuf::from("b.json")]);
        assert!(parse_path_list("").is_empty());
    }
}
