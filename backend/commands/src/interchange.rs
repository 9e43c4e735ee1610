//! JSON interchange form of a [`Registry`].
//!
//! ```json
//! {
//!   "tokens": ["os", "platform"],
//!   "show version": { "iosxe": { "*": "iosxe.ShowVersion" } }
//! }
//! ```
//!
//! Templates are top-level keys, followed by one object level per category
//! (`"*"` is the wildcard) and a handler identifier string at the leaf.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::info;

use crate::error::RegistryLoadError;
use crate::registry::{Registry, RegistryNode};
use crate::types::{display_path, ContextKey, Template};

/// Sidecar key holding the ordered category list.
pub const TOKENS_KEY: &str = "tokens";

impl Registry {
    /// Load a registry file, requiring its category order to equal `expected`.
    pub fn load(path: &Path, expected: &[String]) -> Result<Self, RegistryLoadError> {
        let raw = fs::read_to_string(path).map_err(|source| RegistryLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json_str(&raw, expected)?;
        info!(
            "[Registry] Loaded {} templates ({} handlers) from {}",
            registry.len(),
            registry.handler_count(),
            path.display()
        );
        Ok(registry)
    }

    pub fn from_json_str(raw: &str, expected: &[String]) -> Result<Self, RegistryLoadError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_json_value(&value, expected)
    }

    pub fn from_json_value(value: &Value, expected: &[String]) -> Result<Self, RegistryLoadError> {
        let root = value.as_object().ok_or(RegistryLoadError::NotAnObject)?;
        let categories = read_categories(root)?;
        if categories != expected {
            return Err(RegistryLoadError::CategoryMismatch {
                expected: expected.to_vec(),
                found: categories,
            });
        }

        let mut registry = Registry::new(categories);
        let mut seen = HashSet::new();
        for (raw_template, tree) in root.iter().filter(|(key, _)| key.as_str() != TOKENS_KEY) {
            let template = Template::parse(raw_template)?;
            if !seen.insert(template.as_str().to_string()) {
                return Err(RegistryLoadError::DuplicateTemplate {
                    template: template.to_string(),
                });
            }
            let mut leaves = Vec::new();
            collect(&template, tree, registry.categories().len(), &mut Vec::new(), &mut leaves)?;
            registry.ensure_entry(template.clone());
            for (path, handler) in leaves {
                registry.register(template.as_str(), &path, handler)?;
            }
        }
        Ok(registry)
    }

    /// The interchange form of this registry, templates in registration order.
    pub fn to_json_value(&self) -> Value {
        let mut root = Map::new();
        root.insert(
            TOKENS_KEY.to_string(),
            Value::Array(self.categories().iter().cloned().map(Value::String).collect()),
        );
        for entry in self.entries() {
            root.insert(entry.template().to_string(), node_to_json(entry.root()));
        }
        Value::Object(root)
    }
}

fn read_categories(root: &Map<String, Value>) -> Result<Vec<String>, RegistryLoadError> {
    let tokens = root
        .get(TOKENS_KEY)
        .ok_or(RegistryLoadError::MissingCategories)?
        .as_array()
        .ok_or(RegistryLoadError::InvalidCategories)?;
    tokens
        .iter()
        .map(|t| t.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or(RegistryLoadError::InvalidCategories)
}

/// Gather `(path, handler)` leaves, checking that every leaf sits exactly
/// `depth` levels below the template.
fn collect(
    template: &Template,
    node: &Value,
    depth: usize,
    path: &mut Vec<ContextKey>,
    out: &mut Vec<(Vec<ContextKey>, String)>,
) -> Result<(), RegistryLoadError> {
    let structure = |path: &[ContextKey], expected| RegistryLoadError::Structure {
        template: template.to_string(),
        path: display_path(path),
        expected,
    };
    match node {
        Value::String(handler) if path.len() == depth => {
            out.push((path.clone(), handler.clone()));
            Ok(())
        }
        Value::Object(children) if path.len() < depth => {
            for (key, child) in children {
                path.push(ContextKey::parse(key));
                collect(template, child, depth, path, out)?;
                path.pop();
            }
            Ok(())
        }
        _ if path.len() == depth => Err(structure(path.as_slice(), "a handler identifier string")),
        _ => Err(structure(path.as_slice(), "an object keyed by context value")),
    }
}

fn node_to_json(node: &RegistryNode) -> Value {
    match node {
        RegistryNode::Handler(handler) => Value::String(handler.to_string()),
        RegistryNode::Branch(children) => Value::Object(
            children
                .iter()
                .map(|(key, child)| (key.to_string(), node_to_json(child)))
                .collect(),
        ),
    }
}
