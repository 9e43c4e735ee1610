use std::path::PathBuf;

use thiserror::Error;

/// A command template string that cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template is empty")]
    Empty,

    #[error("malformed parameter '{token}' in template '{template}'")]
    MalformedParameter { template: String, token: String },

    #[error("parameter '{name}' appears more than once in template '{template}'")]
    DuplicateParameter { template: String, name: String },
}

/// Administrative registry failures (register / merge / global lifecycle).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("context path for '{template}' has {found} levels, expected {expected}")]
    PathLength {
        template: String,
        expected: usize,
        found: usize,
    },

    #[error("a handler is already registered for '{template}' at {path}")]
    DuplicateHandler { template: String, path: String },

    #[error("category order mismatch: expected {expected:?}, found {found:?}")]
    CategoryMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("command registry is already initialized")]
    AlreadyInitialized,

    #[error("command registry is not initialized")]
    Uninitialized,

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Interchange data that fails structural validation. Always fatal at load time.
#[derive(Debug, Error)]
pub enum RegistryLoadError {
    #[error("failed to read registry file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("registry is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("registry root must be a JSON object")]
    NotAnObject,

    #[error("registry has no 'tokens' category list")]
    MissingCategories,

    #[error("registry 'tokens' must be an array of strings")]
    InvalidCategories,

    #[error("loaded category order does not match expected order: {found:?} != {expected:?}")]
    CategoryMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("'{template}' at {path}: expected {expected}")]
    Structure {
        template: String,
        path: String,
        expected: &'static str,
    },

    #[error("template '{template}' is declared more than once")]
    DuplicateTemplate { template: String },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Outcome kinds of a resolution call that did not produce a handler.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no command template matches '{query}'")]
    NoMatch { query: String },

    #[error(
        "search for '{query}' is ambiguous, please be more specific; matched: {}",
        .candidates.join(" | ")
    )]
    Ambiguous {
        query: String,
        candidates: Vec<String>,
    },

    #[error("could not find a handler for '{template}' under {context}")]
    HandlerNotFound { template: String, context: String },

    #[error(transparent)]
    Registry(#[from] RegistryLoadError),
}
