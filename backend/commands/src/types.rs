/// Command template, context, and handler reference types.
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classify::{classify, TokenKind};
use crate::error::TemplateError;

/// Wildcard spelling for a context category value.
pub const WILDCARD: &str = "*";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^{}]*)\{([A-Za-z_][A-Za-z0-9_\-]*)\}([^{}]*)$").unwrap());

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

/// One whitespace-delimited piece of a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Literal(String),
    /// Whole-word placeholder: `{name}`.
    Parameter(String),
    /// Placeholder with literal text around it: `/api/interface/{name}`.
    Embedded {
        prefix: String,
        name: String,
        suffix: String,
    },
    /// Word containing regex metacharacters.
    Fuzzy(String),
}

impl Segment {
    fn parse(template: &str, token: &str) -> Result<Self, TemplateError> {
        if classify(token) != TokenKind::Parameter {
            if token.contains(['{', '}']) {
                return Err(malformed(template, token));
            }
            return Ok(match classify(token) {
                TokenKind::Fuzzy => Segment::Fuzzy(token.to_string()),
                _ => Segment::Literal(token.to_string()),
            });
        }
        let caps = PLACEHOLDER
            .captures(token)
            .ok_or_else(|| malformed(template, token))?;
        let (prefix, name, suffix) = (&caps[1], &caps[2], &caps[3]);
        if prefix.is_empty() && suffix.is_empty() {
            Ok(Segment::Parameter(name.to_string()))
        } else {
            Ok(Segment::Embedded {
                prefix: prefix.to_string(),
                name: name.to_string(),
                suffix: suffix.to_string(),
            })
        }
    }

    /// Parameter name, if this segment binds one.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Segment::Parameter(name) | Segment::Embedded { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_parameter(&self) -> bool {
        self.parameter().is_some()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(text) | Segment::Fuzzy(text) => f.write_str(text),
            Segment::Parameter(name) => write!(f, "{{{name}}}"),
            Segment::Embedded { prefix, name, suffix } => write!(f, "{prefix}{{{name}}}{suffix}"),
        }
    }
}

fn malformed(template: &str, token: &str) -> TemplateError {
    TemplateError::MalformedParameter {
        template: template.to_string(),
        token: token.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// A parameterized command pattern, e.g. `show interface {name} counters`.
///
/// The stored text is whitespace-normalized, so two spellings that differ only
/// in spacing are the same template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Template {
    text: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            return Err(TemplateError::Empty);
        }
        let segments = text
            .split(' ')
            .map(|token| Segment::parse(&text, token))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        for name in segments.iter().filter_map(Segment::parameter) {
            if !seen.insert(name) {
                return Err(TemplateError::DuplicateParameter {
                    template: text.clone(),
                    name: name.to_string(),
                });
            }
        }
        Ok(Self { text, segments })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(Segment::parameter)
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters().count()
    }

    pub fn has_parameters(&self) -> bool {
        self.segments.iter().any(Segment::is_parameter)
    }

    /// The template with every placeholder erased to `---`. Templates that
    /// differ only in parameter naming share a skeleton.
    pub fn skeleton(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Parameter(_) => "---".to_string(),
                Segment::Embedded { prefix, suffix, .. } => format!("{prefix}---{suffix}"),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Anchored regex source with literal text escaped and each placeholder
    /// replaced by `(.*)`.
    pub fn literal_pattern(&self) -> String {
        let body = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Parameter(_) => "(.*)".to_string(),
                Segment::Embedded { prefix, suffix, .. } => {
                    format!("{}(.*){}", regex::escape(prefix), regex::escape(suffix))
                }
                other => regex::escape(&other.to_string()),
            })
            .collect::<Vec<_>>()
            .join(" ");
        format!("^{body}$")
    }

    /// Substitute bound arguments back into the template. Unbound
    /// placeholders are left as written.
    pub fn render(&self, arguments: &BTreeMap<String, String>) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Parameter(name) => arguments
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| segment.to_string()),
                Segment::Embedded { prefix, name, suffix } => match arguments.get(name) {
                    Some(value) => format!("{prefix}{value}{suffix}"),
                    None => segment.to_string(),
                },
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl TryFrom<String> for Template {
    type Error = TemplateError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Template::parse(&raw)
    }
}

impl From<Template> for String {
    fn from(template: Template) -> Self {
        template.text
    }
}

// ---------------------------------------------------------------------------
// Handler reference
// ---------------------------------------------------------------------------

/// Opaque identifier of the external routine that handles a template.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerRef(String);

impl HandlerRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HandlerRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for HandlerRef {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// A key at one level of the registry tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContextKey {
    Value(String),
    Wildcard,
}

impl ContextKey {
    pub fn value(value: impl Into<String>) -> Self {
        ContextKey::Value(value.into())
    }

    /// `*` is the wildcard; anything else is a concrete value.
    pub fn parse(raw: &str) -> Self {
        if raw == WILDCARD {
            ContextKey::Wildcard
        } else {
            ContextKey::Value(raw.to_string())
        }
    }

    /// Parse a whole path, e.g. `["iosxe", "*", "c9300"]`.
    pub fn path<S: AsRef<str>>(raw: &[S]) -> Vec<ContextKey> {
        raw.iter().map(|s| ContextKey::parse(s.as_ref())).collect()
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextKey::Value(value) => f.write_str(value),
            ContextKey::Wildcard => f.write_str(WILDCARD),
        }
    }
}

/// Render a context path as `a/b/*`.
pub fn display_path(path: &[ContextKey]) -> String {
    if path.is_empty() {
        return "<root>".to_string();
    }
    path.iter().map(ToString::to_string).collect::<Vec<_>>().join("/")
}

/// Caller-supplied context: per category, acceptable values in priority order.
///
/// Categories absent from the context only match the wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    values: BTreeMap<String, Vec<String>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value for a category (after any already given).
    pub fn with(mut self, category: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(category, value);
        self
    }

    pub fn push(&mut self, category: impl Into<String>, value: impl Into<String>) {
        self.values
            .entry(category.into())
            .or_default()
            .push(value.into());
    }

    /// Values for a category, most preferred first.
    pub fn values(&self, category: &str) -> &[String] {
        self.values.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse `category=value` pairs, as given on a command line.
    pub fn from_pairs<S: AsRef<str>>(pairs: &[S]) -> Option<Self> {
        let mut context = Context::new();
        for pair in pairs {
            let (category, value) = pair.as_ref().split_once('=')?;
            let (category, value) = (category.trim(), value.trim());
            if category.is_empty() || value.is_empty() {
                return None;
            }
            context.push(category, value);
        }
        Some(context)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.values.is_empty() {
            return f.write_str("{}");
        }
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(category, values)| format!("{category}={}", values.join(",")))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
