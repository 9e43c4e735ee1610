/// Template registry: templates partitioned by an ordered list of context
/// categories, with a wildcard entry allowed at every level.
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::error::RegistryError;
use crate::types::{display_path, ContextKey, HandlerRef, Template};

/// Category order used when none is configured.
pub const DEFAULT_CATEGORIES: &[&str] = &["os", "platform", "model", "submodel", "revision"];

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// One level of the per-template context tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryNode {
    Branch(BTreeMap<ContextKey, RegistryNode>),
    Handler(HandlerRef),
}

impl RegistryNode {
    fn empty() -> Self {
        RegistryNode::Branch(BTreeMap::new())
    }

    fn is_empty(&self) -> bool {
        matches!(self, RegistryNode::Branch(children) if children.is_empty())
    }

    /// Number of handler leaves below this node.
    pub fn handler_count(&self) -> usize {
        match self {
            RegistryNode::Handler(_) => 1,
            RegistryNode::Branch(children) => children.values().map(Self::handler_count).sum(),
        }
    }
}

/// Outcome of writing one handler leaf.
enum Placed {
    New,
    Replaced,
}

fn place(
    node: &mut RegistryNode,
    path: &[ContextKey],
    handler: HandlerRef,
    overwrite: bool,
) -> Option<Placed> {
    match path.split_first() {
        None => {
            if node.is_empty() {
                *node = RegistryNode::Handler(handler);
                return Some(Placed::New);
            }
            match node {
                RegistryNode::Handler(existing) if overwrite => {
                    *existing = handler;
                    Some(Placed::Replaced)
                }
                _ => None,
            }
        }
        Some((key, rest)) => match node {
            RegistryNode::Branch(children) => {
                let child = children.entry(key.clone()).or_insert_with(RegistryNode::empty);
                place(child, rest, handler, overwrite)
            }
            RegistryNode::Handler(_) => None,
        },
    }
}

fn take(node: &mut RegistryNode, path: &[ContextKey]) -> Option<HandlerRef> {
    match path.split_first() {
        None => match std::mem::replace(node, RegistryNode::empty()) {
            RegistryNode::Handler(handler) => Some(handler),
            other => {
                *node = other;
                None
            }
        },
        Some((key, rest)) => {
            let RegistryNode::Branch(children) = node else {
                return None;
            };
            let child = children.get_mut(key)?;
            let removed = take(child, rest);
            if child.is_empty() {
                children.remove(key);
            }
            removed
        }
    }
}

/// Visit every `(path, handler)` leaf below `node`.
fn leaves<'a>(
    node: &'a RegistryNode,
    path: &mut Vec<ContextKey>,
    visit: &mut dyn FnMut(&[ContextKey], &'a HandlerRef),
) {
    match node {
        RegistryNode::Handler(handler) => visit(path, handler),
        RegistryNode::Branch(children) => {
            for (key, child) in children {
                path.push(key.clone());
                leaves(child, path, visit);
                path.pop();
            }
        }
    }
}

/// Collect paths of value branches identical to their wildcard sibling.
fn shadowed(node: &RegistryNode, path: &mut Vec<ContextKey>, out: &mut Vec<Vec<ContextKey>>) {
    let RegistryNode::Branch(children) = node else {
        return;
    };
    let wildcard = children.get(&ContextKey::Wildcard);
    for (key, child) in children {
        path.push(key.clone());
        if *key != ContextKey::Wildcard && wildcard == Some(child) {
            out.push(path.clone());
        } else {
            shadowed(child, path, out);
        }
        path.pop();
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A template together with its context tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    template: Template,
    root: RegistryNode,
}

impl RegistryEntry {
    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn root(&self) -> &RegistryNode {
        &self.root
    }

    /// True when no handler is registered at any depth.
    pub fn is_dangling(&self) -> bool {
        self.root.handler_count() == 0
    }
}

/// Counts reported by [`Registry::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub templates_added: usize,
    pub handlers_added: usize,
    pub handlers_replaced: usize,
}

impl fmt::Display for MergeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} new templates, {} new handlers, {} replaced handlers",
            self.templates_added, self.handlers_added, self.handlers_replaced
        )
    }
}

/// A value branch that repeats the handlers of its wildcard sibling, so the
/// registration adds nothing over the wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Duplicate {
    pub template: String,
    pub path: String,
}

/// Ordered template store. Iteration follows registration order.
#[derive(Debug, Clone)]
pub struct Registry {
    categories: Vec<String>,
    entries: Vec<RegistryEntry>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        self.entries.iter().map(|e| &e.template)
    }

    pub fn handler_count(&self) -> usize {
        self.entries.iter().map(|e| e.root.handler_count()).sum()
    }

    /// Look up a template by its text; spacing differences are ignored.
    pub fn entry(&self, template: &str) -> Option<&RegistryEntry> {
        let key = template.split_whitespace().collect::<Vec<_>>().join(" ");
        self.index.get(&key).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, template: &str) -> bool {
        self.entry(template).is_some()
    }

    /// Redundant registrations, in template order.
    pub fn duplicates(&self) -> Vec<Duplicate> {
        let mut found = Vec::new();
        for entry in &self.entries {
            let mut paths = Vec::new();
            shadowed(&entry.root, &mut Vec::new(), &mut paths);
            found.extend(paths.into_iter().map(|path| Duplicate {
                template: entry.template.to_string(),
                path: display_path(&path),
            }));
        }
        found
    }

    /// Register `handler` for `template` at a full context path (one key per
    /// category, `ContextKey::Wildcard` allowed anywhere).
    pub fn register(
        &mut self,
        template: &str,
        path: &[ContextKey],
        handler: impl Into<HandlerRef>,
    ) -> Result<(), RegistryError> {
        let template = Template::parse(template)?;
        self.insert(template, path, handler.into(), false).map(|_| ())
    }

    /// Remove the handler at `path`. Branches left empty are pruned, and the
    /// template is dropped once nothing remains below it.
    pub fn remove(&mut self, template: &str, path: &[ContextKey]) -> Option<HandlerRef> {
        let key = template.split_whitespace().collect::<Vec<_>>().join(" ");
        let position = *self.index.get(&key)?;
        let removed = take(&mut self.entries[position].root, path);
        if self.entries[position].root.is_empty() {
            self.entries.remove(position);
            self.reindex();
        }
        removed
    }

    /// Fold another registry into this one. Handlers from `other` replace
    /// handlers at identical paths.
    pub fn merge(&mut self, other: Registry) -> Result<MergeSummary, RegistryError> {
        if other.categories != self.categories {
            return Err(RegistryError::CategoryMismatch {
                expected: self.categories.clone(),
                found: other.categories,
            });
        }
        let mut summary = MergeSummary::default();
        for entry in other.entries {
            if !self.index.contains_key(entry.template.as_str()) {
                summary.templates_added += 1;
            }
            let mut placed = Vec::new();
            leaves(&entry.root, &mut Vec::new(), &mut |path, handler| {
                placed.push((path.to_vec(), handler.clone()));
            });
            if placed.is_empty() {
                self.ensure_entry(entry.template.clone());
            }
            for (path, handler) in placed {
                match self.insert(entry.template.clone(), &path, handler, true)? {
                    Placed::New => summary.handlers_added += 1,
                    Placed::Replaced => summary.handlers_replaced += 1,
                }
            }
        }
        info!("[Registry] Merged registry: {}", summary);
        Ok(summary)
    }

    /// Add a template with no handlers yet (a dangling entry).
    pub(crate) fn ensure_entry(&mut self, template: Template) -> &mut RegistryEntry {
        let existing = self.index.get(template.as_str()).copied();
        let position = match existing {
            Some(position) => position,
            None => {
                self.index.insert(template.as_str().to_string(), self.entries.len());
                self.entries.push(RegistryEntry {
                    template,
                    root: RegistryNode::empty(),
                });
                self.entries.len() - 1
            }
        };
        &mut self.entries[position]
    }

    fn insert(
        &mut self,
        template: Template,
        path: &[ContextKey],
        handler: HandlerRef,
        overwrite: bool,
    ) -> Result<Placed, RegistryError> {
        if path.len() != self.categories.len() {
            return Err(RegistryError::PathLength {
                template: template.to_string(),
                expected: self.categories.len(),
                found: path.len(),
            });
        }
        let name = template.to_string();
        let entry = self.ensure_entry(template);
        place(&mut entry.root, path, handler, overwrite).ok_or_else(|| {
            RegistryError::DuplicateHandler {
                template: name,
                path: display_path(path),
            }
        })
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.template.as_str().to_string(), i))
            .collect();
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORIES.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new(["os", "platform"])
    }

    #[test]
    fn registers_in_order() {
        let mut reg = registry();
        reg.register("show version", &ContextKey::path(&["iosxe", "*"]), "iosxe.ShowVersion").unwrap();
        reg.register("show clock", &ContextKey::path(&["*", "*"]), "generic.ShowClock").unwrap();
        reg.register("show version", &ContextKey::path(&["nxos", "*"]), "nxos.ShowVersion").unwrap();
        let names: Vec<_> = reg.templates().map(Template::as_str).collect();
        assert_eq!(names, ["show version", "show clock"]);
        assert_eq!(reg.handler_count(), 3);
        assert!(reg.contains("show   version"));
    }

    #[test]
    fn rejects_wrong_path_length() {
        let mut reg = registry();
        let err = reg
            .register("show version", &ContextKey::path(&["iosxe"]), "x")
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::PathLength {
                template: "show version".into(),
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn rejects_duplicate_handler() {
        let mut reg = registry();
        let path = ContextKey::path(&["iosxe", "*"]);
        reg.register("show version", &path, "a").unwrap();
        let err = reg.register("show  version", &path, "b").unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateHandler { .. }));
    }

    #[test]
    fn rejects_malformed_template() {
        let mut reg = registry();
        let err = reg
            .register("show {vrf", &ContextKey::path(&["*", "*"]), "x")
            .unwrap_err();
        assert!(matches!(err, RegistryError::Template(_)));
    }

    #[test]
    fn remove_prunes_empty_entries() {
        let mut reg = registry();
        reg.register("show version", &ContextKey::path(&["iosxe", "*"]), "a").unwrap();
        reg.register("show clock", &ContextKey::path(&["iosxe", "*"]), "b").unwrap();
        assert_eq!(
            reg.remove("show version", &ContextKey::path(&["nxos", "*"])),
            None
        );
        assert_eq!(
            reg.remove("show version", &ContextKey::path(&["iosxe", "*"])),
            Some(HandlerRef::new("a"))
        );
        assert!(!reg.contains("show version"));
        assert_eq!(reg.entry("show clock").unwrap().template().as_str(), "show clock");
    }

    #[test]
    fn merge_overrides_and_counts() {
        let mut base = registry();
        base.register("show version", &ContextKey::path(&["iosxe", "*"]), "base.ShowVersion").unwrap();

        let mut ext = registry();
        ext.register("show version", &ContextKey::path(&["iosxe", "*"]), "ext.ShowVersion").unwrap();
        ext.register("show version", &ContextKey::path(&["nxos", "*"]), "ext.NxShowVersion").unwrap();
        ext.register("show widgets", &ContextKey::path(&["*", "*"]), "ext.ShowWidgets").unwrap();

        let summary = base.merge(ext).unwrap();
        assert_eq!(
            summary,
            MergeSummary {
                templates_added: 1,
                handlers_added: 2,
                handlers_replaced: 1
            }
        );
        assert_eq!(base.handler_count(), 3);
    }

    #[test]
    fn merge_rejects_category_mismatch() {
        let mut base = registry();
        let other = Registry::new(["os"]);
        assert!(matches!(
            base.merge(other),
            Err(RegistryError::CategoryMismatch { .. })
        ));
    }

    #[test]
    fn finds_branches_repeating_the_wildcard() {
        let mut reg = registry();
        reg.register("show version", &ContextKey::path(&["iosxe", "*"]), "Generic").unwrap();
        reg.register("show version", &ContextKey::path(&["*", "*"]), "Generic").unwrap();
        reg.register("show clock", &ContextKey::path(&["nxos", "n9k"]), "Clock").unwrap();
        reg.register("show clock", &ContextKey::path(&["nxos", "*"]), "Clock").unwrap();
        reg.register("show vlan", &ContextKey::path(&["nxos", "*"]), "NxVlan").unwrap();
        reg.register("show vlan", &ContextKey::path(&["*", "*"]), "Vlan").unwrap();

        assert_eq!(
            reg.duplicates(),
            [
                Duplicate {
                    template: "show version".into(),
                    path: "iosxe".into()
                },
                Duplicate {
                    template: "show clock".into(),
                    path: "nxos/n9k".into()
                },
            ]
        );
    }

    #[test]
    fn dangling_entry() {
        let mut reg = registry();
        reg.ensure_entry(Template::parse("show nothing").unwrap());
        assert!(reg.entry("show nothing").unwrap().is_dangling());
    }
}
