/// Dispatch: walk a template's context tree to the most specific handler.
use tracing::debug;

use crate::error::ResolveError;
use crate::registry::{Registry, RegistryEntry, RegistryNode};
use crate::types::{Context, ContextKey, HandlerRef, Template};

impl Registry {
    /// Most specific handler for `template` under `context`.
    ///
    /// At each category level the context's values are tried in priority
    /// order, then the wildcard. The walk is depth first, so paths are tried
    /// from most to least specific and the first handler reached wins.
    pub fn dispatch(&self, template: &Template, context: &Context) -> Result<&HandlerRef, ResolveError> {
        self.entry(template.as_str())
            .and_then(|entry| self.lookup(entry, context))
            .ok_or_else(|| ResolveError::HandlerNotFound {
                template: template.to_string(),
                context: context.to_string(),
            })
    }

    /// True when `template` has a handler reachable under `context`.
    pub fn is_reachable(&self, template: &Template, context: &Context) -> bool {
        self.entry(template.as_str())
            .and_then(|entry| self.lookup(entry, context))
            .is_some()
    }

    pub(crate) fn lookup<'r>(&'r self, entry: &'r RegistryEntry, context: &Context) -> Option<&'r HandlerRef> {
        let found = walk(entry.root(), self.categories(), context);
        if found.is_none() {
            debug!("[Dispatch] No handler for '{}' under {}", entry.template(), context);
        }
        found
    }

    /// Zero-parameter templates runnable under `context`, in registration order.
    pub fn commands_for(&self, context: &Context) -> Vec<&str> {
        self.entries()
            .filter(|entry| !entry.template().has_parameters())
            .filter(|entry| walk(entry.root(), self.categories(), context).is_some())
            .map(|entry| entry.template().as_str())
            .collect()
    }
}

fn walk<'r>(node: &'r RegistryNode, categories: &[String], context: &Context) -> Option<&'r HandlerRef> {
    let children = match node {
        RegistryNode::Handler(handler) => return Some(handler),
        RegistryNode::Branch(children) => children,
    };
    let (category, rest) = categories.split_first()?;
    context
        .values(category)
        .iter()
        .map(|value| ContextKey::value(value.as_str()))
        .chain(std::iter::once(ContextKey::Wildcard))
        .filter_map(|key| children.get(&key))
        .find_map(|child| walk(child, rest, context))
}
