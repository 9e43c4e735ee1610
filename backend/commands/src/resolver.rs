//! Resolution entry point: query + context in, template + arguments + handler out.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ResolveError;
use crate::global;
use crate::matcher::{MatchOptions, Query};
use crate::registry::Registry;
use crate::search::{search, Candidate};
use crate::types::{Context, HandlerRef, Template};

/// A fully resolved command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub template: Template,
    pub arguments: BTreeMap<String, String>,
    pub handler: HandlerRef,
    pub score: u32,
}

impl Resolution {
    /// The concrete command: the template with its arguments filled in.
    pub fn command(&self) -> String {
        self.template.render(&self.arguments)
    }
}

/// Resolves queries against a frozen registry. Cheap to clone and safe to
/// share across threads.
#[derive(Debug, Clone)]
pub struct Resolver {
    registry: Arc<Registry>,
    options: MatchOptions,
}

impl Resolver {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            options: MatchOptions::default(),
        }
    }

    /// Replace the match options. The `fuzzy` flag passed per call wins over
    /// the one stored here.
    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolver over the process-wide registry, loading it from `path` on
    /// first use.
    pub fn from_global_or_load(path: &Path, categories: &[String]) -> Result<Self, ResolveError> {
        let registry = global::get_or_try_init(|| Registry::load(path, categories))?;
        Ok(Self::new(registry))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn options(&self, fuzzy: bool) -> MatchOptions {
        self.options.clone().fuzzy(fuzzy)
    }

    /// All tied best candidates, without ambiguity resolution.
    pub fn search(
        &self,
        query: &str,
        context: Option<&Context>,
        fuzzy: bool,
    ) -> Result<Vec<Candidate>, ResolveError> {
        let outcome = search(&self.registry, query, context, &self.options(fuzzy));
        if !outcome.candidates.is_empty() {
            return Ok(outcome.candidates);
        }
        Err(not_found(query, context, &outcome.unsupported))
    }

    /// Resolve `query` to exactly one template and its handler under `context`.
    pub fn resolve(&self, query: &str, context: &Context, fuzzy: bool) -> Result<Resolution, ResolveError> {
        let options = self.options(fuzzy);
        let outcome = search(&self.registry, query, Some(context), &options);
        if outcome.candidates.is_empty() {
            return Err(not_found(query, Some(context), &outcome.unsupported));
        }

        let text = Query::parse(query, fuzzy).text().to_string();
        let winner = self.disambiguate(&text, outcome.candidates, context)?;
        let handler = self.registry.dispatch(&winner.template, context)?.clone();
        info!(
            "[Resolver] '{}' → '{}' ({}) for {}",
            text, winner.template, handler, context
        );
        Ok(Resolution {
            template: winner.template,
            arguments: winner.arguments,
            handler,
            score: winner.score,
        })
    }

    /// Pick one of several tied candidates or report the tie.
    fn disambiguate(
        &self,
        query: &str,
        mut candidates: Vec<Candidate>,
        context: &Context,
    ) -> Result<Candidate, ResolveError> {
        if candidates.len() == 1 {
            return Ok(candidates.remove(0));
        }

        // A single template whose literal form reads as the query.
        let literal_hits: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                Regex::new(&c.template.literal_pattern())
                    .map(|re| re.is_match(query))
                    .unwrap_or(false)
            })
            .map(|(i, _)| i)
            .collect();
        if let [only] = literal_hits[..] {
            debug!("[Resolver] '{}' prefers literal form '{}'", query, candidates[only].template);
            return Ok(candidates.swap_remove(only));
        }

        // Same structure, same handler: naming differences only.
        let first = &candidates[0].template;
        let equivalent = candidates.iter().all(|c| {
            c.template.skeleton() == first.skeleton() && self.same_handler(first, &c.template, context)
        });
        if equivalent {
            return Ok(candidates.remove(0));
        }

        Err(ResolveError::Ambiguous {
            query: query.to_string(),
            candidates: candidates
                .iter()
                .map(|c| c.template.to_string())
                .collect(),
        })
    }
}

impl Resolver {
    /// With a context, both templates must dispatch to the same handler;
    /// without one, their whole handler trees must be equal.
    fn same_handler(&self, a: &Template, b: &Template, context: &Context) -> bool {
        if context.is_empty() {
            let root = |t: &Template| self.registry.entry(t.as_str()).map(|e| e.root());
            return root(a) == root(b);
        }
        match (self.registry.dispatch(a, context), self.registry.dispatch(b, context)) {
            (Ok(x), Ok(y)) => x == y,
            _ => false,
        }
    }
}

fn not_found(query: &str, context: Option<&Context>, unsupported: &[Candidate]) -> ResolveError {
    match (unsupported.first(), context) {
        (Some(candidate), Some(ctx)) => ResolveError::HandlerNotFound {
            template: candidate.template.to_string(),
            context: ctx.to_string(),
        },
        (Some(candidate), None) => ResolveError::HandlerNotFound {
            template: candidate.template.to_string(),
            context: Context::new().to_string(),
        },
        (None, _) => ResolveError::NoMatch {
            query: query.to_string(),
        },
    }
}
