/// Candidate search: run the matcher against every registered template and
/// keep the best-scoring matches.
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::matcher::{best_alignment, MatchOptions, Query, SegmentSpan, EXACT_SCORE};
use crate::registry::{Registry, RegistryEntry};
use crate::types::{Context, Template};

/// A template that matched the query, with its bound arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub template: Template,
    pub arguments: BTreeMap<String, String>,
    pub score: u32,
    pub spans: Vec<SegmentSpan>,
}

impl Candidate {
    fn exact(template: &Template) -> Self {
        let segments = template.segments().len();
        Self {
            template: template.clone(),
            arguments: BTreeMap::new(),
            score: EXACT_SCORE * segments as u32,
            spans: (0..segments)
                .map(|i| SegmentSpan { segment: i, start: i, end: i + 1 })
                .collect(),
        }
    }
}

/// Result of a search pass.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    /// Tied best candidates with a reachable handler, in registration order.
    pub candidates: Vec<Candidate>,
    /// Tied best candidates that matched but had no handler for the context.
    pub unsupported: Vec<Candidate>,
    /// True when the exact-text shortcut produced the result.
    pub exact: bool,
}

/// Keeps the running set of maximal-score candidates.
#[derive(Default)]
struct TopSet {
    best: Option<u32>,
    items: Vec<Candidate>,
}

impl TopSet {
    fn offer(&mut self, candidate: Candidate) {
        match self.best {
            Some(best) if candidate.score < best => {}
            Some(best) if candidate.score == best => self.items.push(candidate),
            _ => {
                self.best = Some(candidate.score);
                self.items = vec![candidate];
            }
        }
    }
}

/// Search `registry` for templates matching `query`.
///
/// When `context` is given, templates with no reachable handler never
/// displace reachable ones; they are reported separately in
/// [`SearchOutcome::unsupported`].
pub fn search(
    registry: &Registry,
    query: &str,
    context: Option<&Context>,
    options: &MatchOptions,
) -> SearchOutcome {
    if let Some(entry) = exact_entry(registry, query, context) {
        debug!("[Search] Exact match for '{}'", entry.template());
        return SearchOutcome {
            candidates: vec![Candidate::exact(entry.template())],
            unsupported: Vec::new(),
            exact: true,
        };
    }

    let query = Query::parse(query, options.fuzzy);
    if query.is_empty() {
        return SearchOutcome::default();
    }

    let mut supported = TopSet::default();
    let mut unsupported = TopSet::default();
    for entry in registry.entries() {
        let Some(alignment) = best_alignment(entry.template(), &query, options) else {
            continue;
        };
        let candidate = Candidate {
            template: entry.template().clone(),
            arguments: alignment.arguments,
            score: alignment.score,
            spans: alignment.spans,
        };
        let reachable = match context {
            Some(ctx) => registry.lookup(entry, ctx).is_some(),
            None => !entry.is_dangling(),
        };
        if reachable {
            supported.offer(candidate);
        } else {
            unsupported.offer(candidate);
        }
    }

    debug!(
        "[Search] '{}' → {} candidate(s) at score {:?}",
        query.text(),
        supported.items.len(),
        supported.best
    );
    SearchOutcome {
        candidates: supported.items,
        unsupported: unsupported.items,
        exact: false,
    }
}

/// A zero-parameter template whose text equals the query.
fn exact_entry<'r>(
    registry: &'r Registry,
    query: &str,
    context: Option<&Context>,
) -> Option<&'r RegistryEntry> {
    let entry = registry.entry(query)?;
    if entry.template().has_parameters() {
        return None;
    }
    let reachable = match context {
        Some(ctx) => registry.lookup(entry, ctx).is_some(),
        None => !entry.is_dangling(),
    };
    reachable.then_some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContextKey;

    fn registry(templates: &[&str]) -> Registry {
        let mut reg = Registry::new(["os"]);
        for (i, t) in templates.iter().enumerate() {
            reg.register(t, &ContextKey::path(&["*"]), format!("handler{i}")).unwrap();
        }
        reg
    }

    fn names(outcome: &SearchOutcome) -> Vec<&str> {
        outcome.candidates.iter().map(|c| c.template.as_str()).collect()
    }

    #[test]
    fn keeps_only_the_best_score() {
        let reg = registry(&["show ip route {route}", "show ip route vrf {vrf}", "show ip {what} {more}"]);
        let outcome = search(&reg, "show ip route vrf Blue", None, &MatchOptions::default());
        assert_eq!(names(&outcome), ["show ip route vrf {vrf}"]);
        assert_eq!(outcome.candidates[0].arguments["vrf"], "Blue");
    }

    #[test]
    fn later_higher_score_discards_earlier_ties() {
        let reg = registry(&["show {a} {b}", "show {c} {d}", "show x {e}"]);
        let outcome = search(&reg, "show x y", None, &MatchOptions::default());
        assert_eq!(names(&outcome), ["show x {e}"]);
    }

    #[test]
    fn ties_are_kept_in_order() {
        let reg = registry(&["show x {a}", "show x {b}"]);
        let outcome = search(&reg, "show x foo", None, &MatchOptions::default());
        assert_eq!(names(&outcome), ["show x {a}", "show x {b}"]);
    }

    #[test]
    fn exact_text_short_circuits() {
        let reg = registry(&["show version", "show versio.*"]);
        let outcome = search(&reg, "show  version", None, &MatchOptions::default().fuzzy(true));
        assert!(outcome.exact);
        assert_eq!(names(&outcome), ["show version"]);
    }

    #[test]
    fn exact_text_ignores_parameterized_templates() {
        let reg = registry(&["show vlan {id}"]);
        let outcome = search(&reg, "show vlan {id}", None, &MatchOptions::default());
        assert!(!outcome.exact);
        assert_eq!(outcome.candidates[0].arguments["id"], "{id}");
    }

    #[test]
    fn unreachable_templates_do_not_displace_reachable_ones() {
        let mut reg = Registry::new(["os"]);
        reg.register("show vlan brief", &ContextKey::path(&["nxos"]), "nxos.ShowVlanBrief").unwrap();
        reg.register("show vlan {id}", &ContextKey::path(&["iosxe"]), "iosxe.ShowVlanId").unwrap();
        let ctx = Context::new().with("os", "iosxe");
        let outcome = search(&reg, "show vlan brief", Some(&ctx), &MatchOptions::default());
        assert_eq!(names(&outcome), ["show vlan {id}"]);
        assert_eq!(outcome.unsupported[0].template.as_str(), "show vlan brief");
    }

    #[test]
    fn empty_query_matches_nothing() {
        let reg = registry(&["show version"]);
        let outcome = search(&reg, "   ", None, &MatchOptions::default());
        assert!(outcome.candidates.is_empty());
    }

    #[test]
    fn search_is_deterministic() {
        let reg = registry(&["show {a} {b}", "show interface {name}", "show interface {name} {detail}"]);
        let first = search(&reg, "show interface Gi1 brief", None, &MatchOptions::default());
        let second = search(&reg, "show interface Gi1 brief", None, &MatchOptions::default());
        assert_eq!(first.candidates, second.candidates);
    }
}
