//! Template matcher: aligns query tokens against template segments.
//!
//! The walk is a depth-first search over two cursors, one into the query
//! tokens and one into the template segments. Every branch owns its state, so
//! sibling alternatives (a parameter spanning one or two tokens, a regex window
//! covering a varying number of segments) never see each other's bindings.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::classify::{classify, TokenKind};
use crate::types::{Segment, Template};

/// Literal segment equal to the query token.
pub const EXACT_SCORE: u32 = 102;
/// Literal segment abbreviated by the query token (`sh` for `show`).
pub const PREFIX_SCORE: u32 = 100;
/// Whole-word parameter binding, independent of how many tokens it spans.
pub const PARAMETER_SCORE: u32 = 100;
/// Parameter embedded in a word with literal prefix/suffix.
pub const EMBEDDED_SCORE: u32 = 103;
/// Per query token consumed by a regex template segment.
pub const FUZZY_SEGMENT_SCORE: u32 = 50;

/// Parameters whose values never legitimately span two words.
pub const DEFAULT_SINGLE_TOKEN_PARAMS: &[&str] =
    &["vrf", "rd", "instance", "vrf_type", "feature", "fileA", "fileB"];

/// Escapes a fuzzy query may carry that are unescaped before tokenizing.
const FUZZY_UNESCAPES: &[(&str, &str)] = &[
    ("\\ ", " "),
    ("\\-", "-"),
    ("\\\"", "\""),
    ("\\,", ","),
    ("\\'", "'"),
    ("\\*", "*"),
    ("\\:", ":"),
    ("\\^", "^"),
    ("\\/", "/"),
    ("\\(", "("),
    ("\\)", ")"),
];

// ---------------------------------------------------------------------------
// Options and inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Enables prefix abbreviation and regex handling.
    pub fuzzy: bool,
    pub single_token_params: HashSet<String>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            fuzzy: false,
            single_token_params: DEFAULT_SINGLE_TOKEN_PARAMS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl MatchOptions {
    pub fn fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    pub fn with_single_token_params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.single_token_params = names.into_iter().map(Into::into).collect();
        self
    }
}

/// A query split into tokens, pre-processed for the chosen mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    tokens: Vec<String>,
}

impl Query {
    pub fn parse(input: &str, fuzzy: bool) -> Self {
        let cleaned = if fuzzy {
            unescape_fuzzy(input)
        } else {
            input.to_string()
        };
        let tokens: Vec<String> = cleaned.split_whitespace().map(str::to_string).collect();
        Self {
            text: tokens.join(" "),
            tokens,
        }
    }

    /// Tokens joined by single spaces.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

fn unescape_fuzzy(input: &str) -> String {
    let trimmed = input.trim_start_matches('^').trim_end_matches('$');
    FUZZY_UNESCAPES
        .iter()
        .fold(trimmed.to_string(), |acc, (from, to)| acc.replace(from, to))
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Query tokens `start..end` consumed starting at template segment `segment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentSpan {
    pub segment: usize,
    pub start: usize,
    pub end: usize,
}

/// One complete way of aligning a query against a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    pub arguments: BTreeMap<String, String>,
    pub score: u32,
    pub spans: Vec<SegmentSpan>,
}

/// All complete alignments of `query` against `template`, in discovery order.
pub fn align(template: &Template, query: &Query, options: &MatchOptions) -> Vec<Alignment> {
    let aligner = Aligner::new(template, query, options);
    let mut found = Vec::new();
    aligner.walk(Branch::default(), &mut found);
    found
}

/// The highest-scoring alignment; the first one found wins ties.
pub fn best_alignment(
    template: &Template,
    query: &Query,
    options: &MatchOptions,
) -> Option<Alignment> {
    align(template, query, options)
        .into_iter()
        .fold(None, |best: Option<Alignment>, next| match best {
            Some(b) if b.score >= next.score => Some(b),
            _ => Some(next),
        })
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct Branch {
    token: usize,
    segment: usize,
    score: u32,
    arguments: BTreeMap<String, String>,
    /// Regex source reproducing the template text consumed so far.
    echo: String,
    spans: Vec<SegmentSpan>,
}

impl Branch {
    fn advance(mut self, tokens: usize, segments: usize, echo: &str, score: u32) -> Self {
        self.spans.push(SegmentSpan {
            segment: self.segment,
            start: self.token,
            end: self.token + tokens,
        });
        if !self.echo.is_empty() {
            self.echo.push(' ');
        }
        self.echo.push_str(echo);
        self.token += tokens;
        self.segment += segments;
        self.score += score;
        self
    }
}

struct Aligner<'a> {
    template: &'a Template,
    options: &'a MatchOptions,
    /// Query tokens as typed (regex source for fuzzy tokens).
    raw: &'a [String],
    /// Query tokens as compared against literal text.
    texts: Vec<String>,
    kinds: Vec<TokenKind>,
    /// Template text the regex windows are matched against.
    rendered: &'a str,
    /// Byte offset in `rendered` where each segment ends.
    segment_ends: Vec<usize>,
}

impl<'a> Aligner<'a> {
    fn new(template: &'a Template, query: &'a Query, options: &'a MatchOptions) -> Self {
        let kinds = query
            .tokens()
            .iter()
            .map(|token| match classify(token) {
                TokenKind::Fuzzy if options.fuzzy => TokenKind::Fuzzy,
                _ => TokenKind::Literal,
            })
            .collect();
        let texts = query
            .tokens()
            .iter()
            .map(|token| {
                if options.fuzzy {
                    token.replace("\\|", "|").replace("\\.", ".")
                } else {
                    token.clone()
                }
            })
            .collect();
        let mut segment_ends = Vec::with_capacity(template.segments().len());
        let mut offset = 0;
        for segment in template.segments() {
            offset += segment.to_string().len();
            segment_ends.push(offset);
            offset += 1;
        }
        Self {
            template,
            options,
            raw: query.tokens(),
            texts,
            kinds,
            rendered: template.as_str(),
            segment_ends,
        }
    }

    fn walk(&self, branch: Branch, found: &mut Vec<Alignment>) {
        let segments = self.template.segments();
        if branch.token == self.raw.len() {
            if branch.segment == segments.len() {
                self.accept(branch, found);
            }
            return;
        }
        let Some(segment) = segments.get(branch.segment) else {
            return;
        };
        if self.kinds[branch.token] == TokenKind::Fuzzy {
            // `|` in the query lines up with `|` in the template before any
            // regex reading of it.
            if let Segment::Fuzzy(pattern) = segment {
                if self.texts[branch.token] == *pattern {
                    let echo = regex::escape(pattern);
                    self.walk(branch.clone().advance(1, 1, &echo, EXACT_SCORE), found);
                }
            }
            self.walk_regex_window(branch, found);
            return;
        }

        let token = &self.texts[branch.token];
        match segment {
            Segment::Literal(word) => {
                let score = if token == word {
                    EXACT_SCORE
                } else if self.options.fuzzy && word.len() > token.len() && word.starts_with(token.as_str()) {
                    PREFIX_SCORE
                } else {
                    return;
                };
                self.walk(branch.advance(1, 1, &regex::escape(word), score), found);
            }
            Segment::Parameter(name) => self.walk_parameter(branch, name, found),
            Segment::Embedded { prefix, name, suffix } => {
                if token.len() <= prefix.len() + suffix.len()
                    || !token.starts_with(prefix.as_str())
                    || !token.ends_with(suffix.as_str())
                {
                    return;
                }
                let value = token[prefix.len()..token.len() - suffix.len()].to_string();
                let echo = regex::escape(&segment.to_string());
                let mut next = branch;
                next.arguments.entry(name.clone()).or_insert(value);
                self.walk(next.advance(1, 1, &echo, EMBEDDED_SCORE), found);
            }
            Segment::Fuzzy(pattern) => self.walk_fuzzy_segment(branch, pattern, found),
        }
    }

    fn accept(&self, branch: Branch, found: &mut Vec<Alignment>) {
        // Partial sub-bindings must not surface as matches.
        if branch.arguments.len() != self.template.parameter_count() {
            return;
        }
        found.push(Alignment {
            arguments: branch.arguments,
            score: branch.score,
            spans: branch.spans,
        });
    }

    /// A parameter takes one token, or two unless it is single-token only.
    fn walk_parameter(&self, branch: Branch, name: &str, found: &mut Vec<Alignment>) {
        let widest = if self.options.single_token_params.contains(name) {
            1
        } else {
            2
        };
        let echo = regex::escape(&format!("{{{name}}}"));
        for width in 1..=widest {
            let end = branch.token + width;
            if end > self.raw.len() {
                break;
            }
            // Regex fragments are never swallowed into an argument value.
            if self.kinds[branch.token..end].contains(&TokenKind::Fuzzy) {
                break;
            }
            let mut next = branch.clone();
            next.arguments
                .entry(name.to_string())
                .or_insert_with(|| self.argument_value(branch.token, end));
            self.walk(next.advance(width, 1, &echo, PARAMETER_SCORE), found);
        }
    }

    fn argument_value(&self, start: usize, end: usize) -> String {
        let mut value = self.raw[start..end].join(" ");
        if self.options.fuzzy {
            value.retain(|c| c != '\\');
        }
        strip_quotes(&value).to_string()
    }

    /// A regex segment in the template: matched verbatim in any mode, or as
    /// an anchored regex over a window of query tokens in fuzzy mode.
    fn walk_fuzzy_segment(&self, branch: Branch, pattern: &str, found: &mut Vec<Alignment>) {
        let echo = regex::escape(pattern);
        if self.texts[branch.token] == pattern {
            self.walk(branch.clone().advance(1, 1, &echo, EXACT_SCORE), found);
        }
        if !self.options.fuzzy {
            return;
        }
        let Ok(re) = Regex::new(&format!("^(?:{pattern})$")) else {
            debug!("[Matcher] Template segment '{}' is not a valid regex", pattern);
            return;
        };
        let available = self.raw.len() - branch.token;
        for width in (1..=available).rev() {
            let end = branch.token + width;
            if self.kinds[branch.token..end].contains(&TokenKind::Fuzzy) {
                continue;
            }
            let window = self.texts[branch.token..end].join(" ");
            if width == 1 && window == pattern {
                continue;
            }
            if re.is_match(&window) {
                let score = FUZZY_SEGMENT_SCORE * width as u32;
                self.walk(branch.clone().advance(width, 1, &echo, score), found);
            }
        }
    }

    /// Consecutive regex fragments in the query, matched against the template
    /// text from its start.
    fn walk_regex_window(&self, branch: Branch, found: &mut Vec<Alignment>) {
        let segments = self.template.segments();
        let start = branch.token;
        let mut last = start;
        while last + 1 < self.raw.len() && self.kinds[last + 1] == TokenKind::Fuzzy {
            last += 1;
        }
        let eaten = last - start + 1;
        let window = self.raw[start..=last].join(" ");
        let source = if branch.echo.is_empty() {
            window.clone()
        } else {
            format!("{} {}", branch.echo, window)
        };
        let re = match Regex::new(&format!("^(?:{source})")) {
            Ok(re) => re,
            Err(e) => {
                debug!("[Matcher] Query fragment '{}' is not a valid regex: {}", window, e);
                return;
            }
        };
        let Some(mut end) = re.find(self.rendered).map(|m| m.end()) else {
            return;
        };
        // A match stopping on the space after a segment ends with that segment.
        if end > 0 && self.segment_ends.contains(&(end - 1)) {
            end -= 1;
        }

        let next_token = last + 1;
        if next_token == self.raw.len() && end == self.rendered.len() {
            // The expression swallows the rest of the template.
            if segments[branch.segment..].iter().all(|s| !s.is_parameter()) {
                let remaining = segments.len() - branch.segment;
                self.accept(branch.advance(eaten, remaining, &window, 0), found);
            }
            return;
        }

        let covered = match branch.segment {
            0 => 0,
            n => self.segment_ends[n - 1],
        };
        if end <= covered {
            return;
        }
        let Some(reached) =
            (branch.segment..segments.len()).find(|&k| self.segment_ends[k] >= end)
        else {
            return;
        };
        let upper = if self.segment_ends[reached] == end {
            reached + 1
        } else {
            reached
        };
        for next_segment in (branch.segment + eaten)..=upper.min(segments.len()) {
            if segments[branch.segment..next_segment]
                .iter()
                .any(Segment::is_parameter)
            {
                break;
            }
            let consumed = next_segment - branch.segment;
            self.walk(branch.clone().advance(eaten, consumed, &window, 0), found);
        }
    }
}

/// Remove one pair of matching surrounding quotes.
fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(raw: &str) -> Template {
        Template::parse(raw).unwrap()
    }

    fn best(raw: &str, query: &str, fuzzy: bool) -> Option<Alignment> {
        let options = MatchOptions::default().fuzzy(fuzzy);
        best_alignment(&template(raw), &Query::parse(query, fuzzy), &options)
    }

    fn args(alignment: &Alignment) -> Vec<(&str, &str)> {
        alignment
            .arguments
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn binds_single_token_parameter() {
        let found = best("show interface {name} counters", "show interface Gi1/0/1 counters", false).unwrap();
        assert_eq!(args(&found), [("name", "Gi1/0/1")]);
        assert_eq!(found.score, 3 * EXACT_SCORE + PARAMETER_SCORE);
    }

    #[test]
    fn single_token_parameter_cannot_absorb_extra_words() {
        assert!(best("show vrf {vrf} detail", "show vrf Blue Detail extra detail", false).is_none());
        assert!(best("show vrf {vrf} detail", "show vrf Blue extra detail", false).is_none());
        assert!(best("show vrf {vrf} detail", "show vrf Blue detail", false).is_some());
    }

    #[test]
    fn parameter_spans_two_tokens() {
        let found = best("show run | include {pattern}", "show run | include \"ip address\"", false).unwrap();
        assert_eq!(args(&found), [("pattern", "ip address")]);
        assert!(best("show run | include {pattern}", "show run | include a b c", false).is_none());
    }

    #[test]
    fn multiple_alignments_are_all_reported() {
        let t = template("show {a} {b}");
        let q = Query::parse("show x y z", false);
        let all = align(&t, &q, &MatchOptions::default());
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|a| a.arguments.len() == 2));
    }

    #[test]
    fn literal_prefix_only_in_fuzzy_mode() {
        assert!(best("show version", "sh ver", false).is_none());
        let found = best("show version", "sh ver", true).unwrap();
        assert_eq!(found.score, 2 * PREFIX_SCORE);
        let exact = best("show version", "show version", true).unwrap();
        assert!(exact.score > found.score);
    }

    #[test]
    fn embedded_parameter() {
        let found = best(
            "/dna/intent/api/v1/interface/{interface}",
            "/dna/intent/api/v1/interface/abc-123",
            false,
        )
        .unwrap();
        assert_eq!(args(&found), [("interface", "abc-123")]);
        assert_eq!(found.score, EMBEDDED_SCORE);
        assert!(best("/api/{id}/detail", "/api//detail", false).is_none());
    }

    #[test]
    fn regex_fragment_matches_single_segment() {
        let found = best("show ip route vrf {vrf}", "show i. route vrf Blue", true).unwrap();
        assert_eq!(args(&found), [("vrf", "Blue")]);
        assert_eq!(found.score, 3 * EXACT_SCORE + PARAMETER_SCORE);
    }

    #[test]
    fn regex_fragment_swallows_tail() {
        let found = best("show lldp neighbors detail", "show lldp .*", true).unwrap();
        assert_eq!(found.spans.last().unwrap().segment, 2);
        // A tail with an unbound parameter is not a match.
        assert!(best("show lldp neighbors {interface}", "show lldp .*", true).is_none());
    }

    #[test]
    fn regex_fragment_spanning_segments() {
        let found = best("show ip bgp summary", "show ip.* summary", true).unwrap();
        assert_eq!(found.spans.len(), 3);
        assert_eq!(found.spans[1], SegmentSpan { segment: 1, start: 1, end: 2 });
        assert_eq!(found.spans[2].segment, 3);
    }

    #[test]
    fn regex_fragments_are_not_argument_values() {
        assert!(best("show interface {name}", "show interface Gi.*", true).is_none());
    }

    #[test]
    fn regex_ignored_without_fuzzy() {
        assert!(best("show lldp neighbors detail", "show lldp .*", false).is_none());
    }

    #[test]
    fn invalid_regex_is_a_dead_end() {
        assert!(best("show version", "show [version", true).is_none());
    }

    #[test]
    fn fuzzy_template_segment() {
        // Verbatim text matches in both modes.
        assert!(best("show run | section {name}", "show run | section bgp", false).is_some());
        let regexy = template("show interface Gi[0-9]+");
        let options = MatchOptions::default();
        let q = Query::parse("show interface Gi12", false);
        assert!(best_alignment(&regexy, &q, &options).is_none());
        let found = best_alignment(&regexy, &Query::parse("show interface Gi12", true), &options.fuzzy(true)).unwrap();
        assert_eq!(found.score, 2 * EXACT_SCORE + FUZZY_SEGMENT_SCORE);
    }

    #[test]
    fn pipe_in_query_matches_pipe_segment() {
        let literal = best("show run | include {pattern}", "show run | include foo", false).unwrap();
        let fuzzy = best("show run | include {pattern}", "show run | include foo", true).unwrap();
        assert_eq!(args(&fuzzy), [("pattern", "foo")]);
        assert_eq!(fuzzy.score, 4 * EXACT_SCORE + PARAMETER_SCORE);
        assert_eq!(fuzzy.score, literal.score);
    }

    #[test]
    fn zero_width_regex_window_is_a_dead_end() {
        assert!(best("show version", "d? show version", true).is_none());
    }

    #[test]
    fn fuzzy_query_unescaping() {
        let q = Query::parse("^show\\ ip\\ route$", true);
        assert_eq!(q.tokens(), ["show", "ip", "route"]);
        let q = Query::parse("show run | include \\\"a b\\\"", true);
        assert_eq!(q.text(), "show run | include \"a b\"");
    }

    #[test]
    fn alignment_is_total() {
        let q = Query::parse("show ip route vrf Blue 10.0.0.0 255.0.0.0", false);
        let t = template("show ip route vrf {vrf} {route}");
        let alignments = align(&t, &q, &MatchOptions::default());
        assert!(!alignments.is_empty());
        for alignment in alignments {
            let mut rebuilt = Vec::new();
            let mut cursor = 0;
            for span in &alignment.spans {
                assert_eq!(span.start, cursor);
                rebuilt.extend_from_slice(&q.tokens()[span.start..span.end]);
                cursor = span.end;
            }
            assert_eq!(rebuilt, q.tokens());
        }
    }

    #[test]
    fn fuzzy_match_never_outscores_literal() {
        let literal = best("show ip route", "show ip route", true).unwrap();
        let fuzzy = best("show ip route", "show i.* route", true).unwrap();
        let prefix = best("show ip route", "show i route", true).unwrap();
        assert!(fuzzy.score <= literal.score);
        assert!(prefix.score <= literal.score);
    }

    #[test]
    fn strips_one_pair_of_quotes() {
        assert_eq!(strip_quotes("\"a b\""), "a b");
        assert_eq!(strip_quotes("'x'"), "x");
        assert_eq!(strip_quotes("\"x'"), "\"x'");
        assert_eq!(strip_quotes("\""), "\"");
    }
}
