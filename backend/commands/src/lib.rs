//! Command-template resolution.
//!
//! A query such as `show ip route vrf Blue` is matched against a registry of
//! parameterized templates (`show ip route vrf {vrf}`), the best template is
//! chosen, its parameters are bound, and the handler registered for the
//! caller's context (`os`, `platform`, ...) is returned.

pub mod classify;
pub mod dispatch;
pub mod error;
pub mod global;
pub mod interchange;
pub mod matcher;
pub mod registry;
pub mod resolver;
pub mod search;
pub mod types;

pub use classify::{classify, TokenKind};
pub use error::{RegistryError, RegistryLoadError, ResolveError, TemplateError};
pub use interchange::TOKENS_KEY;
pub use matcher::{
    align, best_alignment, Alignment, MatchOptions, Query, SegmentSpan,
    DEFAULT_SINGLE_TOKEN_PARAMS,
};
pub use registry::{Duplicate, MergeSummary, Registry, RegistryEntry, RegistryNode, DEFAULT_CATEGORIES};
pub use resolver::{Resolution, Resolver};
pub use search::{search, Candidate, SearchOutcome};
pub use types::{Context, ContextKey, HandlerRef, Segment, Template, WILDCARD};

