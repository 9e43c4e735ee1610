//! Structured logging for cmdroute.
//!
//! Console output for interactive use and an optional rolling NDJSON file.

pub mod logger;

pub use logger::{build_filter, init_logger};
