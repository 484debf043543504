//! Well-known tag keys shared by producers and the span mapper.
//!
//! Producers may attach arbitrary fields to a captured span, but only keys
//! carrying the `spyglass.` prefix survive mapping; everything else is
//! treated as unrelated instrumentation noise.

/// Tracing target that marks a span for capture.
pub const SOURCE_NAME: &str = "spyglass";

/// Only tag keys starting with this prefix are retained by the mapper.
pub const PREFIX: &str = "spyglass.";

/// Producer-declared span role; lifted out of the tag map into `SpanRecord::kind`.
pub const KIND: &str = "spyglass.kind";

pub const CATEGORY: &str = "spyglass.category";
pub const METHOD: &str = "spyglass.method";
pub const URL: &str = "spyglass.url";
pub const STATUS: &str = "spyglass.status";
pub const REQUEST_BODY: &str = "spyglass.request_body";
pub const RESPONSE_BODY: &str = "spyglass.response_body";
pub const ERROR: &str = "spyglass.error";
