use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Completed span as delivered by the span source, before mapping. Carries
/// every recorded field; the mapper decides what survives.
#[derive(Debug, Clone)]
pub struct RawSpan {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub fields: HashMap<String, String>,
    pub events: Vec<RawEvent>,
}

#[derive(Debug, Clone)]
pub struct RawEvent {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub tags: HashMap<String, String>,
}
