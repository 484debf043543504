use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use spyglass_core::model::SpanRecord;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()
}

/// Span record starting `start_offset_ms` after [`base_time`], lasting
/// `duration_ms`. Pass an empty `parent` for a root span.
pub fn record(
    trace_id: &str,
    span_id: &str,
    parent: &str,
    start_offset_ms: i64,
    duration_ms: i64,
) -> SpanRecord {
    SpanRecord {
        name: "HttpIn".to_string(),
        trace_id: trace_id.to_string(),
        span_id: span_id.to_string(),
        parent_span_id: parent.to_string(),
        start_time_utc: base_time() + TimeDelta::milliseconds(start_offset_ms),
        duration: TimeDelta::milliseconds(duration_ms),
        kind: "Server".to_string(),
        tags: HashMap::from([
            ("spyglass.category".to_string(), "http".to_string()),
            ("spyglass.method".to_string(), "GET".to_string()),
        ]),
        events: vec![],
    }
}

/// Two-span parent/child trace useful for hierarchy assertions.
pub fn sample_trace(trace_id: &str) -> Vec<SpanRecord> {
    vec![
        record(trace_id, "root", "", 0, 1800),
        record(trace_id, "child", "root", 900, 700),
    ]
}
