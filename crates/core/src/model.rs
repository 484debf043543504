use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Normalized, immutable form of one completed unit of work.
///
/// Field names are the stable wire schema: every record crosses the event
/// stream and the snapshot endpoint as one JSON object with exactly these
/// PascalCase keys. `Duration` travels as the fixed `H:MM:SS.fffffff`
/// time-span string; viewers derive milliseconds from it themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "TraceId")]
    pub trace_id: String,
    #[serde(rename = "SpanId")]
    pub span_id: String,
    /// Empty for root spans. The referenced parent need not be retained
    /// anywhere; the relationship is advisory only.
    #[serde(rename = "ParentSpanId", default)]
    pub parent_span_id: String,
    #[serde(rename = "StartTimeUtc")]
    pub start_time_utc: DateTime<Utc>,
    #[serde(rename = "Duration", with = "crate::time::timespan")]
    pub duration: TimeDelta,
    #[serde(rename = "Kind")]
    pub kind: String,
    #[serde(rename = "Tags", default)]
    pub tags: HashMap<String, String>,
    #[serde(rename = "Events", default)]
    pub events: Vec<SpanEvent>,
}

/// Sub-record attached during a span's lifetime; rarely populated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanEvent {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "Tags", default)]
    pub tags: HashMap<String, String>,
}

impl SpanRecord {
    pub fn duration_ms(&self) -> i64 {
        self.duration.num_milliseconds().max(0)
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time_utc + self.duration.max(TimeDelta::zero())
    }

    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_empty()
    }
}
