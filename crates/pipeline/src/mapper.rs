use chrono::TimeDelta;
use spyglass_core::config::Config;
use spyglass_core::error::{Result, SpyglassError};
use spyglass_core::model::{SpanEvent, SpanRecord};
use spyglass_core::tags;

use crate::raw::RawSpan;

/// Converts raw spans into immutable span records.
///
/// Produces zero or one record per raw span: the framework's umbrella
/// whole-request span is dropped (the inbound producer already represents
/// the request, and keeping both would double-count every request), and only
/// tags under the reserved prefix survive.
pub struct SpanMapper {
    umbrella_span_name: String,
}

impl SpanMapper {
    pub fn new(cfg: &Config) -> Self {
        Self {
            umbrella_span_name: cfg.umbrella_span_name.clone(),
        }
    }

    pub fn map(&self, raw: RawSpan) -> Result<Option<SpanRecord>> {
        if raw.name == self.umbrella_span_name {
            return Ok(None);
        }
        if raw.trace_id.is_empty() || raw.span_id.is_empty() {
            return Err(SpyglassError::Parse(format!(
                "span \"{}\" is missing trace or span id",
                raw.name
            )));
        }

        let mut tags: std::collections::HashMap<String, String> = raw
            .fields
            .into_iter()
            .filter(|(key, _)| key.starts_with(tags::PREFIX))
            .collect();
        let kind = tags
            .remove(tags::KIND)
            .unwrap_or_else(|| "Internal".to_string());

        let events = raw
            .events
            .into_iter()
            .map(|event| SpanEvent {
                name: event.name,
                timestamp: event.timestamp,
                tags: event.tags,
            })
            .collect();

        Ok(Some(SpanRecord {
            name: raw.name,
            trace_id: raw.trace_id,
            span_id: raw.span_id,
            parent_span_id: raw.parent_span_id.unwrap_or_default(),
            start_time_utc: raw.start_time,
            duration: (raw.end_time - raw.start_time).max(TimeDelta::zero()),
            kind,
            tags,
            events,
        }))
    }
}
