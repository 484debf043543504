//! Span source subscription.
//!
//! A `tracing_subscriber` layer that watches spans emitted with the
//! configured source target, collects their recorded string fields and
//! events, and hands the completed span to the ingestion queue from
//! `on_close`. The callback runs synchronously on whatever context closed
//! the span, so the only work done here is a map update and a non-blocking
//! `offer`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use crate::queue::SpanQueue;
use crate::raw::{RawEvent, RawSpan};

/// Span ids must stay unique for the process lifetime, so they come from a
/// process-wide counter rather than the subscriber's (reusable) span ids.
static NEXT_SPAN_ID: AtomicU64 = AtomicU64::new(1);

fn next_span_id() -> String {
    format!("{:016x}", NEXT_SPAN_ID.fetch_add(1, Ordering::Relaxed))
}

#[derive(Clone)]
pub struct CaptureLayer {
    queue: Arc<SpanQueue>,
    source_name: String,
    open: Arc<Mutex<HashMap<u64, OpenSpan>>>,
}

#[derive(Debug, Clone)]
struct OpenSpan {
    trace_id: String,
    span_id: String,
    parent_span_id: Option<String>,
    name: String,
    start_time: DateTime<Utc>,
    fields: HashMap<String, String>,
    events: Vec<RawEvent>,
}

impl CaptureLayer {
    pub fn new(queue: Arc<SpanQueue>, source_name: String) -> Self {
        Self {
            queue,
            source_name,
            open: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        if attrs.metadata().target() != self.source_name {
            return;
        }

        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);

        let parent_id = attrs
            .parent()
            .map(Id::into_u64)
            .or_else(|| ctx.lookup_current().map(|s| s.id().into_u64()));

        let Ok(mut open) = self.open.lock() else {
            return;
        };

        // Children inherit the trace of a tracked parent; anything else
        // starts a fresh trace.
        let (trace_id, parent_span_id) = match parent_id.and_then(|pid| open.get(&pid)) {
            Some(parent) => (parent.trace_id.clone(), Some(parent.span_id.clone())),
            None => (uuid::Uuid::new_v4().simple().to_string(), None),
        };

        open.insert(
            id.into_u64(),
            OpenSpan {
                trace_id,
                span_id: next_span_id(),
                parent_span_id,
                name: attrs.metadata().name().to_string(),
                start_time: Utc::now(),
                fields: visitor.fields,
                events: Vec::new(),
            },
        );
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        let Ok(mut open) = self.open.lock() else {
            return;
        };
        if let Some(span) = open.get_mut(&id.into_u64()) {
            let mut visitor = FieldVisitor::default();
            values.record(&mut visitor);
            span.fields.extend(visitor.fields);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        if event.metadata().target() != self.source_name {
            return;
        }
        let Some(span_ref) = ctx.event_span(event) else {
            return;
        };

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let Ok(mut open) = self.open.lock() else {
            return;
        };
        if let Some(span) = open.get_mut(&span_ref.id().into_u64()) {
            let mut tags = visitor.fields;
            tags.remove("message");
            span.events.push(RawEvent {
                name: visitor
                    .message
                    .unwrap_or_else(|| event.metadata().name().to_string()),
                timestamp: Utc::now(),
                tags,
            });
        }
    }

    fn on_close(&self, id: Id, _ctx: Context<'_, S>) {
        let Some(span) = self
            .open
            .lock()
            .ok()
            .and_then(|mut open| open.remove(&id.into_u64()))
        else {
            return;
        };

        self.queue.offer(RawSpan {
            trace_id: span.trace_id,
            span_id: span.span_id,
            parent_span_id: span.parent_span_id,
            name: span.name,
            start_time: span.start_time,
            end_time: Utc::now(),
            fields: span.fields,
            events: span.events,
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: HashMap<String, String>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(rendered.trim_matches('"').to_string());
        }
        self.fields
            .insert(field.name().to_string(), rendered.trim_matches('"').to_string());
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        }
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }
}
